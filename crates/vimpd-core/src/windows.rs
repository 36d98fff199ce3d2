//! Concrete windows: the play queue, the song library and the help page.

use crate::player::Player;
use crate::selection::SelectableViewport;
use crate::window::{ Window, WindowError };


/// Help page shown in the help window.
const HELP_TEXT: &str = r#"Normal mode
  j k            Move down / up            [count]
  Ctrl-E Ctrl-Y  Scroll down / up          [count]
  Ctrl-D Ctrl-U  Half page down / up
  Ctrl-F Ctrl-B  Page down / up
  H M L          Top / middle / bottom of screen
  gg G           First / last line         [count = line]
  zt zz zb       Align current line top / centre / bottom
  gt gT Tab      Next / previous window
  Alt-1..Alt-9   Select window by number
  Enter          Play / activate line
  a A            Add line(s) / add all
  d x D          Delete line(s) / delete all
  v V o          Visual selection / switch selection end
  / ? n N        Search forward / backward / next / previous
  p s > <        Pause / stop / next / previous
  + -            Volume up / down
  r R y          Toggle random / repeat / single
  .              Repeat last action
  : q            Command line / quit

Commands  [range]command[!] [arguments]  (chain with ;)
  :add [uri]        :addall          :delete          :deleteall
  :play [pos]       :pause           :stop            :next
  :previous         :seek <time>     :volume <0-100>  :clear
  :random [on|off]  :repeat [on|off] :single [on|off]
  :save <name>      :load <name>     :connect [host [port]]
  :disconnect       :set <option>    :alias[!] <name> <body>
  :unalias <name>   :map <lhs> <rhs> :unmap <lhs>     :echo <text>
  :window <name|n>  :wnext           :wprevious       :help
  :quit"#;


/// The server play queue.
#[derive( Debug )]
pub struct PlaylistWindow {
    entries: Vec<String>,
    view: SelectableViewport,
}


impl PlaylistWindow {
    pub const NAME: &'static str = "playlist";


    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            view: SelectableViewport::new( 0, 0 ),
        }
    }
}


impl Default for PlaylistWindow {
    fn default() -> Self {
        Self::new()
    }
}


impl Window for PlaylistWindow {
    fn name( &self ) -> &str {
        Self::NAME
    }


    fn len( &self ) -> usize {
        self.entries.len()
    }


    fn line( &self, index: usize ) -> Option<&str> {
        self.entries.get( index ).map( String::as_str )
    }


    fn view( &self ) -> &SelectableViewport {
        &self.view
    }


    fn view_mut( &mut self ) -> &mut SelectableViewport {
        &mut self.view
    }


    fn update( &mut self, entries: Vec<String> ) {
        self.entries = entries;
        self.view.fit( self.entries.len() );
    }


    fn confirm( &mut self, player: &mut dyn Player ) -> Result<(), WindowError> {
        if !self.entries.is_empty() {
            player.play( self.view.current_line() )?;
        }
        Ok(())
    }


    fn delete_lines( &mut self, player: &mut dyn Player, start: usize, count: usize ) -> Result<(), WindowError> {
        let end = start.saturating_add( count ).min( self.entries.len() );

        // Highest position first so earlier positions stay valid. Entries
        // removed before a failure are gone on the server too.
        let result = ( start..end ).rev().try_for_each( |position| -> Result<(), WindowError> {
            player.delete( position )?;
            self.entries.remove( position );
            Ok(())
        });

        self.view.fit( self.entries.len() );
        result
    }


    fn delete_all_lines( &mut self, player: &mut dyn Player ) -> Result<(), WindowError> {
        player.clear()?;
        self.entries.clear();
        self.view.fit( 0 );
        Ok(())
    }
}


/// Every song the server knows about, by URI.
#[derive( Debug )]
pub struct LibraryWindow {
    entries: Vec<String>,
    view: SelectableViewport,
}


impl LibraryWindow {
    pub const NAME: &'static str = "library";


    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            view: SelectableViewport::new( 0, 0 ),
        }
    }


    /// Known song paths, used for command line completion.
    pub fn entries( &self ) -> &[String] {
        &self.entries
    }
}


impl Default for LibraryWindow {
    fn default() -> Self {
        Self::new()
    }
}


impl Window for LibraryWindow {
    fn name( &self ) -> &str {
        Self::NAME
    }


    fn len( &self ) -> usize {
        self.entries.len()
    }


    fn line( &self, index: usize ) -> Option<&str> {
        self.entries.get( index ).map( String::as_str )
    }


    fn view( &self ) -> &SelectableViewport {
        &self.view
    }


    fn view_mut( &mut self ) -> &mut SelectableViewport {
        &mut self.view
    }


    fn update( &mut self, entries: Vec<String> ) {
        self.entries = entries;
        self.view.fit( self.entries.len() );
    }


    fn confirm( &mut self, player: &mut dyn Player ) -> Result<(), WindowError> {
        if let Some( uri ) = self.entries.get( self.view.current_line() ) {
            player.add_and_play( uri )?;
        }
        Ok(())
    }


    fn add_lines( &mut self, player: &mut dyn Player, start: usize, count: usize ) -> Result<(), WindowError> {
        let end = start.saturating_add( count ).min( self.entries.len() );
        for uri in self.entries.get( start..end ).unwrap_or_default() {
            player.add( uri )?;
        }
        Ok(())
    }


    fn add_all_lines( &mut self, player: &mut dyn Player ) -> Result<(), WindowError> {
        for uri in &self.entries {
            player.add( uri )?;
        }
        Ok(())
    }
}


/// Read-only key and command reference.
#[derive( Debug )]
pub struct HelpWindow {
    lines: Vec<String>,
    view: SelectableViewport,
}


impl HelpWindow {
    pub const NAME: &'static str = "help";


    pub fn new() -> Self {
        Self {
            lines: HELP_TEXT.lines().map( str::to_string ).collect(),
            view: SelectableViewport::new( 0, 0 ),
        }
    }
}


impl Default for HelpWindow {
    fn default() -> Self {
        Self::new()
    }
}


impl Window for HelpWindow {
    fn name( &self ) -> &str {
        Self::NAME
    }


    fn len( &self ) -> usize {
        self.lines.len()
    }


    fn line( &self, index: usize ) -> Option<&str> {
        self.lines.get( index ).map( String::as_str )
    }


    fn view( &self ) -> &SelectableViewport {
        &self.view
    }


    fn view_mut( &mut self ) -> &mut SelectableViewport {
        &mut self.view
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::testing::FakePlayer;


    fn songs( n: usize ) -> Vec<String> {
        ( 0..n ).map( |i| format!( "song{}.flac", i ) ).collect()
    }


    #[test]
    fn test_playlist_confirm_plays_current_line() {
        let player = FakePlayer::connected();
        let mut handle = player.clone();
        let mut window = PlaylistWindow::new();
        window.update( songs( 5 ) );
        window.scroll( 3 );
        window.confirm( &mut handle ).unwrap();
        assert_eq!( player.calls(), vec![ "play 3" ] );
    }


    #[test]
    fn test_playlist_delete_clamps_to_content() {
        let player = FakePlayer::connected();
        let mut handle = player.clone();
        let mut window = PlaylistWindow::new();
        window.update( songs( 5 ) );
        window.delete_line( &mut handle, 3, 10 ).unwrap();
        assert_eq!( window.len(), 3 );
        assert_eq!( player.calls(), vec![ "delete 4", "delete 3" ] );
        assert_eq!( window.current_line(), 0 );
    }


    #[test]
    fn test_failed_delete_keeps_cursor_in_content() {
        let player = FakePlayer::failing_delete_at( 2 );
        let mut handle = player.clone();
        let mut window = PlaylistWindow::new();
        window.update( songs( 5 ) );
        window.scroll( 4 );

        assert!( window.delete_line( &mut handle, 2, 3 ).is_err() );
        assert_eq!( player.calls(), vec![ "delete 4", "delete 3" ] );
        assert_eq!( window.len(), 3 );
        assert_eq!( window.current_line(), 2 );
        assert_eq!( window.line( 2 ), Some( "song2.flac" ) );
    }


    #[test]
    fn test_playlist_delete_all_clears_queue() {
        let player = FakePlayer::connected();
        let mut handle = player.clone();
        let mut window = PlaylistWindow::new();
        window.update( songs( 5 ) );
        window.delete_all_lines( &mut handle ).unwrap();
        assert!( window.is_empty() );
        assert_eq!( player.calls(), vec![ "clear" ] );
    }


    #[test]
    fn test_library_add_and_confirm() {
        let player = FakePlayer::connected();
        let mut handle = player.clone();
        let mut window = LibraryWindow::new();
        window.update( songs( 4 ) );
        window.add_line( &mut handle, 1, 2 ).unwrap();
        window.scroll( 3 );
        window.confirm( &mut handle ).unwrap();
        assert_eq!( player.calls(), vec![
            "add song1.flac",
            "add song2.flac",
            "add_and_play song3.flac",
        ] );
    }


    #[test]
    fn test_library_add_past_end_is_ignored() {
        let player = FakePlayer::connected();
        let mut handle = player.clone();
        let mut window = LibraryWindow::new();
        window.update( songs( 2 ) );
        window.add_lines( &mut handle, 5, 3 ).unwrap();
        assert!( player.calls().is_empty() );
    }


    #[test]
    fn test_player_errors_propagate() {
        let mut player = FakePlayer::default();
        let mut window = PlaylistWindow::new();
        window.update( songs( 2 ) );
        let err = window.delete_line( &mut player, 0, 1 ).unwrap_err();
        assert!( matches!( err, WindowError::Player( _ ) ) );
        assert_eq!( window.len(), 2 );
    }


    #[test]
    fn test_help_window_is_read_only() {
        let mut player = FakePlayer::connected();
        let mut window = HelpWindow::new();
        assert!( window.len() > 10 );
        assert!( window.delete_all_lines( &mut player ).is_err() );
        assert!( window.add_line( &mut player, 0, 1 ).is_err() );
    }
}
