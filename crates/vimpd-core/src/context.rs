//! State shared by every mode.

use crate::key::KeyMap;
use crate::mode::search::SearchState;
use crate::player::{ Player, Status };
use crate::settings::Settings;
use crate::window::Screen;


/// A message shown on the command row.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct Message {
    pub text: String,
    pub is_error: bool,
}


/// Single-slot message line. A new message replaces the previous one.
#[derive( Debug, Default )]
pub struct StatusLine {
    message: Option<Message>,
}


impl StatusLine {
    pub fn info( &mut self, text: impl Into<String> ) {
        self.message = Some( Message { text: text.into(), is_error: false } );
    }


    pub fn error( &mut self, text: impl Into<String> ) {
        let text = text.into();
        tracing::debug!( "Error: {}", text );
        self.message = Some( Message { text, is_error: true } );
    }


    pub fn clear( &mut self ) {
        self.message = None;
    }


    pub fn message( &self ) -> Option<&Message> {
        self.message.as_ref()
    }
}


/// Everything a mode acts on, passed by `&mut` into each call.
pub struct Context {
    pub screen: Screen,
    pub player: Box<dyn Player>,
    pub settings: Settings,
    pub status: StatusLine,
    pub search: SearchState,
    pub keymap: KeyMap,
    /// Stored playlist names, kept for completion
    pub playlists: Vec<String>,
    /// Last status received from the server
    pub playback: Option<Status>,
}


impl Context {
    pub fn new( screen: Screen, player: Box<dyn Player>, settings: Settings ) -> Self {
        Self {
            screen,
            player,
            settings,
            status: StatusLine::default(),
            search: SearchState::default(),
            keymap: KeyMap::new(),
            playlists: Vec::new(),
            playback: None,
        }
    }


    /// Lines of a window by name, empty if there is no such window.
    pub fn window_lines( &self, name: &str ) -> Vec<String> {
        self.screen
            .windows()
            .find( |w| w.name() == name )
            .map( |w| ( 0..w.len() ).filter_map( |i| w.line( i ) ).map( str::to_string ).collect() )
            .unwrap_or_default()
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::testing::{ context, FakePlayer };


    #[test]
    fn test_status_line_holds_one_message() {
        let mut status = StatusLine::default();
        status.info( "hello" );
        status.error( "broken" );
        assert_eq!( status.message(), Some( &Message { text: "broken".into(), is_error: true } ) );
        status.clear();
        assert!( status.message().is_none() );
    }


    #[test]
    fn test_window_lines() {
        let ctx = context( &FakePlayer::connected() );
        let lines = ctx.window_lines( "list" );
        assert_eq!( lines.len(), 100 );
        assert_eq!( lines[ 3 ], "list line 3" );
        assert!( ctx.window_lines( "missing" ).is_empty() );
    }
}
