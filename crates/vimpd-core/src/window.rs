//! The active window interface and the screen that owns the windows.
//!
//! Modes never know which concrete buffer backs the window they act on;
//! they only go through [`Window`].

use thiserror::Error;

use crate::player::{ Player, PlayerError };
use crate::selection::{ Position, SelectableViewport };
use crate::viewport::Alignment;


/// Errors raised by window operations.
#[derive( Debug, Error )]
pub enum WindowError {
    #[error( "Cannot {operation} in the {window} window" )]
    Unsupported { window: String, operation: &'static str },

    #[error( "No such window: {0}" )]
    NotFound( String ),

    #[error( transparent )]
    Player( #[from] PlayerError ),
}


/// A scrollable, selectable view over a buffer of lines.
pub trait Window {
    fn name( &self ) -> &str;

    /// Number of lines in the backing buffer.
    fn len( &self ) -> usize;

    /// Text of a line for display.
    fn line( &self, index: usize ) -> Option<&str>;

    fn view( &self ) -> &SelectableViewport;

    fn view_mut( &mut self ) -> &mut SelectableViewport;


    fn is_empty( &self ) -> bool {
        self.len() == 0
    }


    /// Text the search mode matches against for a line.
    fn search_pattern( &self, index: usize ) -> Option<&str> {
        self.line( index )
    }


    /// Replaces the buffer with a fresh listing from the server.
    fn update( &mut self, _entries: Vec<String> ) {}


    /// Activates the current line.
    fn confirm( &mut self, _player: &mut dyn Player ) -> Result<(), WindowError> {
        Ok(())
    }


    /// Adds `count` lines starting at `start` to the queue.
    fn add_lines( &mut self, _player: &mut dyn Player, _start: usize, _count: usize ) -> Result<(), WindowError> {
        Err( self.unsupported( "add" ) )
    }


    fn add_all_lines( &mut self, _player: &mut dyn Player ) -> Result<(), WindowError> {
        Err( self.unsupported( "add" ) )
    }


    /// Deletes `count` lines starting at `start`.
    fn delete_lines( &mut self, _player: &mut dyn Player, _start: usize, _count: usize ) -> Result<(), WindowError> {
        Err( self.unsupported( "delete" ) )
    }


    fn delete_all_lines( &mut self, _player: &mut dyn Player ) -> Result<(), WindowError> {
        Err( self.unsupported( "delete" ) )
    }


    fn unsupported( &self, operation: &'static str ) -> WindowError {
        WindowError::Unsupported { window: self.name().to_string(), operation }
    }


    fn current_line( &self ) -> usize {
        self.view().current_line()
    }


    fn scroll( &mut self, delta: isize ) {
        let size = self.len();
        self.view_mut().move_cursor( delta, size );
    }


    fn scroll_to( &mut self, line: usize ) {
        let size = self.len();
        self.view_mut().scroll_to( line, size );
    }


    fn scroll_view( &mut self, delta: isize ) {
        let size = self.len();
        self.view_mut().scroll_view( delta, size );
    }


    fn select( &mut self, position: Position, count: usize ) {
        let size = self.len();
        self.view_mut().select( position, count, size );
    }


    fn align( &mut self, alignment: Alignment ) {
        let size = self.len();
        self.view_mut().align( alignment, size );
    }


    fn visual( &mut self ) {
        self.view_mut().visual();
    }


    fn switch_visual_end( &mut self ) {
        let size = self.len();
        self.view_mut().switch_visual_end( size );
    }


    fn escape( &mut self ) {
        self.view_mut().escape();
    }


    /// Adds lines, letting an active visual selection override the range.
    fn add_line( &mut self, player: &mut dyn Player, line: usize, count: usize ) -> Result<(), WindowError> {
        let ( start, count ) = self.view_mut().take_range( line, count );
        self.add_lines( player, start, count )
    }


    /// Deletes lines, letting an active visual selection override the range.
    fn delete_line( &mut self, player: &mut dyn Player, line: usize, count: usize ) -> Result<(), WindowError> {
        let ( start, count ) = self.view_mut().take_range( line, count );
        self.delete_lines( player, start, count )
    }
}


/// The set of windows and which one is active.
pub struct Screen {
    windows: Vec<Box<dyn Window>>,
    active: usize,
    rows: usize,
    cols: usize,
}


impl Screen {
    /// Creates an empty screen for a main area of `rows` x `cols`.
    pub fn new( rows: usize, cols: usize ) -> Self {
        Self { windows: Vec::new(), active: 0, rows, cols }
    }


    /// Adds a window, sizing its viewport to the screen.
    pub fn add( &mut self, mut window: Box<dyn Window> ) {
        let size = window.len();
        window.view_mut().resize( self.rows, self.cols, size );
        self.windows.push( window );
    }


    pub fn rows( &self ) -> usize {
        self.rows
    }


    pub fn cols( &self ) -> usize {
        self.cols
    }


    pub fn len( &self ) -> usize {
        self.windows.len()
    }


    pub fn is_empty( &self ) -> bool {
        self.windows.is_empty()
    }


    pub fn active_index( &self ) -> usize {
        self.active
    }


    /// The window that receives navigation and ranged operations.
    ///
    /// # Panics
    ///
    /// Panics if no window has been added.
    pub fn active( &self ) -> &dyn Window {
        self.windows[ self.active ].as_ref()
    }


    pub fn active_mut( &mut self ) -> &mut dyn Window {
        self.windows[ self.active ].as_mut()
    }


    pub fn windows( &self ) -> impl Iterator<Item = &dyn Window> {
        self.windows.iter().map( |w| w.as_ref() )
    }


    pub fn names( &self ) -> Vec<String> {
        self.windows.iter().map( |w| w.name().to_string() ).collect()
    }


    pub fn window_mut( &mut self, name: &str ) -> Option<&mut ( dyn Window + 'static )> {
        self.windows
            .iter_mut()
            .find( |w| w.name() == name )
            .map( |w| w.as_mut() )
    }


    /// Activates a window by 0-based index.
    pub fn select_window( &mut self, index: usize ) -> Result<(), WindowError> {
        if index >= self.windows.len() {
            return Err( WindowError::NotFound( ( index + 1 ).to_string() ) );
        }
        self.active = index;
        tracing::debug!( "Active window: {}", self.windows[ index ].name() );
        Ok(())
    }


    /// Activates a window by name.
    pub fn select_named( &mut self, name: &str ) -> Result<(), WindowError> {
        let index = self.windows
            .iter()
            .position( |w| w.name() == name )
            .ok_or_else( || WindowError::NotFound( name.to_string() ) )?;
        self.select_window( index )
    }


    pub fn next_window( &mut self, count: usize ) {
        if !self.windows.is_empty() {
            let len = self.windows.len();
            self.active = ( self.active + count % len ) % len;
        }
    }


    pub fn previous_window( &mut self, count: usize ) {
        if !self.windows.is_empty() {
            let len = self.windows.len();
            self.active = ( self.active + len - count % len ) % len;
        }
    }


    /// Resizes the main area and every window viewport.
    pub fn resize( &mut self, rows: usize, cols: usize ) {
        self.rows = rows;
        self.cols = cols;
        for window in &mut self.windows {
            let size = window.len();
            window.view_mut().resize( rows, cols, size );
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::testing::{ list_window, FakePlayer };


    fn screen() -> Screen {
        let mut screen = Screen::new( 10, 80 );
        screen.add( Box::new( list_window( "one", 30 ) ) );
        screen.add( Box::new( list_window( "two", 5 ) ) );
        screen.add( Box::new( list_window( "three", 0 ) ) );
        screen
    }


    #[test]
    fn test_select_window_by_index_and_name() {
        let mut screen = screen();
        screen.select_window( 2 ).unwrap();
        assert_eq!( screen.active().name(), "three" );
        screen.select_named( "two" ).unwrap();
        assert_eq!( screen.active_index(), 1 );
        assert!( matches!( screen.select_window( 3 ), Err( WindowError::NotFound( _ ) ) ) );
        assert!( matches!( screen.select_named( "four" ), Err( WindowError::NotFound( _ ) ) ) );
        assert_eq!( screen.active_index(), 1 );
    }


    #[test]
    fn test_window_cycling_wraps() {
        let mut screen = screen();
        screen.previous_window( 1 );
        assert_eq!( screen.active_index(), 2 );
        screen.next_window( 1 );
        assert_eq!( screen.active_index(), 0 );
        screen.next_window( 4 );
        assert_eq!( screen.active_index(), 1 );
        screen.previous_window( 5 );
        assert_eq!( screen.active_index(), 2 );
    }


    #[test]
    fn test_visual_delete_uses_selection_size() {
        let mut screen = screen();
        let player = FakePlayer::connected();
        let mut handle = player.clone();

        let window = screen.active_mut();
        window.scroll( 2 );
        window.visual();
        window.scroll( 4 );
        let line = window.current_line();
        window.delete_line( &mut handle, line, 17 ).unwrap();

        assert_eq!( window.len(), 25 );
        assert_eq!( player.calls(), vec![ "delete 6", "delete 5", "delete 4", "delete 3", "delete 2" ] );
        assert!( !window.view().is_visual() );
    }


    #[test]
    fn test_default_operations_are_unsupported() {
        let mut screen = screen();
        let mut player = FakePlayer::connected();
        screen.select_window( 1 ).unwrap();
        let err = screen.active_mut().add_all_lines( &mut player ).unwrap_err();
        assert_eq!( err.to_string(), "Cannot add in the two window" );
    }
}
