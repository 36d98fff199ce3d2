//! Test doubles shared by the unit tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::context::Context;
use crate::player::{ PlaybackState, Player, PlayerError, Status };
use crate::selection::SelectableViewport;
use crate::settings::Settings;
use crate::window::{ Screen, Window, WindowError };
use crate::windows::{ HelpWindow, LibraryWindow, PlaylistWindow };


#[derive( Debug, Default )]
struct FakeState {
    connected: bool,
    calls: Vec<String>,
    status: Status,
    fail_connect: bool,
    fail_delete_at: Option<usize>,
}


/// Player that records every call it receives.
///
/// Clones share the same state so a test can keep a handle after boxing one
/// into a [`Context`].
#[derive( Debug, Clone, Default )]
pub struct FakePlayer {
    state: Rc<RefCell<FakeState>>,
}


impl FakePlayer {
    pub fn connected() -> Self {
        let player = Self::default();
        player.state.borrow_mut().connected = true;
        player
    }


    pub fn refusing_connections() -> Self {
        let player = Self::default();
        player.state.borrow_mut().fail_connect = true;
        player
    }


    /// A connected player whose `delete` fails at `position`.
    pub fn failing_delete_at( position: usize ) -> Self {
        let player = Self::connected();
        player.state.borrow_mut().fail_delete_at = Some( position );
        player
    }


    pub fn calls( &self ) -> Vec<String> {
        self.state.borrow().calls.clone()
    }


    pub fn clear_calls( &self ) {
        self.state.borrow_mut().calls.clear();
    }


    pub fn set_status( &self, status: Status ) {
        self.state.borrow_mut().status = status;
    }


    fn record( &mut self, call: String ) -> Result<(), PlayerError> {
        let mut state = self.state.borrow_mut();
        if !state.connected {
            return Err( PlayerError::NotConnected );
        }
        state.calls.push( call );
        Ok(())
    }
}


impl Player for FakePlayer {
    fn is_connected( &self ) -> bool {
        self.state.borrow().connected
    }


    fn connect( &mut self, host: &str, port: u16 ) -> Result<(), PlayerError> {
        let mut state = self.state.borrow_mut();
        if state.fail_connect {
            return Err( PlayerError::Connection {
                address: format!( "{}:{}", host, port ),
                message: "refused".into(),
            });
        }
        state.connected = true;
        state.calls.push( format!( "connect {}:{}", host, port ) );
        Ok(())
    }


    fn disconnect( &mut self ) {
        let mut state = self.state.borrow_mut();
        state.connected = false;
        state.calls.push( "disconnect".into() );
    }


    fn play( &mut self, position: usize ) -> Result<(), PlayerError> {
        self.record( format!( "play {}", position ) )
    }


    fn resume( &mut self ) -> Result<(), PlayerError> {
        self.record( "resume".into() )
    }


    fn toggle_pause( &mut self ) -> Result<(), PlayerError> {
        self.record( "toggle_pause".into() )
    }


    fn stop( &mut self ) -> Result<(), PlayerError> {
        self.record( "stop".into() )
    }


    fn next( &mut self ) -> Result<(), PlayerError> {
        self.record( "next".into() )
    }


    fn previous( &mut self ) -> Result<(), PlayerError> {
        self.record( "previous".into() )
    }


    fn seek( &mut self, position: Duration ) -> Result<(), PlayerError> {
        self.record( format!( "seek {}", position.as_secs() ) )
    }


    fn set_volume( &mut self, level: u32 ) -> Result<(), PlayerError> {
        self.record( format!( "volume {}", level ) )?;
        self.state.borrow_mut().status.volume = Some( level );
        Ok(())
    }


    fn set_random( &mut self, on: bool ) -> Result<(), PlayerError> {
        self.record( format!( "random {}", on ) )?;
        self.state.borrow_mut().status.random = on;
        Ok(())
    }


    fn set_repeat( &mut self, on: bool ) -> Result<(), PlayerError> {
        self.record( format!( "repeat {}", on ) )?;
        self.state.borrow_mut().status.repeat = on;
        Ok(())
    }


    fn set_single( &mut self, on: bool ) -> Result<(), PlayerError> {
        self.record( format!( "single {}", on ) )?;
        self.state.borrow_mut().status.single = on;
        Ok(())
    }


    fn add( &mut self, uri: &str ) -> Result<(), PlayerError> {
        self.record( format!( "add {}", uri ) )
    }


    fn add_and_play( &mut self, uri: &str ) -> Result<(), PlayerError> {
        self.record( format!( "add_and_play {}", uri ) )
    }


    fn delete( &mut self, position: usize ) -> Result<(), PlayerError> {
        if self.state.borrow().fail_delete_at == Some( position ) {
            return Err( PlayerError::Protocol( format!( "Bad song index: {}", position ) ) );
        }
        self.record( format!( "delete {}", position ) )
    }


    fn clear( &mut self ) -> Result<(), PlayerError> {
        self.record( "clear".into() )
    }


    fn save_playlist( &mut self, name: &str ) -> Result<(), PlayerError> {
        self.record( format!( "save {}", name ) )
    }


    fn load_playlist( &mut self, name: &str ) -> Result<(), PlayerError> {
        self.record( format!( "load {}", name ) )
    }


    fn status( &mut self ) -> Result<Status, PlayerError> {
        let state = self.state.borrow();
        if !state.connected {
            return Err( PlayerError::NotConnected );
        }
        Ok( state.status.clone() )
    }
}


/// Plain list window that forwards adds and deletes to the player.
pub struct ListWindow {
    name: String,
    entries: Vec<String>,
    view: SelectableViewport,
}


pub fn list_window( name: &str, lines: usize ) -> ListWindow {
    ListWindow {
        name: name.to_string(),
        entries: ( 0..lines ).map( |i| format!( "{} line {}", name, i ) ).collect(),
        view: SelectableViewport::new( 0, 0 ),
    }
}


impl Window for ListWindow {
    fn name( &self ) -> &str {
        &self.name
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


    fn add_lines( &mut self, player: &mut dyn Player, start: usize, count: usize ) -> Result<(), WindowError> {
        for index in start..start.saturating_add( count ).min( self.entries.len() ) {
            player.add( &self.entries[ index ] )?;
        }
        Ok(())
    }


    fn delete_lines( &mut self, player: &mut dyn Player, start: usize, count: usize ) -> Result<(), WindowError> {
        let end = start.saturating_add( count ).min( self.entries.len() );
        let result = ( start..end ).rev().try_for_each( |index| -> Result<(), WindowError> {
            player.delete( index )?;
            self.entries.remove( index );
            Ok(())
        });
        self.view.fit( self.entries.len() );
        result
    }
}


/// Context over a 10 row screen holding the standard windows plus a 100
/// line test list, which starts active.
pub fn context( player: &FakePlayer ) -> Context {
    let mut screen = Screen::new( 10, 80 );
    screen.add( Box::new( list_window( "list", 100 ) ) );
    screen.add( Box::new( PlaylistWindow::new() ) );
    screen.add( Box::new( LibraryWindow::new() ) );
    screen.add( Box::new( HelpWindow::new() ) );
    Context::new( screen, Box::new( player.clone() ), Settings::default() )
}


pub fn playing() -> Status {
    Status { state: PlaybackState::Playing, volume: Some( 50 ), ..Status::default() }
}
