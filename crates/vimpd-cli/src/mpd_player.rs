//! MPD player backend
//!
//! Implements the core [`Player`] trait over the Music Player Daemon
//! protocol. The address of the current connection is published through an
//! [`Endpoint`] so the status poller can follow it.

use std::sync::{ Arc, Mutex };
use std::time::Duration;

use mpd::{ Client, Song, State };

use vimpd_core::{ PlaybackState, Player, PlayerError, Status };


/// Address of the connected server, `None` while disconnected.
pub type Endpoint = Arc<Mutex<Option<String>>>;


/// Player talking to an MPD server.
pub struct MpdPlayer {
    client: Option<Client>,
    endpoint: Endpoint,
}


impl MpdPlayer {
    pub fn new( endpoint: Endpoint ) -> Self {
        Self { client: None, endpoint }
    }


    fn publish( &self, address: Option<String> ) {
        match self.endpoint.lock() {
            Ok( mut endpoint ) => *endpoint = address,
            Err( e ) => tracing::warn!( "Endpoint lock poisoned: {}", e ),
        }
    }


    fn address( &self ) -> Option<String> {
        self.endpoint.lock().ok().and_then( |endpoint| endpoint.clone() )
    }


    /// Runs a request, reconnecting once if the server dropped an idle
    /// connection.
    fn with_client<T, F>( &mut self, mut f: F ) -> Result<T, PlayerError>
    where
        F: FnMut( &mut Client ) -> mpd::error::Result<T>,
    {
        let client = self.client.as_mut().ok_or( PlayerError::NotConnected )?;
        match f( client ) {
            Err( mpd::error::Error::Io( e ) ) => {
                tracing::info!( "Connection dropped ({}), reconnecting", e );
                self.client = None;
                let address = self.address().ok_or( PlayerError::NotConnected )?;
                let client = self.client.insert( open( &address )? );
                f( client ).map_err( protocol )
            }
            result => result.map_err( protocol ),
        }
    }
}


fn open( address: &str ) -> Result<Client, PlayerError> {
    Client::connect( address ).map_err( |e| PlayerError::Connection {
        address: address.to_string(),
        message: e.to_string(),
    })
}


fn protocol( e: mpd::error::Error ) -> PlayerError {
    PlayerError::Protocol( e.to_string() )
}


fn song( uri: &str ) -> Song {
    Song { file: uri.to_string(), ..Default::default() }
}


/// Converts an MPD status reply into the core status snapshot.
pub fn convert_status( status: &mpd::Status ) -> Status {
    Status {
        state: match status.state {
            State::Play => PlaybackState::Playing,
            State::Pause => PlaybackState::Paused,
            State::Stop => PlaybackState::Stopped,
        },
        volume: u32::try_from( status.volume ).ok(),
        random: status.random,
        repeat: status.repeat,
        single: status.single,
        song: status.song.as_ref().map( |place| place.pos as usize ),
        elapsed: status.elapsed,
        duration: status.duration,
    }
}


impl Player for MpdPlayer {
    fn is_connected( &self ) -> bool {
        self.client.is_some()
    }


    fn connect( &mut self, host: &str, port: u16 ) -> Result<(), PlayerError> {
        let address = format!( "{}:{}", host, port );
        let client = open( &address )?;
        tracing::info!( "Connected to MPD at {}", address );
        self.client = Some( client );
        self.publish( Some( address ) );
        Ok(())
    }


    fn disconnect( &mut self ) {
        if self.client.take().is_some() {
            tracing::info!( "Disconnected from MPD" );
        }
        self.publish( None );
    }


    fn play( &mut self, position: usize ) -> Result<(), PlayerError> {
        let position = u32::try_from( position )
            .map_err( |_| PlayerError::InvalidArgument( position.to_string() ) )?;
        self.with_client( |client| client.switch( position ) )
    }


    fn resume( &mut self ) -> Result<(), PlayerError> {
        self.with_client( |client| client.play() )
    }


    fn toggle_pause( &mut self ) -> Result<(), PlayerError> {
        self.with_client( |client| {
            match client.status()?.state {
                State::Play => client.pause( true ),
                State::Pause => client.pause( false ),
                State::Stop => client.play(),
            }
        })
    }


    fn stop( &mut self ) -> Result<(), PlayerError> {
        self.with_client( |client| client.stop() )
    }


    fn next( &mut self ) -> Result<(), PlayerError> {
        self.with_client( |client| client.next() )
    }


    fn previous( &mut self ) -> Result<(), PlayerError> {
        self.with_client( |client| client.prev() )
    }


    fn seek( &mut self, position: Duration ) -> Result<(), PlayerError> {
        let place = self.with_client( |client| client.status() )?.song;
        let place = place.ok_or_else( || PlayerError::InvalidArgument( "Nothing is playing".into() ) )?;
        self.with_client( |client| client.seek( place.pos, position ) )
    }


    fn set_volume( &mut self, level: u32 ) -> Result<(), PlayerError> {
        let level = level.min( 100 ) as i8;
        self.with_client( |client| client.volume( level ) )
    }


    fn set_random( &mut self, on: bool ) -> Result<(), PlayerError> {
        self.with_client( |client| client.random( on ) )
    }


    fn set_repeat( &mut self, on: bool ) -> Result<(), PlayerError> {
        self.with_client( |client| client.repeat( on ) )
    }


    fn set_single( &mut self, on: bool ) -> Result<(), PlayerError> {
        self.with_client( |client| client.single( on ) )
    }


    fn add( &mut self, uri: &str ) -> Result<(), PlayerError> {
        let song = song( uri );
        self.with_client( |client| client.push( &song ).map( |_| () ) )
    }


    fn add_and_play( &mut self, uri: &str ) -> Result<(), PlayerError> {
        let song = song( uri );
        self.with_client( |client| {
            let id = client.push( &song )?;
            client.switch( id )
        })
    }


    fn delete( &mut self, position: usize ) -> Result<(), PlayerError> {
        let position = u32::try_from( position )
            .map_err( |_| PlayerError::InvalidArgument( position.to_string() ) )?;
        self.with_client( |client| client.delete( position ) )
    }


    fn clear( &mut self ) -> Result<(), PlayerError> {
        self.with_client( |client| client.clear() )
    }


    fn save_playlist( &mut self, name: &str ) -> Result<(), PlayerError> {
        self.with_client( |client| client.save( name ) )
    }


    fn load_playlist( &mut self, name: &str ) -> Result<(), PlayerError> {
        self.with_client( |client| client.load( name, .. ) )
    }


    fn status( &mut self ) -> Result<Status, PlayerError> {
        self.with_client( |client| client.status() ).map( |status| convert_status( &status ) )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_commands_need_a_connection() {
        let endpoint = Endpoint::default();
        let mut player = MpdPlayer::new( endpoint.clone() );
        assert!( !player.is_connected() );
        assert!( matches!( player.next(), Err( PlayerError::NotConnected ) ) );
        assert!( matches!( player.status(), Err( PlayerError::NotConnected ) ) );
        player.disconnect();
        assert!( endpoint.lock().unwrap().is_none() );
    }


    #[test]
    fn test_failed_connect_is_reported() {
        let endpoint = Endpoint::default();
        let mut player = MpdPlayer::new( endpoint.clone() );
        // Nothing listens on port 1 of the loopback interface
        let err = player.connect( "127.0.0.1", 1 ).unwrap_err();
        assert!( matches!( err, PlayerError::Connection { .. } ) );
        assert!( err.to_string().starts_with( "Failed to connect to 127.0.0.1:1" ) );
        assert!( endpoint.lock().unwrap().is_none() );
    }
}
