//! Player interface
//!
//! The dispatch core drives a remote playback server through the
//! [`Player`] trait. The protocol client itself lives outside this crate.

use std::time::Duration;

use thiserror::Error;


/// Errors that can occur while talking to the server.
#[derive( Debug, Error )]
pub enum PlayerError {
    #[error( "Not connected" )]
    NotConnected,

    #[error( "Failed to connect to {address}: {message}" )]
    Connection { address: String, message: String },

    #[error( "Server error: {0}" )]
    Protocol( String ),

    #[error( "Invalid argument: {0}" )]
    InvalidArgument( String ),
}


/// Current playback state.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}


/// Snapshot of the server status.
#[derive( Debug, Clone, Default, PartialEq )]
pub struct Status {
    pub state: PlaybackState,
    /// Volume 0-100, None when the server has no mixer
    pub volume: Option<u32>,
    pub random: bool,
    pub repeat: bool,
    pub single: bool,
    /// Queue position of the current song
    pub song: Option<usize>,
    pub elapsed: Option<Duration>,
    pub duration: Option<Duration>,
}


/// Operations the modes and windows invoke on the playback server.
///
/// Queue positions are 0-based.
pub trait Player {
    fn is_connected( &self ) -> bool;

    fn connect( &mut self, host: &str, port: u16 ) -> Result<(), PlayerError>;

    fn disconnect( &mut self );

    /// Plays the song at a queue position.
    fn play( &mut self, position: usize ) -> Result<(), PlayerError>;

    /// Starts or resumes playback of the current song.
    fn resume( &mut self ) -> Result<(), PlayerError>;

    fn toggle_pause( &mut self ) -> Result<(), PlayerError>;

    fn stop( &mut self ) -> Result<(), PlayerError>;

    fn next( &mut self ) -> Result<(), PlayerError>;

    fn previous( &mut self ) -> Result<(), PlayerError>;

    /// Seeks within the current song.
    fn seek( &mut self, position: Duration ) -> Result<(), PlayerError>;

    /// Sets the volume (0-100).
    fn set_volume( &mut self, level: u32 ) -> Result<(), PlayerError>;

    fn set_random( &mut self, on: bool ) -> Result<(), PlayerError>;

    fn set_repeat( &mut self, on: bool ) -> Result<(), PlayerError>;

    fn set_single( &mut self, on: bool ) -> Result<(), PlayerError>;

    /// Appends a song to the queue.
    fn add( &mut self, uri: &str ) -> Result<(), PlayerError>;

    /// Appends a song to the queue and starts playing it.
    fn add_and_play( &mut self, uri: &str ) -> Result<(), PlayerError>;

    /// Removes the song at a queue position.
    fn delete( &mut self, position: usize ) -> Result<(), PlayerError>;

    fn clear( &mut self ) -> Result<(), PlayerError>;

    fn save_playlist( &mut self, name: &str ) -> Result<(), PlayerError>;

    fn load_playlist( &mut self, name: &str ) -> Result<(), PlayerError>;

    fn status( &mut self ) -> Result<Status, PlayerError>;
}
