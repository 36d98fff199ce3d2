//! Background status polling.
//!
//! The poller keeps its own MPD connection, following the endpoint the
//! player publishes, and reports status and listings as events.

use std::io;
use std::time::Duration;

use mpd::Client;

use vimpd_core::{ Event, EventSender, ListingKind, Worker };

use crate::mpd_player::{ convert_status, Endpoint };


/// How often the server status is polled.
pub const POLL_INTERVAL: Duration = Duration::from_millis( 500 );


/// Connection state owned by the polling thread.
struct Poller {
    endpoint: Endpoint,
    events: EventSender,
    client: Option<Client>,
    /// Address `client` is connected to
    address: Option<String>,
    queue_version: Option<u32>,
}


impl Poller {
    /// One poll. Returns false once the UI is gone.
    fn tick( &mut self ) -> bool {
        let wanted = self.endpoint.lock().ok().and_then( |endpoint| endpoint.clone() );

        if wanted != self.address {
            self.client = None;
            self.queue_version = None;
            if self.address.take().is_some() && wanted.is_none() {
                return self.events.send( Event::Disconnected( "Disconnected by user".into() ) );
            }
        }

        let Some( address ) = wanted else {
            return true;
        };

        if self.client.is_none() {
            match Client::connect( address.as_str() ) {
                Ok( client ) => {
                    tracing::info!( "Poller connected to {}", address );
                    self.client = Some( client );
                    self.address = Some( address.clone() );
                    if !self.events.send( Event::Connected ) {
                        return false;
                    }
                    if !self.fetch( ListingKind::Library ) || !self.fetch( ListingKind::Playlists ) {
                        return false;
                    }
                }
                Err( e ) => {
                    tracing::debug!( "Poller cannot reach {}: {}", address, e );
                    return true;
                }
            }
        }

        let Some( client ) = self.client.as_mut() else {
            return true;
        };
        match client.status() {
            Ok( status ) => {
                let changed = self.queue_version != Some( status.queue_version );
                self.queue_version = Some( status.queue_version );
                if !self.events.send( Event::Status( convert_status( &status ) ) ) {
                    return false;
                }
                !changed || self.fetch( ListingKind::Queue )
            }
            Err( e ) => {
                tracing::warn!( "Lost connection to {}: {}", address, e );
                self.client = None;
                self.address = None;
                self.queue_version = None;
                self.events.send( Event::Disconnected( e.to_string() ) )
            }
        }
    }


    /// Fetches a listing and sends it, successful or not.
    fn fetch( &mut self, kind: ListingKind ) -> bool {
        let Some( client ) = self.client.as_mut() else {
            return true;
        };

        let result = match kind {
            ListingKind::Queue => client
                .queue()
                .map( |songs| songs.iter().map( describe ).collect() ),
            ListingKind::Library => client
                .listall()
                .map( |songs| songs.into_iter().map( |song| song.file ).collect() ),
            ListingKind::Playlists => client
                .playlists()
                .map( |playlists| playlists.into_iter().map( |playlist| playlist.name ).collect() ),
        };

        self.events.send( Event::Listing { kind, result: result.map_err( |e| e.to_string() ) } )
    }
}


/// Display text for a queued song.
fn describe( song: &mpd::Song ) -> String {
    match ( &song.artist, &song.title ) {
        ( Some( artist ), Some( title ) ) => format!( "{} - {}", artist, title ),
        ( None, Some( title ) ) => title.clone(),
        _ => song.file.clone(),
    }
}


/// Starts the polling worker.
pub fn spawn( endpoint: Endpoint, events: EventSender ) -> io::Result<Worker> {
    let mut poller = Poller {
        endpoint,
        events,
        client: None,
        address: None,
        queue_version: None,
    };
    Worker::spawn( "mpd-poller", POLL_INTERVAL, move || poller.tick() )
}


#[cfg( test )]
mod tests {
    use super::*;
    use vimpd_core::event_queue;


    fn poller( endpoint: Endpoint ) -> ( Poller, vimpd_core::EventQueue ) {
        let ( events, queue ) = event_queue( 8 );
        let poller = Poller { endpoint, events, client: None, address: None, queue_version: None };
        ( poller, queue )
    }


    #[test]
    fn test_idle_without_endpoint() {
        let ( mut poller, queue ) = poller( Endpoint::default() );
        assert!( poller.tick() );
        assert!( queue.drain().is_empty() );
    }


    #[test]
    fn test_unreachable_endpoint_is_retried_quietly() {
        let endpoint = Endpoint::default();
        *endpoint.lock().unwrap() = Some( "127.0.0.1:1".into() );
        let ( mut poller, queue ) = poller( endpoint );
        assert!( poller.tick() );
        assert!( poller.tick() );
        assert!( queue.drain().is_empty() );
        assert!( poller.client.is_none() );
    }


    #[test]
    fn test_describe_prefers_tags() {
        let mut song = mpd::Song { file: "a/b.flac".into(), ..Default::default() };
        assert_eq!( describe( &song ), "a/b.flac" );
        song.title = Some( "Song".into() );
        assert_eq!( describe( &song ), "Song" );
        song.artist = Some( "Band".into() );
        assert_eq!( describe( &song ), "Band - Song" );
    }


    #[test]
    fn test_stops_when_ui_is_gone() {
        let ( mut poller, queue ) = poller( Endpoint::default() );
        poller.address = Some( "127.0.0.1:1".into() );
        drop( queue );
        assert!( !poller.tick() );
    }
}
