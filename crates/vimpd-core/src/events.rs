//! Events produced by background threads for the UI thread.
//!
//! Producers push into a bounded queue; the main loop drains it on every
//! pass and applies each event through the mode controller. Status
//! snapshots are dropped when the queue is full since the next one replaces
//! them. Every other event waits for room.

use std::sync::mpsc::{ self, Receiver, SyncSender, TrySendError };

use crate::player::Status;


/// Default queue capacity used by the front-end.
pub const EVENT_QUEUE_CAPACITY: usize = 64;


/// Which listing a [`Event::Listing`] carries.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum ListingKind {
    /// The play queue
    Queue,
    /// Every song in the database
    Library,
    /// Stored playlist names
    Playlists,
}


/// A message from a background thread.
#[derive( Debug, Clone, PartialEq )]
pub enum Event {
    /// The server became reachable.
    Connected,

    /// The connection was lost, with the reason.
    Disconnected( String ),

    Status( Status ),

    /// A fetched listing. Fetch failures carry the error text.
    Listing {
        kind: ListingKind,
        result: Result<Vec<String>, String>,
    },
}


/// Producer half of the event queue. Cheap to clone.
#[derive( Debug, Clone )]
pub struct EventSender {
    tx: SyncSender<Event>,
}


impl EventSender {
    /// Queues an event.
    ///
    /// A status snapshot is dropped if the queue is full. Connection changes
    /// and listings block until the consumer makes room.
    ///
    /// @returns false once the consumer is gone
    pub fn send( &self, event: Event ) -> bool {
        if !matches!( event, Event::Status( _ ) ) {
            return self.tx.send( event ).is_ok();
        }

        match self.tx.try_send( event ) {
            Ok(()) => true,
            Err( TrySendError::Full( _ ) ) => {
                tracing::debug!( "Event queue full, skipping status" );
                true
            }
            Err( TrySendError::Disconnected( _ ) ) => false,
        }
    }
}


/// Consumer half of the event queue, owned by the UI thread.
#[derive( Debug )]
pub struct EventQueue {
    rx: Receiver<Event>,
}


impl EventQueue {
    /// Takes every pending event without waiting.
    pub fn drain( &self ) -> Vec<Event> {
        self.rx.try_iter().collect()
    }
}


/// Creates a bounded event queue.
pub fn event_queue( capacity: usize ) -> ( EventSender, EventQueue ) {
    let ( tx, rx ) = mpsc::sync_channel( capacity );
    ( EventSender { tx }, EventQueue { rx } )
}


#[cfg( test )]
mod tests {
    use super::*;
    use std::thread;


    #[test]
    fn test_drain_preserves_order() {
        let ( tx, queue ) = event_queue( 4 );
        assert!( tx.send( Event::Connected ) );
        assert!( tx.send( Event::Disconnected( "eof".into() ) ) );
        assert_eq!( queue.drain(), vec![ Event::Connected, Event::Disconnected( "eof".into() ) ] );
        assert!( queue.drain().is_empty() );
    }


    #[test]
    fn test_full_queue_skips_status() {
        let ( tx, queue ) = event_queue( 1 );
        assert!( tx.send( Event::Status( Status::default() ) ) );
        let newer = Status { volume: Some( 40 ), ..Status::default() };
        assert!( tx.send( Event::Status( newer ) ) );
        assert_eq!( queue.drain(), vec![ Event::Status( Status::default() ) ] );
    }


    #[test]
    fn test_failure_survives_a_full_queue() {
        let ( tx, queue ) = event_queue( 1 );
        assert!( tx.send( Event::Status( Status::default() ) ) );

        let producer = thread::spawn( move || {
            tx.send( Event::Listing { kind: ListingKind::Queue, result: Err( "timeout".into() ) } )
        });

        let mut received = queue.drain();
        assert!( producer.join().unwrap() );
        received.extend( queue.drain() );
        assert_eq!( received, vec![
            Event::Status( Status::default() ),
            Event::Listing { kind: ListingKind::Queue, result: Err( "timeout".into() ) },
        ] );
    }


    #[test]
    fn test_failures_are_distinguishable() {
        let ( tx, queue ) = event_queue( 4 );
        tx.send( Event::Listing { kind: ListingKind::Library, result: Err( "timeout".into() ) } );
        match queue.drain().as_slice() {
            [ Event::Listing { kind: ListingKind::Library, result: Err( e ) } ] => assert_eq!( e, "timeout" ),
            other => panic!( "unexpected events: {:?}", other ),
        }
    }


    #[test]
    fn test_send_after_consumer_dropped() {
        let ( tx, queue ) = event_queue( 4 );
        drop( queue );
        assert!( !tx.send( Event::Connected ) );
    }
}
