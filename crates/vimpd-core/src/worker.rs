//! Periodic background worker with cooperative shutdown.

use std::io;
use std::sync::{ Arc, Condvar, Mutex };
use std::thread::{ self, JoinHandle };
use std::time::Duration;


/// Running flag shared with the worker thread.
#[derive( Debug )]
struct Shared {
    running: Mutex<bool>,
    wake: Condvar,
}


impl Shared {
    fn is_running( &self ) -> bool {
        self.running.lock().map( |r| *r ).unwrap_or( false )
    }


    /// Sleeps up to `timeout`, returning early when stopped.
    ///
    /// @returns Whether the worker should keep going
    fn wait( &self, timeout: Duration ) -> bool {
        let Ok( running ) = self.running.lock() else {
            return false;
        };
        match self.wake.wait_timeout_while( running, timeout, |running| *running ) {
            Ok(( running, _ )) => *running,
            Err( _ ) => false,
        }
    }


    fn stop( &self ) {
        if let Ok( mut running ) = self.running.lock() {
            *running = false;
        }
        self.wake.notify_all();
    }
}


/// A thread that runs a task every `interval` until stopped.
///
/// The task returns false to stop the worker from inside.
#[derive( Debug )]
pub struct Worker {
    name: String,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}


impl Worker {
    /// Spawns the worker. The first tick runs immediately.
    pub fn spawn<F>( name: &str, interval: Duration, mut task: F ) -> io::Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let shared = Arc::new( Shared {
            running: Mutex::new( true ),
            wake: Condvar::new(),
        });
        let thread_shared = Arc::clone( &shared );

        let handle = thread::Builder::new()
            .name( name.to_string() )
            .spawn( move || {
                while thread_shared.is_running() {
                    if !task() {
                        break;
                    }
                    if !thread_shared.wait( interval ) {
                        break;
                    }
                }
                tracing::debug!( "Worker {} finished", thread::current().name().unwrap_or( "?" ) );
            })?;

        tracing::debug!( "Worker {} started", name );
        Ok( Self { name: name.to_string(), shared, handle: Some( handle ) } )
    }


    pub fn name( &self ) -> &str {
        &self.name
    }


    pub fn is_running( &self ) -> bool {
        self.shared.is_running() && self.handle.as_ref().is_some_and( |h| !h.is_finished() )
    }


    /// Signals the thread and waits for it to exit. Idempotent.
    pub fn stop( &mut self ) {
        self.shared.stop();
        if let Some( handle ) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!( "Worker {} panicked", self.name );
            }
        }
    }
}


impl Drop for Worker {
    fn drop( &mut self ) {
        self.stop();
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use std::time::Instant;


    #[test]
    fn test_stop_interrupts_long_wait() {
        let ticks = Arc::new( AtomicUsize::new( 0 ) );
        let counter = Arc::clone( &ticks );
        let mut worker = Worker::spawn( "test-wait", Duration::from_secs( 60 ), move || {
            counter.fetch_add( 1, Ordering::SeqCst );
            true
        }).unwrap();

        let started = Instant::now();
        while ticks.load( Ordering::SeqCst ) == 0 {
            thread::sleep( Duration::from_millis( 1 ) );
        }
        worker.stop();

        assert!( started.elapsed() < Duration::from_secs( 10 ) );
        assert_eq!( ticks.load( Ordering::SeqCst ), 1 );
        assert!( !worker.is_running() );
    }


    #[test]
    fn test_task_can_finish_itself() {
        let ticks = Arc::new( AtomicUsize::new( 0 ) );
        let counter = Arc::clone( &ticks );
        let mut worker = Worker::spawn( "test-finish", Duration::from_millis( 1 ), move || {
            counter.fetch_add( 1, Ordering::SeqCst ) < 2
        }).unwrap();

        while ticks.load( Ordering::SeqCst ) < 3 {
            thread::sleep( Duration::from_millis( 1 ) );
        }
        worker.stop();
        assert_eq!( ticks.load( Ordering::SeqCst ), 3 );
    }
}
