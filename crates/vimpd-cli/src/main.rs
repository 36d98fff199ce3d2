//! vimpd CLI - Modal terminal client for the Music Player Daemon

mod cli;
mod config;
mod keys;
mod mpd_player;
mod poller;
mod ui;

use std::fs::{ self, File };
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{ Context as _, Result };
use clap::Parser;
use crossterm::{
    event::{ self, Event as TermEvent, KeyEventKind },
    terminal::{ disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen },
    ExecutableCommand,
};
use ratatui::prelude::*;

use cli::Args;
use mpd_player::{ Endpoint, MpdPlayer };

use vimpd_core::{
    event_queue, Context, EventQueue, HelpWindow, LibraryWindow, ModeController, PlaylistWindow,
    Screen, Settings, EVENT_QUEUE_CAPACITY,
};


/// How long to wait for a key before redrawing.
const KEY_TIMEOUT: Duration = Duration::from_millis( 100 );


/// Sets up the file logger. Logging must never write to the terminal.
fn init_logging( args: &Args ) -> Result<()> {
    let path = match &args.log {
        Some( path ) => path.clone(),
        None => match dirs::cache_dir() {
            Some( dir ) => dir.join( "vimpd" ).join( "vimpd.log" ),
            None => return Ok(()),
        },
    };

    if let Some( parent ) = path.parent() {
        fs::create_dir_all( parent )
            .with_context( || format!( "Failed to create log directory {}", parent.display() ) )?;
    }
    let file = File::create( &path )
        .with_context( || format!( "Failed to open log file {}", path.display() ) )?;

    let level: tracing::Level = args.log_level
        .parse()
        .map_err( |_| anyhow::anyhow!( "Invalid log level: {}", args.log_level ) )?;

    // A subscriber may already be installed, e.g. under a test harness
    let _ = tracing_subscriber::fmt()
        .with_max_level( level )
        .with_ansi( false )
        .with_writer( Mutex::new( file ) )
        .try_init();
    Ok(())
}


/// Restores the terminal before the default panic message is printed.
fn install_panic_hook() {
    let default_panic = std::panic::take_hook();
    std::panic::set_hook( Box::new( move |info| {
        let _ = disable_raw_mode();
        let _ = io::stdout().execute( LeaveAlternateScreen );
        tracing::error!( "panic: {}", info );
        default_panic( info );
    }));
}


/// Builds the screen with its windows, sized for the terminal.
fn build_screen( rows: usize, cols: usize ) -> Screen {
    let mut screen = Screen::new( rows, cols );
    screen.add( Box::new( PlaylistWindow::new() ) );
    screen.add( Box::new( LibraryWindow::new() ) );
    screen.add( Box::new( HelpWindow::new() ) );
    screen
}


fn main() -> Result<()> {
    let args = Args::parse();
    init_logging( &args )?;

    let settings_path: Option<PathBuf> = args.config.clone().or_else( config::settings_path );
    let mut settings = settings_path
        .as_deref()
        .map( config::load_settings )
        .unwrap_or_default();
    if let Some( host ) = &args.host {
        settings.host = host.clone();
    }
    if let Some( port ) = args.port {
        settings.port = port;
    }
    tracing::info!( "Starting vimpd for {}:{}", settings.host, settings.port );

    let endpoint = Endpoint::default();
    let ( events, queue ) = event_queue( EVENT_QUEUE_CAPACITY );
    let mut poller = poller::spawn( endpoint.clone(), events ).context( "Failed to start status poller" )?;

    // Setup terminal
    install_panic_hook();
    enable_raw_mode()?;
    io::stdout().execute( EnterAlternateScreen )?;

    let mut terminal = Terminal::new( CrosstermBackend::new( io::stdout() ) )?;
    let result = run( &mut terminal, &args, settings.clone(), endpoint, &queue );

    // Cleanup. The queue goes first so a poller blocked on a send can exit.
    disable_raw_mode()?;
    io::stdout().execute( LeaveAlternateScreen )?;
    drop( queue );
    poller.stop();

    let final_settings = result?;
    if final_settings != settings {
        if let Some( path ) = settings_path {
            config::save_settings( &final_settings, &path );
        }
    }

    tracing::info!( "Exiting" );
    Ok(())
}


/// Runs the UI loop until a quit command. Returns the settings as left by
/// `:set`.
fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    args: &Args,
    settings: Settings,
    endpoint: Endpoint,
    queue: &EventQueue,
) -> Result<Settings> {
    let size = terminal.size()?;
    let screen = build_screen( ui::window_rows( size.height ), size.width as usize );
    let initial_window = settings.window.clone();
    let autoconnect = settings.autoconnect && !args.no_connect;

    let mut ctx = Context::new( screen, Box::new( MpdPlayer::new( endpoint ) ), settings );
    if let Err( e ) = ctx.screen.select_named( &initial_window ) {
        tracing::warn!( "Initial window: {}", e );
    }

    let mut controller = ModeController::new();

    // Startup commands wait for the connection
    controller.set_queueing( true );
    let rc = config::rc_path().map( |path| config::load_rc( &path ) ).unwrap_or_default();
    let mut running = controller.run_commands( &rc, &mut ctx )
        && controller.run_commands( &args.commands, &mut ctx );
    if running && autoconnect {
        running = controller.run_commands( [ "connect" ], &mut ctx );
    }

    while running {
        for event in queue.drain() {
            if !controller.handle_event( event, &mut ctx ) {
                running = false;
                break;
            }
        }
        if !running {
            break;
        }

        terminal.draw( |frame| ui::draw( frame, &ctx, &controller ) )?;

        if event::poll( KEY_TIMEOUT )? {
            match event::read()? {
                TermEvent::Key( key ) if key.kind == KeyEventKind::Press => {
                    if let Some( key ) = keys::translate( key ) {
                        running = controller.dispatch( key, &mut ctx );
                    }
                }
                TermEvent::Resize( cols, rows ) => {
                    ctx.screen.resize( ui::window_rows( rows ), cols as usize );
                }
                _ => {}
            }
        }
    }

    ctx.player.disconnect();
    Ok( ctx.settings )
}
