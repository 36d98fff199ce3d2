//! Routes keys to the active mode and applies background events.

use crate::context::Context;
use crate::events::{ Event, ListingKind };
use crate::key::{ format_keys, Key };
use crate::mode::{ CommandMode, Mode, ModeName, NormalMode, Prompt, SearchMode };
use crate::windows::{ LibraryWindow, PlaylistWindow };


/// Owns the three modes and tracks which one is active.
#[derive( Debug )]
pub struct ModeController {
    normal: NormalMode,
    command: CommandMode,
    search: SearchMode,
    active: ModeName,
}


impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}


impl ModeController {
    pub fn new() -> Self {
        Self {
            normal: NormalMode::new(),
            command: CommandMode::new(),
            search: SearchMode::new(),
            active: ModeName::Normal,
        }
    }


    pub fn active( &self ) -> ModeName {
        self.active
    }


    pub fn normal( &self ) -> &NormalMode {
        &self.normal
    }


    pub fn command( &self ) -> &CommandMode {
        &self.command
    }


    pub fn command_mut( &mut self ) -> &mut CommandMode {
        &mut self.command
    }


    /// Command row content of the active mode.
    pub fn prompt( &self, ctx: &Context ) -> Option<Prompt> {
        self.mode( self.active ).refresh( ctx )
    }


    pub fn set_queueing( &mut self, queueing: bool ) {
        self.command.set_queueing( queueing );
    }


    /// Handles one key press.
    ///
    /// In idle normal mode a mapped key is replaced by its mapping. Keys
    /// coming from a mapping are never mapped again.
    ///
    /// @returns false when the program should quit
    pub fn dispatch( &mut self, key: Key, ctx: &mut Context ) -> bool {
        if self.active == ModeName::Normal && self.normal.is_idle() {
            if let Some( keys ) = ctx.keymap.get( key ).map( <[Key]>::to_vec ) {
                tracing::debug!( "Mapped {} to {}", key, format_keys( &keys ) );
                for mapped in keys {
                    if !self.dispatch_unmapped( mapped, ctx ) {
                        return false;
                    }
                }
                return true;
            }
        }
        self.dispatch_unmapped( key, ctx )
    }


    /// Executes ex command lines through command mode, e.g. from a startup file.
    pub fn run_commands<I, S>( &mut self, lines: I, ctx: &mut Context ) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            if !self.command.execute_command( line.as_ref(), ctx ) {
                return false;
            }
        }
        true
    }


    /// Applies an event from a background thread.
    ///
    /// @returns false when a replayed command quit the program
    pub fn handle_event( &mut self, event: Event, ctx: &mut Context ) -> bool {
        match event {
            Event::Connected => {
                tracing::info!( "Server available at {}:{}", ctx.settings.host, ctx.settings.port );
                ctx.status.info( format!( "Connected to {}:{}", ctx.settings.host, ctx.settings.port ) );
                self.command.set_queueing( false );
                return self.command.replay_queue( ctx );
            }
            Event::Disconnected( reason ) => {
                tracing::warn!( "Connection lost: {}", reason );
                ctx.playback = None;
                ctx.status.error( format!( "Disconnected: {}", reason ) );
            }
            Event::Status( status ) => ctx.playback = Some( status ),
            Event::Listing { kind, result: Ok( entries ) } => {
                tracing::debug!( "Received {} {} entries", entries.len(), listing_name( kind ) );
                match kind {
                    ListingKind::Queue => update_window( ctx, PlaylistWindow::NAME, entries ),
                    ListingKind::Library => update_window( ctx, LibraryWindow::NAME, entries ),
                    ListingKind::Playlists => ctx.playlists = entries,
                }
            }
            Event::Listing { kind, result: Err( e ) } => {
                tracing::warn!( "Failed to fetch {}: {}", listing_name( kind ), e );
                ctx.status.error( format!( "Failed to fetch {}: {}", listing_name( kind ), e ) );
            }
        }
        true
    }


    fn dispatch_unmapped( &mut self, key: Key, ctx: &mut Context ) -> bool {
        let next = self.transition( key );
        let running = self.mode_mut( self.active ).handle( key, ctx );

        if let Some( next ) = next {
            tracing::debug!( "Mode {} -> {} on {}", self.active, next, key );
            self.mode_mut( self.active ).finalise( key, ctx );
            self.active = next;
            self.mode_mut( next ).initialise( key, ctx );
        }
        running
    }


    /// The mode `key` switches to, decided before the key is handled.
    fn transition( &self, key: Key ) -> Option<ModeName> {
        match self.active {
            ModeName::Normal => [ ModeName::Command, ModeName::Search ]
                .into_iter()
                .find( |name| self.mode( *name ).causes_mode_to_start( key ) ),
            active => self.mode( active ).causes_mode_to_end( key ).then_some( ModeName::Normal ),
        }
    }


    fn mode( &self, name: ModeName ) -> &dyn Mode {
        match name {
            ModeName::Normal => &self.normal,
            ModeName::Command => &self.command,
            ModeName::Search => &self.search,
        }
    }


    fn mode_mut( &mut self, name: ModeName ) -> &mut dyn Mode {
        match name {
            ModeName::Normal => &mut self.normal,
            ModeName::Command => &mut self.command,
            ModeName::Search => &mut self.search,
        }
    }
}


fn listing_name( kind: ListingKind ) -> &'static str {
    match kind {
        ListingKind::Queue => "queue",
        ListingKind::Library => "library",
        ListingKind::Playlists => "playlists",
    }
}


fn update_window( ctx: &mut Context, name: &str, entries: Vec<String> ) {
    match ctx.screen.window_mut( name ) {
        Some( window ) => window.update( entries ),
        None => tracing::warn!( "No {} window for listing", name ),
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::key::parse_keys;
    use crate::player::Player;
    use crate::testing::{ context, playing, FakePlayer };


    fn keys( controller: &mut ModeController, ctx: &mut Context, notation: &str ) -> bool {
        parse_keys( notation )
            .unwrap()
            .into_iter()
            .all( |key| controller.dispatch( key, ctx ) )
    }


    #[test]
    fn test_command_line_round_trip() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut controller = ModeController::new();

        keys( &mut controller, &mut ctx, ":nex" );
        assert_eq!( controller.active(), ModeName::Command );
        assert_eq!( controller.prompt( &ctx ).unwrap().text, ":nex" );

        keys( &mut controller, &mut ctx, "t<CR>" );
        assert_eq!( controller.active(), ModeName::Normal );
        assert!( controller.prompt( &ctx ).is_none() );
        assert_eq!( player.calls(), vec![ "next" ] );
    }


    #[test]
    fn test_escape_and_backspace_leave_command_mode() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut controller = ModeController::new();

        keys( &mut controller, &mut ctx, ":stop<Esc>" );
        assert_eq!( controller.active(), ModeName::Normal );

        keys( &mut controller, &mut ctx, ":s<BS>" );
        assert_eq!( controller.active(), ModeName::Command );
        keys( &mut controller, &mut ctx, "<BS>" );
        assert_eq!( controller.active(), ModeName::Normal );
        assert!( player.calls().is_empty() );
    }


    #[test]
    fn test_search_mode_transition() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut controller = ModeController::new();

        keys( &mut controller, &mut ctx, "/line 7" );
        assert_eq!( controller.active(), ModeName::Search );
        assert_eq!( controller.prompt( &ctx ).unwrap().text, "/line 7" );
        keys( &mut controller, &mut ctx, "<CR>" );
        assert_eq!( controller.active(), ModeName::Normal );
        assert_eq!( ctx.screen.active().current_line(), 7 );

        keys( &mut controller, &mut ctx, "n" );
        assert_eq!( ctx.screen.active().current_line(), 70 );
    }


    #[test]
    fn test_exactly_one_mode_is_active() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut controller = ModeController::new();
        let sequence = [
            ( ":", ModeName::Command ),
            ( "/", ModeName::Command ),
            ( "<Esc>", ModeName::Normal ),
            ( "?", ModeName::Search ),
            ( ":", ModeName::Search ),
            ( "<CR>", ModeName::Normal ),
            ( "j", ModeName::Normal ),
            ( "<Esc>", ModeName::Normal ),
        ];
        for ( notation, expected ) in sequence {
            keys( &mut controller, &mut ctx, notation );
            assert_eq!( controller.active(), expected, "after {}", notation );
            assert_eq!( controller.prompt( &ctx ).is_some(), expected != ModeName::Normal );
        }
    }


    #[test]
    fn test_normal_keys_are_handled() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut controller = ModeController::new();
        keys( &mut controller, &mut ctx, "3j" );
        assert_eq!( ctx.screen.active().current_line(), 3 );
        assert_eq!( controller.normal().pending(), 0 );
    }


    #[test]
    fn test_mapping_expands_in_normal_mode() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        ctx.keymap.map( Key::char( 'S' ), parse_keys( ":stop<CR>" ).unwrap() );
        let mut controller = ModeController::new();

        assert!( keys( &mut controller, &mut ctx, "S" ) );
        assert_eq!( player.calls(), vec![ "stop" ] );
        assert_eq!( controller.active(), ModeName::Normal );

        // Not expanded while typing a command
        keys( &mut controller, &mut ctx, ":echo S<CR>" );
        assert_eq!( ctx.status.message().unwrap().text, "S" );
    }


    #[test]
    fn test_mapping_is_not_recursive() {
        let mut ctx = context( &FakePlayer::connected() );
        ctx.keymap.map( Key::char( 'j' ), parse_keys( "jj" ).unwrap() );
        let mut controller = ModeController::new();
        keys( &mut controller, &mut ctx, "j" );
        assert_eq!( ctx.screen.active().current_line(), 2 );
    }


    #[test]
    fn test_mapping_skipped_after_prefix() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        ctx.keymap.map( Key::char( 't' ), parse_keys( ":stop<CR>" ).unwrap() );
        let mut controller = ModeController::new();
        keys( &mut controller, &mut ctx, "gt" );
        assert_eq!( ctx.screen.active().name(), "playlist" );
        assert!( player.calls().is_empty() );
    }


    #[test]
    fn test_quit_through_mapping() {
        let mut ctx = context( &FakePlayer::connected() );
        ctx.keymap.map( Key::char( 'Q' ), parse_keys( ":quit<CR>" ).unwrap() );
        let mut controller = ModeController::new();
        assert!( !controller.dispatch( Key::char( 'Q' ), &mut ctx ) );
    }


    #[test]
    fn test_connected_event_replays_queue() {
        let player = FakePlayer::default();
        let mut ctx = context( &player );
        let mut controller = ModeController::new();
        controller.set_queueing( true );
        assert!( controller.run_commands( [ "volume 20", "alias np next", "np" ], &mut ctx ) );
        assert_eq!( controller.command().queued().count(), 2 );

        let mut handle = player.clone();
        handle.connect( "localhost", 6600 ).unwrap();
        player.clear_calls();

        assert!( controller.handle_event( Event::Connected, &mut ctx ) );
        assert_eq!( player.calls(), vec![ "volume 20", "next" ] );
        assert!( !controller.command().is_queueing() );
        assert_eq!( ctx.status.message().unwrap().text, "Connected to localhost:6600" );
    }


    #[test]
    fn test_listing_events_update_windows() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut controller = ModeController::new();

        controller.handle_event( Event::Listing {
            kind: ListingKind::Queue,
            result: Ok( vec![ "a.flac".into(), "b.flac".into() ] ),
        }, &mut ctx );
        controller.handle_event( Event::Listing {
            kind: ListingKind::Playlists,
            result: Ok( vec![ "mix".into() ] ),
        }, &mut ctx );

        assert_eq!( ctx.window_lines( "playlist" ), vec![ "a.flac", "b.flac" ] );
        assert_eq!( ctx.playlists, vec![ "mix" ] );
        assert!( ctx.status.message().is_none() );

        controller.handle_event( Event::Listing {
            kind: ListingKind::Library,
            result: Err( "timeout".into() ),
        }, &mut ctx );
        let message = ctx.status.message().unwrap();
        assert!( message.is_error );
        assert_eq!( message.text, "Failed to fetch library: timeout" );
    }


    #[test]
    fn test_status_and_disconnect_events() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut controller = ModeController::new();
        controller.handle_event( Event::Status( playing() ), &mut ctx );
        assert_eq!( ctx.playback, Some( playing() ) );

        controller.handle_event( Event::Disconnected( "connection reset".into() ), &mut ctx );
        assert!( ctx.playback.is_none() );
        assert_eq!( ctx.status.message().unwrap().text, "Disconnected: connection reset" );
    }
}
