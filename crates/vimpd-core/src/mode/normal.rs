//! Normal mode: single keys with count prefixes.

use std::collections::HashMap;

use crate::command::CommandError;
use crate::context::Context;
use crate::key::Key;
use crate::mode::search::search_again;
use crate::mode::{ Mode, ModeName, Prompt };
use crate::selection::Position;
use crate::viewport::Alignment;
use crate::window::Window;


/// Volume change per `+` or `-`.
const VOLUME_STEP: i64 = 5;


/// Which key table the next key is looked up in.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash, Default )]
pub enum Table {
    #[default]
    Primary,
    /// Keys after `g`
    Jump,
    /// Keys after `z`
    Align,
    /// Alt-prefixed keys
    Escape,
}


/// What a bound key does.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum Action {
    /// Move the cursor by this many lines per count
    Cursor( isize ),
    /// Scroll the view by this many lines per count
    ScrollView( isize ),
    /// Scroll by half a screen in this direction
    HalfPage( isize ),
    /// Scroll by a screen in this direction
    Page( isize ),
    Select( Position ),
    /// Go to the counted line, else the first
    FirstLine,
    /// Go to the counted line, else the last
    LastLine,
    NextWindow,
    PreviousWindow,
    /// Select a window by 0-based index
    SelectWindow( usize ),
    Align( Alignment ),
    Confirm,
    Add,
    AddAll,
    Delete,
    DeleteAll,
    Visual,
    SwitchVisualEnd,
    SearchNext { reverse: bool },
    TogglePause,
    Stop,
    Next,
    Previous,
    /// Change the volume by this many steps per count
    Volume( i64 ),
    ToggleRandom,
    ToggleRepeat,
    ToggleSingle,
    /// Look the next key up in another table
    Prefix( Table ),
    RepeatLast,
    Quit,
}


/// The last action run, replayed by `.`.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct LastAction {
    pub key: Key,
    /// Count as typed, 0 when none was given
    pub count: u32,
    pub table: Table,
}


/// Normal mode key dispatch.
#[derive( Debug )]
pub struct NormalMode {
    tables: HashMap<Table, HashMap<Key, Action>>,
    table: Table,
    pending: u32,
    last: Option<LastAction>,
}


impl Default for NormalMode {
    fn default() -> Self {
        Self::new()
    }
}


impl NormalMode {
    pub fn new() -> Self {
        let mut mode = Self {
            tables: HashMap::new(),
            table: Table::Primary,
            pending: 0,
            last: None,
        };
        mode.bind_defaults();
        mode
    }


    fn bind( &mut self, table: Table, keys: &[Key], action: Action ) {
        let entries = self.tables.entry( table ).or_default();
        for key in keys {
            entries.insert( *key, action );
        }
    }


    fn bind_defaults( &mut self ) {
        use Action::*;

        let c = Key::char;

        self.bind( Table::Primary, &[ c( 'j' ), Key::DOWN ], Cursor( 1 ) );
        self.bind( Table::Primary, &[ c( 'k' ), Key::UP ], Cursor( -1 ) );
        self.bind( Table::Primary, &[ Key::ctrl( 'e' ) ], ScrollView( 1 ) );
        self.bind( Table::Primary, &[ Key::ctrl( 'y' ) ], ScrollView( -1 ) );
        self.bind( Table::Primary, &[ Key::ctrl( 'd' ) ], HalfPage( 1 ) );
        self.bind( Table::Primary, &[ Key::ctrl( 'u' ) ], HalfPage( -1 ) );
        self.bind( Table::Primary, &[ Key::ctrl( 'f' ), Key::PAGE_DOWN ], Page( 1 ) );
        self.bind( Table::Primary, &[ Key::ctrl( 'b' ), Key::PAGE_UP ], Page( -1 ) );
        self.bind( Table::Primary, &[ c( 'H' ) ], Select( Position::First ) );
        self.bind( Table::Primary, &[ c( 'M' ) ], Select( Position::Middle ) );
        self.bind( Table::Primary, &[ c( 'L' ) ], Select( Position::Last ) );
        self.bind( Table::Primary, &[ c( 'G' ), Key::END ], LastLine );
        self.bind( Table::Primary, &[ Key::HOME ], FirstLine );
        self.bind( Table::Primary, &[ Key::TAB ], NextWindow );
        self.bind( Table::Primary, &[ Key::BACK_TAB ], PreviousWindow );
        self.bind( Table::Primary, &[ Key::ENTER ], Confirm );
        self.bind( Table::Primary, &[ c( 'a' ) ], Add );
        self.bind( Table::Primary, &[ c( 'A' ) ], AddAll );
        self.bind( Table::Primary, &[ c( 'd' ), c( 'x' ) ], Delete );
        self.bind( Table::Primary, &[ c( 'D' ) ], DeleteAll );
        self.bind( Table::Primary, &[ c( 'v' ), c( 'V' ) ], Visual );
        self.bind( Table::Primary, &[ c( 'o' ) ], SwitchVisualEnd );
        self.bind( Table::Primary, &[ c( 'n' ) ], SearchNext { reverse: false } );
        self.bind( Table::Primary, &[ c( 'N' ) ], SearchNext { reverse: true } );
        self.bind( Table::Primary, &[ c( 'p' ) ], TogglePause );
        self.bind( Table::Primary, &[ c( 's' ) ], Stop );
        self.bind( Table::Primary, &[ c( '>' ) ], Next );
        self.bind( Table::Primary, &[ c( '<' ) ], Previous );
        self.bind( Table::Primary, &[ c( '+' ) ], Volume( 1 ) );
        self.bind( Table::Primary, &[ c( '-' ) ], Volume( -1 ) );
        self.bind( Table::Primary, &[ c( 'r' ) ], ToggleRandom );
        self.bind( Table::Primary, &[ c( 'R' ) ], ToggleRepeat );
        self.bind( Table::Primary, &[ c( 'y' ) ], ToggleSingle );
        self.bind( Table::Primary, &[ c( 'g' ) ], Prefix( Table::Jump ) );
        self.bind( Table::Primary, &[ c( 'z' ) ], Prefix( Table::Align ) );
        self.bind( Table::Primary, &[ c( '.' ) ], RepeatLast );
        self.bind( Table::Primary, &[ c( 'q' ) ], Quit );

        self.bind( Table::Jump, &[ c( 'g' ) ], FirstLine );
        self.bind( Table::Jump, &[ c( 't' ) ], NextWindow );
        self.bind( Table::Jump, &[ c( 'T' ) ], PreviousWindow );

        self.bind( Table::Align, &[ c( 't' ), Key::ENTER ], Action::Align( Alignment::Top ) );
        self.bind( Table::Align, &[ c( 'z' ), c( '.' ) ], Action::Align( Alignment::Centre ) );
        self.bind( Table::Align, &[ c( 'b' ), c( '-' ) ], Action::Align( Alignment::Bottom ) );

        for n in 1..=9u8 {
            self.bind( Table::Escape, &[ Key::char( char::from( b'0' + n ) ) ], SelectWindow( usize::from( n - 1 ) ) );
        }
    }


    /// Count typed so far.
    pub fn pending( &self ) -> u32 {
        self.pending
    }


    pub fn table( &self ) -> Table {
        self.table
    }


    pub fn last_action( &self ) -> Option<LastAction> {
        self.last
    }


    /// Whether the next key will be looked up in the primary table.
    pub fn is_idle( &self ) -> bool {
        self.table == Table::Primary
    }


    fn lookup( &self, table: Table, key: Key ) -> Option<Action> {
        self.tables.get( &table ).and_then( |t| t.get( &key ) ).copied()
    }


    fn reset( &mut self ) {
        self.pending = 0;
        self.table = Table::Primary;
    }


    fn repeat_last( &mut self, ctx: &mut Context ) -> bool {
        let Some( last ) = self.last else {
            return true;
        };
        let count = if self.pending != 0 { self.pending } else { last.count };
        tracing::debug!( "Repeat {} x{}", last.key, count );
        self.table = last.table;
        self.pending = count;
        self.handle( last.key, ctx )
    }


    /// Runs one action.
    ///
    /// @param count - Effective count, at least 1
    /// @param typed - Count as typed, 0 when none was given
    fn run( &mut self, action: Action, count: u32, typed: u32, ctx: &mut Context ) -> Result<bool, CommandError> {
        let count = count as usize;
        let scaled = |delta: isize| delta.saturating_mul( isize::try_from( count ).unwrap_or( isize::MAX ) );
        let rows = ctx.screen.rows().max( 1 );

        if ctx.screen.is_empty() && !is_playback( action ) {
            return Ok( action != Action::Quit );
        }

        match action {
            Action::Cursor( delta ) => ctx.screen.active_mut().scroll( scaled( delta ) ),
            Action::ScrollView( delta ) => ctx.screen.active_mut().scroll_view( scaled( delta ) ),
            Action::HalfPage( sign ) => page( ctx.screen.active_mut(), sign * ( rows / 2 ).max( 1 ) as isize ),
            Action::Page( sign ) => page( ctx.screen.active_mut(), scaled( sign * rows as isize ) ),
            Action::Select( position ) => ctx.screen.active_mut().select( position, count ),
            Action::FirstLine => {
                let line = ( typed as usize ).saturating_sub( 1 );
                ctx.screen.active_mut().scroll_to( line );
            }
            Action::LastLine => {
                let window = ctx.screen.active_mut();
                let line = match typed {
                    0 => window.len().saturating_sub( 1 ),
                    n => n as usize - 1,
                };
                window.scroll_to( line );
            }
            Action::NextWindow => ctx.screen.next_window( count ),
            Action::PreviousWindow => ctx.screen.previous_window( count ),
            Action::SelectWindow( index ) => ctx.screen.select_window( index )?,
            Action::Align( alignment ) => ctx.screen.active_mut().align( alignment ),
            Action::Confirm => ctx.screen.active_mut().confirm( ctx.player.as_mut() )?,
            Action::Add => {
                let window = ctx.screen.active_mut();
                let line = window.current_line();
                window.add_line( ctx.player.as_mut(), line, count )?;
            }
            Action::AddAll => ctx.screen.active_mut().add_all_lines( ctx.player.as_mut() )?,
            Action::Delete => {
                let window = ctx.screen.active_mut();
                let line = window.current_line();
                window.delete_line( ctx.player.as_mut(), line, count )?;
            }
            Action::DeleteAll => ctx.screen.active_mut().delete_all_lines( ctx.player.as_mut() )?,
            Action::Visual => ctx.screen.active_mut().visual(),
            Action::SwitchVisualEnd => ctx.screen.active_mut().switch_visual_end(),
            Action::SearchNext { reverse } => search_again( ctx, reverse, count )?,
            Action::TogglePause => ctx.player.toggle_pause()?,
            Action::Stop => ctx.player.stop()?,
            Action::Next => {
                for _ in 0..count {
                    ctx.player.next()?;
                }
            }
            Action::Previous => {
                for _ in 0..count {
                    ctx.player.previous()?;
                }
            }
            Action::Volume( steps ) => {
                let volume = ctx.player.status()?.volume.ok_or_else( || {
                    CommandError::InvalidParameter( "Volume is not available".into() )
                })?;
                let change = steps.saturating_mul( VOLUME_STEP ).saturating_mul( count as i64 );
                let level = ( i64::from( volume ) + change ).clamp( 0, 100 );
                ctx.player.set_volume( level as u32 )?;
            }
            Action::ToggleRandom => {
                let status = ctx.player.status()?;
                ctx.player.set_random( !status.random )?;
            }
            Action::ToggleRepeat => {
                let status = ctx.player.status()?;
                ctx.player.set_repeat( !status.repeat )?;
            }
            Action::ToggleSingle => {
                let status = ctx.player.status()?;
                ctx.player.set_single( !status.single )?;
            }
            Action::Quit => return Ok( false ),
            // Handled before dispatch
            Action::Prefix( _ ) | Action::RepeatLast => {}
        }
        Ok( true )
    }
}


fn is_playback( action: Action ) -> bool {
    matches!(
        action,
        Action::TogglePause
            | Action::Stop
            | Action::Next
            | Action::Previous
            | Action::Volume( _ )
            | Action::ToggleRandom
            | Action::ToggleRepeat
            | Action::ToggleSingle
    )
}


/// Scrolls the view and moves the cursor by the same amount.
fn page( window: &mut dyn Window, delta: isize ) {
    let target = ( window.current_line() as isize ).saturating_add( delta ).max( 0 );
    window.scroll_view( delta );
    let current = window.current_line() as isize;
    window.scroll( target - current );
}


impl Mode for NormalMode {
    fn name( &self ) -> ModeName {
        ModeName::Normal
    }


    fn initialise( &mut self, _key: Key, _ctx: &mut Context ) {
        self.reset();
    }


    fn finalise( &mut self, _key: Key, _ctx: &mut Context ) {
        self.reset();
    }


    fn refresh( &self, _ctx: &Context ) -> Option<Prompt> {
        None
    }


    fn handle( &mut self, key: Key, ctx: &mut Context ) -> bool {
        if key == Key::ESCAPE {
            self.reset();
            if !ctx.screen.is_empty() {
                ctx.screen.active_mut().escape();
            }
            return true;
        }

        let ( table, action ) = if key.is_alt() {
            self.reset();
            match self.lookup( Table::Escape, key.without_alt() ) {
                Some( action ) => ( Table::Escape, action ),
                None => return true,
            }
        } else {
            if self.table == Table::Primary {
                if let Some( digit ) = key.digit() {
                    self.pending = self.pending.saturating_mul( 10 ).saturating_add( digit );
                    return true;
                }
            }

            match self.lookup( self.table, key ) {
                Some( action ) => ( self.table, action ),
                None if self.table != Table::Primary => {
                    // Unknown key after a prefix: treat it as a fresh key
                    self.reset();
                    match self.lookup( Table::Primary, key ) {
                        Some( action ) => ( Table::Primary, action ),
                        None => return true,
                    }
                }
                None => {
                    self.reset();
                    return true;
                }
            }
        };

        match action {
            Action::Prefix( next ) => {
                self.table = next;
                return true;
            }
            Action::RepeatLast => return self.repeat_last( ctx ),
            _ => {}
        }

        let typed = self.pending;
        let count = typed.max( 1 );
        self.last = Some( LastAction { key: if table == Table::Escape { key.without_alt() } else { key }, count: typed, table } );
        self.reset();

        tracing::debug!( "Normal {:?} x{}", action, count );
        match self.run( action, count, typed, ctx ) {
            Ok( running ) => running,
            Err( e ) => {
                ctx.status.error( e.to_string() );
                true
            }
        }
    }


    fn causes_mode_to_start( &self, _key: Key ) -> bool {
        false
    }


    fn causes_mode_to_end( &self, _key: Key ) -> bool {
        false
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::player::Status;
    use crate::testing::{ context, playing, FakePlayer };


    fn press( mode: &mut NormalMode, ctx: &mut Context, keys: &str ) -> bool {
        let mut running = true;
        for c in keys.chars() {
            running = mode.handle( Key::char( c ), ctx );
        }
        running
    }


    fn current( ctx: &Context ) -> usize {
        ctx.screen.active().current_line()
    }


    #[test]
    fn test_count_prefix() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "12" );
        assert_eq!( mode.pending(), 12 );
        press( &mut mode, &mut ctx, "j" );
        assert_eq!( current( &ctx ), 12 );
        assert_eq!( mode.pending(), 0 );
    }


    #[test]
    fn test_count_saturates() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "99999999999999999999" );
        assert_eq!( mode.pending(), u32::MAX );
        press( &mut mode, &mut ctx, "j" );
        assert_eq!( current( &ctx ), 99 );
    }


    #[test]
    fn test_down_then_up_records_last_action() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "3jk" );
        assert_eq!( current( &ctx ), 2 );
        assert_eq!( mode.last_action(), Some( LastAction { key: Key::char( 'k' ), count: 0, table: Table::Primary } ) );
    }


    #[test]
    fn test_repeat_uses_stored_or_fresh_count() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "3j" );
        assert_eq!( mode.last_action().unwrap().count, 3 );
        press( &mut mode, &mut ctx, "." );
        assert_eq!( current( &ctx ), 6 );
        press( &mut mode, &mut ctx, "2." );
        assert_eq!( current( &ctx ), 8 );
        assert_eq!( mode.last_action().unwrap().count, 2 );
        press( &mut mode, &mut ctx, "." );
        assert_eq!( current( &ctx ), 10 );
    }


    #[test]
    fn test_escape_clears_count_and_visual() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "v5" );
        mode.handle( Key::ESCAPE, &mut ctx );
        assert_eq!( mode.pending(), 0 );
        assert!( !ctx.screen.active().view().is_visual() );
        press( &mut mode, &mut ctx, "j" );
        assert_eq!( current( &ctx ), 1 );
    }


    #[test]
    fn test_jump_table() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "G" );
        assert_eq!( current( &ctx ), 99 );
        press( &mut mode, &mut ctx, "gg" );
        assert_eq!( current( &ctx ), 0 );
        press( &mut mode, &mut ctx, "40G" );
        assert_eq!( current( &ctx ), 39 );
        press( &mut mode, &mut ctx, "5gg" );
        assert_eq!( current( &ctx ), 4 );
        assert_eq!( mode.last_action().unwrap().table, Table::Jump );
    }


    #[test]
    fn test_prefix_miss_falls_back_without_count() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "5g" );
        assert_eq!( mode.table(), Table::Jump );
        press( &mut mode, &mut ctx, "j" );
        assert_eq!( current( &ctx ), 1 );
        assert!( mode.is_idle() );
    }


    #[test]
    fn test_window_keys() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "gt" );
        assert_eq!( ctx.screen.active().name(), "playlist" );
        press( &mut mode, &mut ctx, "gT" );
        assert_eq!( ctx.screen.active().name(), "list" );
        mode.handle( Key::char( '3' ).alt(), &mut ctx );
        assert_eq!( ctx.screen.active().name(), "library" );
        mode.handle( Key::BACK_TAB, &mut ctx );
        assert_eq!( ctx.screen.active().name(), "playlist" );
        mode.handle( Key::char( '9' ).alt(), &mut ctx );
        assert!( ctx.status.message().unwrap().is_error );
        assert_eq!( ctx.screen.active().name(), "playlist" );
    }


    #[test]
    fn test_alt_keys_ignore_count() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "7" );
        mode.handle( Key::char( '2' ).alt(), &mut ctx );
        assert_eq!( ctx.screen.active_index(), 1 );
        assert_eq!( mode.pending(), 0 );
    }


    #[test]
    fn test_align_table() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "30jzt" );
        assert_eq!( ctx.screen.active().view().first_line(), 30 );
        press( &mut mode, &mut ctx, "zb" );
        assert_eq!( ctx.screen.active().view().first_line(), 21 );
        press( &mut mode, &mut ctx, "z." );
        assert_eq!( ctx.screen.active().view().first_line(), 25 );
    }


    #[test]
    fn test_half_page_moves_view_and_cursor() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = NormalMode::new();
        mode.handle( Key::ctrl( 'd' ), &mut ctx );
        assert_eq!( current( &ctx ), 5 );
        assert_eq!( ctx.screen.active().view().first_line(), 5 );
        mode.handle( Key::ctrl( 'u' ), &mut ctx );
        assert_eq!( current( &ctx ), 0 );
        assert_eq!( ctx.screen.active().view().first_line(), 0 );
    }


    #[test]
    fn test_screen_positions() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "L" );
        assert_eq!( current( &ctx ), 9 );
        press( &mut mode, &mut ctx, "3H" );
        assert_eq!( current( &ctx ), 2 );
    }


    #[test]
    fn test_visual_delete_ignores_count() {
        let player = FakePlayer::connected();
        let mut ctx = context( &player );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "2jv3j5d" );
        assert_eq!( ctx.screen.active().len(), 96 );
        assert_eq!( player.calls(), vec![ "delete 5", "delete 4", "delete 3", "delete 2" ] );
    }


    #[test]
    fn test_playback_keys() {
        let player = FakePlayer::connected();
        player.set_status( playing() );
        let mut ctx = context( &player );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "p2>s+3-r" );
        assert_eq!( player.calls(), vec![
            "toggle_pause",
            "next",
            "next",
            "stop",
            "volume 55",
            "volume 40",
            "random true",
        ] );
    }


    #[test]
    fn test_volume_clamps() {
        let player = FakePlayer::connected();
        player.set_status( Status { volume: Some( 98 ), ..Status::default() } );
        let mut ctx = context( &player );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "+" );
        assert_eq!( player.calls(), vec![ "volume 100" ] );
    }


    #[test]
    fn test_player_errors_reach_status_line() {
        let mut ctx = context( &FakePlayer::default() );
        let mut mode = NormalMode::new();
        assert!( press( &mut mode, &mut ctx, "p" ) );
        assert_eq!( ctx.status.message().unwrap().text, "Not connected" );
    }


    #[test]
    fn test_search_next_keys() {
        let mut ctx = context( &FakePlayer::connected() );
        ctx.search.set( "line 1", crate::mode::search::Direction::Forward );
        let mut mode = NormalMode::new();
        press( &mut mode, &mut ctx, "n" );
        assert_eq!( current( &ctx ), 1 );
        press( &mut mode, &mut ctx, "2n" );
        assert_eq!( current( &ctx ), 11 );
        press( &mut mode, &mut ctx, "N" );
        assert_eq!( current( &ctx ), 10 );
    }


    #[test]
    fn test_quit() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = NormalMode::new();
        assert!( press( &mut mode, &mut ctx, "j" ) );
        assert!( !press( &mut mode, &mut ctx, "q" ) );
    }
}
