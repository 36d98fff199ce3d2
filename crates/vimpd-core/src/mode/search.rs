//! Search mode: `/` and `?` pattern entry with incremental matching.

use regex::{ Regex, RegexBuilder };
use thiserror::Error;

use crate::context::Context;
use crate::key::Key;
use crate::mode::input::LineInput;
use crate::mode::{ Mode, ModeName, Prompt };
use crate::window::Window;


/// Errors reported by searches.
#[derive( Debug, Error )]
pub enum SearchError {
    #[error( "Pattern not found: {0}" )]
    NotFound( String ),

    #[error( "No previous search pattern" )]
    NoPattern,

    #[error( "Invalid pattern: {0}" )]
    Pattern( #[from] regex::Error ),
}


#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}


impl Direction {
    pub fn reverse( self ) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }


    fn from_key( key: Key ) -> Option<Self> {
        match key.as_char() {
            Some( '/' ) => Some( Direction::Forward ),
            Some( '?' ) => Some( Direction::Backward ),
            _ => None,
        }
    }
}


/// The last committed search, used by `n` and `N`.
#[derive( Debug, Default )]
pub struct SearchState {
    pattern: Option<String>,
    direction: Direction,
}


impl SearchState {
    pub fn pattern( &self ) -> Option<&str> {
        self.pattern.as_deref()
    }


    pub fn direction( &self ) -> Direction {
        self.direction
    }


    pub fn set( &mut self, pattern: &str, direction: Direction ) {
        self.pattern = Some( pattern.to_string() );
        self.direction = direction;
    }
}


pub fn build_regex( pattern: &str, ignore_case: bool ) -> Result<Regex, regex::Error> {
    RegexBuilder::new( pattern ).case_insensitive( ignore_case ).build()
}


/// Finds the next line after `from` whose search text matches.
pub fn find_match(
    window: &dyn Window,
    regex: &Regex,
    from: usize,
    direction: Direction,
    wrap: bool,
) -> Option<usize> {
    let len = window.len();
    if len == 0 {
        return None;
    }
    let from = from.min( len - 1 );

    let matches = |line: &usize| window.search_pattern( *line ).is_some_and( |text| regex.is_match( text ) );

    match direction {
        Direction::Forward => {
            let ahead = ( from + 1 )..len;
            if wrap {
                ahead.chain( 0..=from ).find( matches )
            } else {
                ahead.into_iter().find( matches )
            }
        }
        Direction::Backward => {
            let behind = ( 0..from ).rev();
            if wrap {
                behind.chain( ( from..len ).rev() ).find( matches )
            } else {
                behind.into_iter().find( matches )
            }
        }
    }
}


/// Repeats the last search `count` times, `reverse` flipping its direction.
pub fn search_again( ctx: &mut Context, reverse: bool, count: usize ) -> Result<(), SearchError> {
    let pattern = ctx.search.pattern().ok_or( SearchError::NoPattern )?.to_string();
    let regex = build_regex( &pattern, ctx.settings.ignorecase )?;
    let direction = if reverse { ctx.search.direction().reverse() } else { ctx.search.direction() };
    let wrap = ctx.settings.searchwrap;

    if ctx.screen.is_empty() {
        return Err( SearchError::NotFound( pattern ) );
    }
    let window = ctx.screen.active_mut();
    let mut line = window.current_line();
    for _ in 0..count.max( 1 ) {
        line = find_match( &*window, &regex, line, direction, wrap )
            .ok_or_else( || SearchError::NotFound( pattern.clone() ) )?;
    }
    window.scroll_to( line );
    Ok(())
}


/// Pattern entry for `/` and `?`.
#[derive( Debug, Default )]
pub struct SearchMode {
    input: LineInput,
    direction: Direction,
    /// Current line when the search started
    origin: usize,
}


impl SearchMode {
    pub fn new() -> Self {
        Self { input: LineInput::new( '/' ), ..Self::default() }
    }


    fn restore_origin( &self, ctx: &mut Context ) {
        if ctx.screen.is_empty() {
            return;
        }
        let window = ctx.screen.active_mut();
        if window.current_line() != self.origin {
            window.scroll_to( self.origin );
        }
    }


    fn incremental( &self, ctx: &mut Context ) {
        self.restore_origin( ctx );
        if self.input.is_empty() || ctx.screen.is_empty() {
            return;
        }
        // Half-typed patterns are often invalid
        let Ok( regex ) = build_regex( self.input.content(), ctx.settings.ignorecase ) else {
            return;
        };
        let wrap = ctx.settings.searchwrap;
        let window = ctx.screen.active_mut();
        if let Some( line ) = find_match( &*window, &regex, self.origin, self.direction, wrap ) {
            window.scroll_to( line );
        }
    }


    fn commit( &mut self, ctx: &mut Context ) {
        self.restore_origin( ctx );

        let typed = self.input.content().to_string();
        self.input.push_history( &typed );

        // An empty pattern reuses the previous one in the new direction
        let pattern = if typed.is_empty() {
            match ctx.search.pattern() {
                Some( previous ) => previous.to_string(),
                None => {
                    ctx.status.error( SearchError::NoPattern.to_string() );
                    return;
                }
            }
        } else {
            typed
        };

        ctx.search.set( &pattern, self.direction );
        tracing::debug!( "Search {:?} for {}", self.direction, pattern );
        if let Err( e ) = search_again( ctx, false, 1 ) {
            ctx.status.error( e.to_string() );
        }
    }
}


impl Mode for SearchMode {
    fn name( &self ) -> ModeName {
        ModeName::Search
    }


    fn initialise( &mut self, key: Key, ctx: &mut Context ) {
        self.direction = Direction::from_key( key ).unwrap_or_default();
        self.input.reset();
        self.input.set_prompt( key.as_char().unwrap_or( '/' ) );
        self.origin = if ctx.screen.is_empty() { 0 } else { ctx.screen.active().current_line() };
        ctx.status.clear();
    }


    fn finalise( &mut self, _key: Key, _ctx: &mut Context ) {
        self.input.clear();
    }


    fn refresh( &self, _ctx: &Context ) -> Option<Prompt> {
        Some( self.input.to_prompt() )
    }


    fn handle( &mut self, key: Key, ctx: &mut Context ) -> bool {
        match key {
            Key::ENTER => self.commit( ctx ),
            Key::ESCAPE => self.restore_origin( ctx ),
            Key::BACKSPACE if self.input.is_empty() => self.restore_origin( ctx ),
            _ => {
                let before = self.input.content().to_string();
                if self.input.edit( key ) && ctx.settings.incsearch && self.input.content() != before {
                    self.incremental( ctx );
                }
            }
        }
        true
    }


    fn causes_mode_to_start( &self, key: Key ) -> bool {
        Direction::from_key( key ).is_some()
    }


    fn causes_mode_to_end( &self, key: Key ) -> bool {
        matches!( key, Key::ENTER | Key::ESCAPE ) || ( key == Key::BACKSPACE && self.input.is_empty() )
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::testing::{ context, FakePlayer };


    fn search( mode: &mut SearchMode, ctx: &mut Context, prompt: char, text: &str ) {
        mode.initialise( Key::char( prompt ), ctx );
        for c in text.chars() {
            mode.handle( Key::char( c ), ctx );
        }
    }


    #[test]
    fn test_forward_search_and_repeat() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = SearchMode::new();
        search( &mut mode, &mut ctx, '/', "line 5" );
        mode.handle( Key::ENTER, &mut ctx );
        assert_eq!( ctx.screen.active().current_line(), 5 );

        search_again( &mut ctx, false, 1 ).unwrap();
        assert_eq!( ctx.screen.active().current_line(), 50 );
        search_again( &mut ctx, true, 1 ).unwrap();
        assert_eq!( ctx.screen.active().current_line(), 5 );
        search_again( &mut ctx, false, 3 ).unwrap();
        assert_eq!( ctx.screen.active().current_line(), 52 );
    }


    #[test]
    fn test_backward_search_wraps() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = SearchMode::new();
        search( &mut mode, &mut ctx, '?', "line 9" );
        assert_eq!( mode.refresh( &ctx ).unwrap().text, "?line 9" );
        mode.handle( Key::ENTER, &mut ctx );
        assert_eq!( ctx.screen.active().current_line(), 99 );
        assert_eq!( ctx.search.direction(), Direction::Backward );
    }


    #[test]
    fn test_no_wrap_reports_not_found() {
        let mut ctx = context( &FakePlayer::connected() );
        ctx.settings.searchwrap = false;
        let mut mode = SearchMode::new();
        search( &mut mode, &mut ctx, '?', "line 9" );
        mode.handle( Key::ENTER, &mut ctx );
        assert_eq!( ctx.screen.active().current_line(), 0 );
        assert_eq!( ctx.status.message().unwrap().text, "Pattern not found: line 9" );
    }


    #[test]
    fn test_incremental_moves_and_escape_restores() {
        let mut ctx = context( &FakePlayer::connected() );
        ctx.screen.active_mut().scroll_to( 10 );
        let mut mode = SearchMode::new();
        search( &mut mode, &mut ctx, '/', "line 4" );
        assert_eq!( ctx.screen.active().current_line(), 40 );
        mode.handle( Key::char( '2' ), &mut ctx );
        assert_eq!( ctx.screen.active().current_line(), 42 );
        mode.handle( Key::ESCAPE, &mut ctx );
        assert_eq!( ctx.screen.active().current_line(), 10 );
        assert!( ctx.search.pattern().is_none() );
    }


    #[test]
    fn test_incsearch_off_waits_for_enter() {
        let mut ctx = context( &FakePlayer::connected() );
        ctx.settings.incsearch = false;
        let mut mode = SearchMode::new();
        search( &mut mode, &mut ctx, '/', "line 7" );
        assert_eq!( ctx.screen.active().current_line(), 0 );
        mode.handle( Key::ENTER, &mut ctx );
        assert_eq!( ctx.screen.active().current_line(), 7 );
    }


    #[test]
    fn test_ignorecase() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = SearchMode::new();
        search( &mut mode, &mut ctx, '/', "LINE 7" );
        mode.handle( Key::ENTER, &mut ctx );
        assert_eq!( ctx.screen.active().current_line(), 7 );

        ctx.settings.ignorecase = false;
        assert!( matches!( search_again( &mut ctx, false, 1 ), Err( SearchError::NotFound( _ ) ) ) );
    }


    #[test]
    fn test_invalid_pattern_is_reported() {
        let mut ctx = context( &FakePlayer::connected() );
        let mut mode = SearchMode::new();
        search( &mut mode, &mut ctx, '/', "(" );
        mode.handle( Key::ENTER, &mut ctx );
        assert!( ctx.status.message().unwrap().is_error );
        assert_eq!( ctx.screen.active().current_line(), 0 );
    }


    #[test]
    fn test_mode_boundaries() {
        let mode = SearchMode::new();
        assert!( mode.causes_mode_to_start( Key::char( '/' ) ) );
        assert!( mode.causes_mode_to_start( Key::char( '?' ) ) );
        assert!( !mode.causes_mode_to_start( Key::char( ':' ) ) );
        assert!( mode.causes_mode_to_end( Key::ESCAPE ) );
        assert!( mode.causes_mode_to_end( Key::BACKSPACE ) );
    }
}
