//! Selectable viewport: a viewport with a current line and a visual range.

use crate::viewport::{ Alignment, Viewport };


/// Screen-relative cursor placement (vim `H`, `M` and `L`).
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum Position {
    First,
    Middle,
    Last,
}


/// Cursor and selection bookkeeping layered over a [`Viewport`].
///
/// Outside visual mode the selection is the single current line. In visual
/// mode the anchor end stays where visual mode was entered and the cursor
/// end follows the current line.
#[derive( Debug, Clone )]
pub struct SelectableViewport {
    view: Viewport,
    current: usize,
    visual: bool,
    anchor: usize,
    cursor: usize,
}


impl SelectableViewport {
    pub fn new( rows: usize, cols: usize ) -> Self {
        Self {
            view: Viewport::new( rows, cols ),
            current: 0,
            visual: false,
            anchor: 0,
            cursor: 0,
        }
    }


    /// The underlying scroll state.
    pub fn view( &self ) -> &Viewport {
        &self.view
    }


    pub fn current_line( &self ) -> usize {
        self.current
    }


    pub fn first_line( &self ) -> usize {
        self.view.first_line()
    }


    pub fn last_line( &self, size: usize ) -> usize {
        self.view.last_line( size )
    }


    pub fn is_visual( &self ) -> bool {
        self.visual
    }


    /// The selected lines as an inclusive `(start, end)` pair.
    pub fn selection( &self ) -> ( usize, usize ) {
        ( self.anchor.min( self.cursor ), self.anchor.max( self.cursor ) )
    }


    /// Moves the current line by `delta`, scrolling one step at a time when
    /// the cursor leaves the screen.
    pub fn move_cursor( &mut self, delta: isize, size: usize ) {
        let target = if delta < 0 {
            self.current.saturating_sub( delta.unsigned_abs() )
        } else {
            self.current.saturating_add( delta as usize )
        };
        self.set_line( target, size );
    }


    /// Places the cursor on `line` without centring the viewport.
    pub fn set_line( &mut self, line: usize, size: usize ) {
        self.current = clamp_line( line, size );
        self.follow_cursor( size );
        self.update_range();
    }


    /// Scrolls the viewport, dragging the cursor along when it would go
    /// off screen.
    pub fn scroll_view( &mut self, delta: isize, size: usize ) {
        self.view.scroll( delta, size );

        let first = self.view.first_line();
        let last = self.view.last_line( size );
        self.current = clamp_line( self.current.clamp( first, last.max( first ) ), size );
        self.update_range();
    }


    /// Moves the cursor to `line` and centres the viewport on it.
    pub fn scroll_to( &mut self, line: usize, size: usize ) {
        self.current = clamp_line( line, size );
        self.view.scroll_to( self.current, size );
        self.update_range();
    }


    /// Aligns the viewport on the current line.
    pub fn align( &mut self, alignment: Alignment, size: usize ) {
        self.view.align( self.current, alignment, size );
    }


    /// Moves the cursor relative to the visible lines.
    ///
    /// @param position - Which part of the screen to select
    /// @param count - Offset from the top (First) or bottom (Last) edge
    pub fn select( &mut self, position: Position, count: usize, size: usize ) {
        if size == 0 {
            return;
        }

        let count = count.max( 1 );
        let first = self.view.first_line();
        let last = self.view.last_line( size );

        let line = match position {
            Position::First => first.saturating_add( count - 1 ).min( last ),
            Position::Last => last.saturating_sub( count - 1 ).max( first ),
            Position::Middle => first + ( last - first ) / 2,
        };
        self.set_line( line, size );
    }


    /// Toggles visual selection, freezing the anchor at the current line.
    pub fn visual( &mut self ) {
        if self.visual {
            self.escape();
        } else {
            self.visual = true;
            self.anchor = self.current;
            self.cursor = self.current;
        }
    }


    /// Swaps which end of the visual range follows the cursor.
    pub fn switch_visual_end( &mut self, size: usize ) {
        if !self.visual {
            return;
        }
        std::mem::swap( &mut self.anchor, &mut self.cursor );
        self.current = clamp_line( self.cursor, size );
        self.follow_cursor( size );
    }


    /// Leaves visual mode and collapses the selection onto the cursor.
    pub fn escape( &mut self ) {
        self.visual = false;
        self.update_range();
    }


    /// Resolves the lines a ranged operation should act on.
    ///
    /// An active visual selection overrides the explicit `line` and `count`
    /// and is collapsed afterwards.
    ///
    /// @returns The first line and number of lines to operate on
    pub fn take_range( &mut self, line: usize, count: usize ) -> ( usize, usize ) {
        if !self.visual {
            return ( line, count );
        }

        let ( start, end ) = self.selection();
        self.escape();
        ( start, end - start + 1 )
    }


    /// Re-establishes the invariants after the content changed size.
    pub fn fit( &mut self, size: usize ) {
        self.view.fit( size );
        self.current = clamp_line( self.current, size );
        self.anchor = clamp_line( self.anchor, size );
        self.cursor = clamp_line( self.cursor, size );
        self.follow_cursor( size );
        self.update_range();
    }


    pub fn resize( &mut self, rows: usize, cols: usize, size: usize ) {
        self.view.resize( rows, cols, size );
        self.follow_cursor( size );
    }


    fn follow_cursor( &mut self, size: usize ) {
        if size == 0 {
            return;
        }

        let first = self.view.first_line();
        let last = self.view.last_line( size );
        if self.current < first {
            self.view.scroll( -( ( first - self.current ) as isize ), size );
        } else if self.current > last {
            self.view.scroll( ( self.current - last ) as isize, size );
        }
    }


    fn update_range( &mut self ) {
        self.cursor = self.current;
        if !self.visual {
            self.anchor = self.current;
        }
    }
}


fn clamp_line( line: usize, size: usize ) -> usize {
    line.min( size.saturating_sub( 1 ) )
}


#[cfg( test )]
mod tests {
    use super::*;


    fn viewport() -> SelectableViewport {
        SelectableViewport::new( 10, 80 )
    }


    #[test]
    fn test_move_cursor_clamps() {
        let mut view = viewport();
        view.move_cursor( -3, 50 );
        assert_eq!( view.current_line(), 0 );
        view.move_cursor( 500, 50 );
        assert_eq!( view.current_line(), 49 );
        assert_eq!( view.last_line( 50 ), 49 );
    }


    #[test]
    fn test_move_cursor_scrolls_one_step() {
        let mut view = viewport();
        view.move_cursor( 9, 50 );
        assert_eq!( view.first_line(), 0 );
        view.move_cursor( 1, 50 );
        assert_eq!( view.current_line(), 10 );
        assert_eq!( view.first_line(), 1 );
        assert_eq!( view.last_line( 50 ), 10 );
    }


    #[test]
    fn test_empty_content() {
        let mut view = viewport();
        view.move_cursor( 4, 0 );
        view.select( Position::Last, 1, 0 );
        assert_eq!( view.current_line(), 0 );
        assert_eq!( view.first_line(), 0 );
    }


    #[test]
    fn test_scroll_view_drags_cursor() {
        let mut view = viewport();
        view.scroll_view( 5, 50 );
        assert_eq!( view.first_line(), 5 );
        assert_eq!( view.current_line(), 5 );
        view.set_line( 14, 50 );
        view.scroll_view( -5, 50 );
        assert_eq!( view.first_line(), 0 );
        assert_eq!( view.current_line(), 9 );
    }


    #[test]
    fn test_select_positions() {
        let mut view = viewport();
        view.scroll_to( 30, 100 );
        assert_eq!( view.first_line(), 25 );

        view.select( Position::First, 1, 100 );
        assert_eq!( view.current_line(), 25 );
        view.select( Position::First, 3, 100 );
        assert_eq!( view.current_line(), 27 );
        view.select( Position::First, 40, 100 );
        assert_eq!( view.current_line(), 34 );
        view.select( Position::Last, 1, 100 );
        assert_eq!( view.current_line(), 34 );
        view.select( Position::Last, 4, 100 );
        assert_eq!( view.current_line(), 31 );
        view.select( Position::Last, 40, 100 );
        assert_eq!( view.current_line(), 25 );
        view.select( Position::Middle, 1, 100 );
        assert_eq!( view.current_line(), 29 );
    }


    #[test]
    fn test_select_on_short_content() {
        let mut view = viewport();
        view.select( Position::Last, 1, 4 );
        assert_eq!( view.current_line(), 3 );
        view.select( Position::Middle, 1, 4 );
        assert_eq!( view.current_line(), 1 );
    }


    #[test]
    fn test_visual_range_tracks_cursor() {
        let mut view = viewport();
        view.set_line( 3, 50 );
        view.visual();
        assert!( view.is_visual() );
        view.move_cursor( 4, 50 );
        assert_eq!( view.selection(), ( 3, 7 ) );
        view.move_cursor( -6, 50 );
        assert_eq!( view.selection(), ( 1, 3 ) );
    }


    #[test]
    fn test_leaving_visual_collapses() {
        let mut view = viewport();
        view.visual();
        view.move_cursor( 5, 50 );
        view.visual();
        assert!( !view.is_visual() );
        assert_eq!( view.selection(), ( 5, 5 ) );
    }


    #[test]
    fn test_switch_visual_end_preserves_selection() {
        let mut view = viewport();
        view.set_line( 2, 50 );
        view.visual();
        view.move_cursor( 6, 50 );
        view.switch_visual_end( 50 );
        assert_eq!( view.current_line(), 2 );
        assert_eq!( view.selection(), ( 2, 8 ) );

        // The old anchor is now the moving end
        view.move_cursor( -1, 50 );
        assert_eq!( view.selection(), ( 1, 8 ) );
    }


    #[test]
    fn test_take_range_overrides_count() {
        let mut view = viewport();
        view.set_line( 4, 50 );
        view.visual();
        view.move_cursor( 3, 50 );
        assert_eq!( view.take_range( 7, 20 ), ( 4, 4 ) );
        assert!( !view.is_visual() );
        assert_eq!( view.selection(), ( 7, 7 ) );
        assert_eq!( view.take_range( 7, 20 ), ( 7, 20 ) );
    }


    #[test]
    fn test_fit_after_shrink() {
        let mut view = viewport();
        view.set_line( 45, 50 );
        view.fit( 20 );
        assert_eq!( view.current_line(), 19 );
        assert_eq!( view.last_line( 20 ), 19 );
        assert_eq!( view.first_line(), 10 );
    }
}
