//! Scrollable viewport over a buffer of lines.
//!
//! The viewport never owns the content it shows. It keeps a single scroll
//! anchor (one past the last visible line) and is told the content size on
//! every call, so the backing buffer can grow or shrink freely underneath it.


/// Where to place a line when aligning the viewport on it.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum Alignment {
    Top,
    Centre,
    Bottom,
}


/// Scroll state of a window.
///
/// Invariant: `anchor` lies in `[rows, size]` while the content is longer
/// than the viewport, and equals `rows` otherwise.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct Viewport {
    anchor: usize,
    rows: usize,
    cols: usize,
}


impl Viewport {
    /// Creates a viewport showing the top of the content.
    pub fn new( rows: usize, cols: usize ) -> Self {
        Self { anchor: rows, rows, cols }
    }


    pub fn rows( &self ) -> usize {
        self.rows
    }


    pub fn cols( &self ) -> usize {
        self.cols
    }


    /// The raw scroll anchor.
    pub fn anchor( &self ) -> usize {
        self.anchor
    }


    /// Index of the first visible line.
    pub fn first_line( &self ) -> usize {
        self.anchor.saturating_sub( self.rows )
    }


    /// Index of the last visible line for content of `size` lines.
    pub fn last_line( &self, size: usize ) -> usize {
        if size == 0 {
            0
        } else if size <= self.rows {
            size - 1
        } else {
            self.anchor.saturating_sub( 1 )
        }
    }


    /// Returns true if `line` is currently on screen.
    pub fn is_visible( &self, line: usize, size: usize ) -> bool {
        size > 0 && line >= self.first_line() && line <= self.last_line( size )
    }


    /// Scrolls by `delta` lines.
    pub fn scroll( &mut self, delta: isize, size: usize ) {
        let target = if delta < 0 {
            self.anchor.saturating_sub( delta.unsigned_abs() )
        } else {
            self.anchor.saturating_add( delta as usize )
        };
        self.set_anchor( target, size );
    }


    /// Scrolls so that `line` is centred where the content allows it.
    pub fn scroll_to( &mut self, line: usize, size: usize ) {
        self.set_anchor( line.saturating_add( self.rows / 2 ), size );
    }


    /// Scrolls so that `line` sits at the requested edge or centre.
    pub fn align( &mut self, line: usize, alignment: Alignment, size: usize ) {
        match alignment {
            Alignment::Top => self.set_anchor( line.saturating_add( self.rows ), size ),
            Alignment::Centre => self.scroll_to( line, size ),
            Alignment::Bottom => self.set_anchor( line.saturating_add( 1 ), size ),
        }
    }


    /// Changes the viewport dimensions, keeping the first line in place.
    pub fn resize( &mut self, rows: usize, cols: usize, size: usize ) {
        let first = self.first_line();
        self.rows = rows;
        self.cols = cols;
        self.set_anchor( first.saturating_add( rows ), size );
    }


    /// Re-establishes the anchor invariant after the content changed size.
    pub fn fit( &mut self, size: usize ) {
        self.set_anchor( self.anchor, size );
    }


    fn set_anchor( &mut self, anchor: usize, size: usize ) {
        self.anchor = if size > self.rows {
            anchor.clamp( self.rows, size )
        } else {
            self.rows
        };
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_new_viewport_starts_at_top() {
        let view = Viewport::new( 10, 80 );
        assert_eq!( view.first_line(), 0 );
        assert_eq!( view.last_line( 100 ), 9 );
        assert_eq!( view.last_line( 4 ), 3 );
        assert_eq!( view.last_line( 0 ), 0 );
    }


    #[test]
    fn test_scroll_clamps_to_content() {
        let mut view = Viewport::new( 10, 80 );
        view.scroll( 5, 100 );
        assert_eq!( view.first_line(), 5 );

        view.scroll( 500, 100 );
        assert_eq!( view.first_line(), 90 );
        assert_eq!( view.last_line( 100 ), 99 );

        view.scroll( -500, 100 );
        assert_eq!( view.first_line(), 0 );
    }


    #[test]
    fn test_short_content_never_scrolls() {
        let mut view = Viewport::new( 10, 80 );
        view.scroll( 3, 10 );
        assert_eq!( view.first_line(), 0 );
        view.scroll_to( 8, 7 );
        assert_eq!( view.first_line(), 0 );
        assert_eq!( view.anchor(), 10 );
    }


    #[test]
    fn test_scroll_to_centres_line() {
        let mut view = Viewport::new( 10, 80 );
        view.scroll_to( 50, 100 );
        assert_eq!( view.first_line(), 45 );
        assert!( view.is_visible( 50, 100 ) );
    }


    #[test]
    fn test_scroll_to_clamps_at_edges() {
        let mut view = Viewport::new( 10, 80 );
        view.scroll_to( 2, 100 );
        assert_eq!( view.first_line(), 0 );
        view.scroll_to( 98, 100 );
        assert_eq!( view.first_line(), 90 );
    }


    #[test]
    fn test_first_line_bounds_hold_for_any_operation() {
        let mut view = Viewport::new( 7, 80 );
        for size in [ 0usize, 3, 7, 8, 20, 301 ] {
            for step in [ -50isize, -3, -1, 0, 1, 4, 90 ] {
                view.scroll( step, size );
                if size > 7 {
                    assert!( view.first_line() <= size - 7 );
                } else {
                    assert_eq!( view.first_line(), 0 );
                }
                view.scroll_to( step.unsigned_abs() * 3, size );
                if size > 7 {
                    assert!( view.first_line() <= size - 7 );
                } else {
                    assert_eq!( view.first_line(), 0 );
                }
            }
        }
    }


    #[test]
    fn test_align() {
        let mut view = Viewport::new( 10, 80 );
        view.align( 30, Alignment::Top, 100 );
        assert_eq!( view.first_line(), 30 );
        view.align( 30, Alignment::Bottom, 100 );
        assert_eq!( view.last_line( 100 ), 30 );
        view.align( 30, Alignment::Centre, 100 );
        assert_eq!( view.first_line(), 25 );
        view.align( 95, Alignment::Top, 100 );
        assert_eq!( view.first_line(), 90 );
    }


    #[test]
    fn test_fit_after_content_shrinks() {
        let mut view = Viewport::new( 10, 80 );
        view.scroll( 80, 100 );
        assert_eq!( view.first_line(), 80 );
        view.fit( 40 );
        assert_eq!( view.first_line(), 30 );
        view.fit( 5 );
        assert_eq!( view.first_line(), 0 );
    }


    #[test]
    fn test_resize_keeps_first_line() {
        let mut view = Viewport::new( 10, 80 );
        view.scroll( 20, 100 );
        view.resize( 20, 120, 100 );
        assert_eq!( view.first_line(), 20 );
        assert_eq!( view.rows(), 20 );
        assert_eq!( view.cols(), 120 );
    }
}
