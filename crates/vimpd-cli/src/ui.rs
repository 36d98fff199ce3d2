//! Terminal rendering.
//!
//! The layout is a window tab bar, the active window, a now-playing line
//! and the command row. Scrolling is owned by the core viewports; this
//! module only draws the lines they expose.

use std::time::Duration;

use ratatui::{
    prelude::*,
    widgets::{ Paragraph, Tabs },
};

use vimpd_core::{ Context, ModeController, PlaybackState, PlaylistWindow, Status, Window };


/// Rows taken by everything except the active window.
const CHROME_ROWS: u16 = 3;


/// Rows available to the active window in a terminal of `height` rows.
pub fn window_rows( height: u16 ) -> usize {
    height.saturating_sub( CHROME_ROWS ) as usize
}


/// Draws the whole screen.
pub fn draw( frame: &mut Frame, ctx: &Context, controller: &ModeController ) {
    let chunks = Layout::default()
        .direction( Direction::Vertical )
        .constraints([
            Constraint::Length( 1 ),  // Tab bar
            Constraint::Min( 0 ),     // Active window
            Constraint::Length( 1 ),  // Now playing
            Constraint::Length( 1 ),  // Command row
        ])
        .split( frame.area() );

    draw_tabs( frame, ctx, chunks[0] );
    if !ctx.screen.is_empty() {
        draw_window( frame, ctx.screen.active(), ctx.playback.as_ref(), chunks[1] );
    }
    draw_now_playing( frame, ctx, chunks[2] );
    draw_command_row( frame, ctx, controller, chunks[3] );
}


fn draw_tabs( frame: &mut Frame, ctx: &Context, area: Rect ) {
    let titles: Vec<String> = ctx.screen
        .windows()
        .enumerate()
        .map( |( i, window )| format!( "{}:{}", i + 1, window.name() ) )
        .collect();

    let tabs = Tabs::new( titles )
        .select( ctx.screen.active_index() )
        .style( Style::default().fg( Color::DarkGray ) )
        .highlight_style( Style::default().fg( Color::Cyan ).bold() );
    frame.render_widget( tabs, area );
}


fn draw_window( frame: &mut Frame, window: &dyn Window, playback: Option<&Status>, area: Rect ) {
    let view = window.view();
    let size = window.len();
    let selection = view.is_visual().then( || view.selection() );

    // Highlight the playing song in the queue
    let playing = if window.name() == PlaylistWindow::NAME {
        playback.and_then( |status| status.song )
    } else {
        None
    };

    let lines: Vec<Line> = if size == 0 {
        Vec::new()
    } else {
        ( view.first_line()..=view.last_line( size ) )
            .take( area.height as usize )
            .map( |index| {
                let text = window.line( index ).unwrap_or_default();
                let mut style = Style::default();
                if Some( index ) == playing {
                    style = style.fg( Color::Cyan ).bold();
                }
                if selection.is_some_and( |( start, end )| ( start..=end ).contains( &index ) ) {
                    style = style.bg( Color::Blue );
                }
                if index == view.current_line() {
                    style = style.bg( Color::DarkGray );
                }
                Line::styled( format!( " {}", text ), style )
            })
            .collect()
    };

    frame.render_widget( Paragraph::new( lines ), area );
}


fn draw_now_playing( frame: &mut Frame, ctx: &Context, area: Rect ) {
    let Some( status ) = ctx.playback.as_ref() else {
        let text = if ctx.player.is_connected() { "Waiting for status" } else { "Not connected" };
        frame.render_widget( Paragraph::new( text ).style( Style::default().fg( Color::DarkGray ) ), area );
        return;
    };

    let state = match status.state {
        PlaybackState::Playing => ">",
        PlaybackState::Paused => "||",
        PlaybackState::Stopped => "[]",
    };

    let song = status.song
        .and_then( |position| {
            ctx.screen
                .windows()
                .find( |window| window.name() == PlaylistWindow::NAME )
                .and_then( |window| window.line( position ) )
        })
        .unwrap_or_default();

    let time = match ( status.elapsed, status.duration ) {
        ( Some( elapsed ), Some( duration ) ) => format!( "{} / {}", format_time( elapsed ), format_time( duration ) ),
        ( Some( elapsed ), None ) => format_time( elapsed ),
        _ => String::new(),
    };

    let volume = status.volume.map( |v| format!( "vol {}%", v ) ).unwrap_or_default();
    let flags: String = [ ( status.random, 'z' ), ( status.repeat, 'r' ), ( status.single, 's' ) ]
        .iter()
        .map( |( on, flag )| if *on { *flag } else { '-' } )
        .collect();

    let text = format!( " {} {}  {}  {}  [{}]", state, song, time, volume, flags );
    frame.render_widget( Paragraph::new( text ).style( Style::default().fg( Color::Green ) ), area );
}


fn draw_command_row( frame: &mut Frame, ctx: &Context, controller: &ModeController, area: Rect ) {
    if let Some( prompt ) = controller.prompt( ctx ) {
        frame.render_widget( Paragraph::new( prompt.text ), area );
        let cursor_x = area.x + prompt.cursor as u16;
        frame.set_cursor_position(( cursor_x, area.y ));
        return;
    }

    if let Some( message ) = ctx.status.message() {
        let style = if message.is_error {
            Style::default().fg( Color::Red )
        } else {
            Style::default()
        };
        frame.render_widget( Paragraph::new( message.text.as_str() ).style( style ), area );
    }
}


/// Formats a duration as `m:ss`, or `h:mm:ss` past an hour.
fn format_time( duration: Duration ) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!( "{}:{:02}:{:02}", secs / 3600, ( secs / 60 ) % 60, secs % 60 )
    } else {
        format!( "{}:{:02}", secs / 60, secs % 60 )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_format_time() {
        assert_eq!( format_time( Duration::from_secs( 0 ) ), "0:00" );
        assert_eq!( format_time( Duration::from_secs( 95 ) ), "1:35" );
        assert_eq!( format_time( Duration::from_secs( 3725 ) ), "1:02:05" );
    }


    #[test]
    fn test_window_rows_leave_room_for_chrome() {
        assert_eq!( window_rows( 24 ), 21 );
        assert_eq!( window_rows( 2 ), 0 );
    }
}
