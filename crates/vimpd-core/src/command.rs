//! Ex command line parsing.
//!
//! A command line has the shape `[range]command[!] [arguments]` and lines
//! may be chained with `;`. This module only splits and normalises the
//! text; resolution and execution live in [`crate::mode::command`].

use std::time::Duration;

use thiserror::Error;

use crate::key::KeyError;
use crate::mode::search::SearchError;
use crate::player::PlayerError;
use crate::window::WindowError;


/// Errors that can occur during command parsing or execution.
#[derive( Debug, Error )]
pub enum CommandError {
    #[error( "Not an editor command: {0}" )]
    NotFound( String ),

    #[error( "Ambiguous command: {0}" )]
    Ambiguous( String ),

    #[error( "No range allowed" )]
    RangeNotAllowed,

    #[error( "Invalid parameter: {0}" )]
    InvalidParameter( String ),

    #[error( "Argument required: {0}" )]
    NoParameter( String ),

    #[error( "Recursive alias: {0}" )]
    RecursiveAlias( String ),

    #[error( "Alias already exists: {0} (add ! to replace)" )]
    AliasExists( String ),

    #[error( transparent )]
    Player( #[from] PlayerError ),

    #[error( transparent )]
    Window( #[from] WindowError ),

    #[error( transparent )]
    Key( #[from] KeyError ),

    #[error( transparent )]
    Search( #[from] SearchError ),
}


/// A line range resolved to a 1-based start line and a line count.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct Range {
    pub start: usize,
    pub count: usize,
}


impl Range {
    /// 1-based last line of the range. Saturates for ranges past `usize::MAX`.
    pub fn last( &self ) -> usize {
        self.start.saturating_add( self.count.saturating_sub( 1 ) )
    }
}


/// One command split into its parts.
#[derive( Debug, Clone, PartialEq, Eq, Default )]
pub struct CommandLine {
    /// Raw range text, empty when the line has none
    pub range: String,
    pub command: String,
    pub arguments: String,
    pub forced: bool,
}


impl CommandLine {
    /// Splits a single command (no `;` chaining) into range, command and
    /// arguments.
    ///
    /// @param line - The text typed after the `:` prompt
    pub fn parse( line: &str ) -> Self {
        let line = line.trim_start().trim_start_matches( ':' ).trim_start();

        let range_len = line
            .find( |c: char| !is_range_char( c ) )
            .unwrap_or( line.len() );
        let ( range, rest ) = line.split_at( range_len );

        let rest = rest.trim_start();
        let ( token, arguments ) = match rest.split_once( char::is_whitespace ) {
            Some(( token, arguments )) => ( token, arguments.trim() ),
            None => ( rest, "" ),
        };

        let ( command, forced ) = match token.strip_suffix( '!' ) {
            Some( command ) => ( command, true ),
            None => ( token, false ),
        };

        Self {
            range: range.to_string(),
            command: command.to_string(),
            arguments: arguments.to_string(),
            forced,
        }
    }


    pub fn has_range( &self ) -> bool {
        !self.range.is_empty()
    }


    /// Resolves the range text against the active window.
    ///
    /// @param current - 1-based current line, used for `.`
    /// @param last - 1-based last line, used for `$`
    pub fn range( &self, current: usize, last: usize ) -> Result<Option<Range>, CommandError> {
        if self.range.is_empty() {
            return Ok( None );
        }
        parse_range( &self.range, current, last ).map( Some )
    }
}


fn is_range_char( c: char ) -> bool {
    c.is_ascii_digit() || matches!( c, ',' | '.' | '$' | '%' )
}


/// Parses a range such as `5`, `5,10`, `10,5`, `.,$` or `%`.
///
/// The ends may be given in either order. Line 0 is treated as line 1.
pub fn parse_range( text: &str, current: usize, last: usize ) -> Result<Range, CommandError> {
    let text = text.trim();
    if text == "%" {
        return Ok( Range { start: 1, count: last.max( 1 ) } );
    }

    let mut atoms = text.split( ',' );
    let first = parse_atom( atoms.next().unwrap_or( "" ), current, last, text )?;
    let second = match atoms.next() {
        Some( atom ) => parse_atom( atom, current, last, text )?,
        None => first,
    };
    if atoms.next().is_some() {
        return Err( CommandError::InvalidParameter( text.to_string() ) );
    }

    let start = first.min( second ).max( 1 );
    let end = first.max( second ).max( 1 );
    Ok( Range { start, count: end - start + 1 } )
}


fn parse_atom( atom: &str, current: usize, last: usize, text: &str ) -> Result<usize, CommandError> {
    match atom {
        "" | "." => Ok( current ),
        "$" => Ok( last ),
        digits => digits
            .parse::<usize>()
            .map_err( |_| CommandError::InvalidParameter( text.to_string() ) ),
    }
}


/// Splits a line on its first `;` that is not escaped with `\`.
///
/// @returns The first command and the unparsed remainder, if any
pub fn split_chain( line: &str ) -> ( &str, Option<&str> ) {
    let bytes = line.as_bytes();
    for ( i, &b ) in bytes.iter().enumerate() {
        if b == b';' && ( i == 0 || bytes[ i - 1 ] != b'\\' ) {
            return ( &line[ ..i ], Some( &line[ i + 1.. ] ) );
        }
    }
    ( line, None )
}


/// Turns `\;` back into `;`.
pub fn unescape( arguments: &str ) -> String {
    arguments.replace( "\\;", ";" )
}


/// Parses a time string like "1:30" or "90" into a Duration.
///
/// @param s - Time string in format "MM:SS", "M:SS", or just seconds
///
/// @returns Duration or error
pub fn parse_time( s: &str ) -> Result<Duration, CommandError> {
    let s = s.trim();

    if let Some(( min, sec )) = s.split_once( ':' ) {
        let minutes: u64 = min.parse()
            .map_err( |_| CommandError::InvalidParameter( format!( "Invalid minutes: {}", min ) ) )?;
        let seconds: u64 = sec.parse()
            .map_err( |_| CommandError::InvalidParameter( format!( "Invalid seconds: {}", sec ) ) )?;
        minutes
            .checked_mul( 60 )
            .and_then( |secs| secs.checked_add( seconds ) )
            .map( Duration::from_secs )
            .ok_or_else( || CommandError::InvalidParameter( format!( "Time out of range: {}", s ) ) )
    } else {
        let seconds: u64 = s.parse()
            .map_err( |_| CommandError::InvalidParameter( format!( "Invalid time: {}", s ) ) )?;
        Ok( Duration::from_secs( seconds ) )
    }
}


/// Parses an on/off argument. An empty argument flips `current`.
pub fn parse_toggle( s: &str, current: bool ) -> Result<bool, CommandError> {
    match s.trim().to_lowercase().as_str() {
        "" => Ok( !current ),
        "on" | "1" | "true" | "yes" => Ok( true ),
        "off" | "0" | "false" | "no" => Ok( false ),
        other => Err( CommandError::InvalidParameter(
            format!( "'{}'. Use 'on' or 'off'", other )
        )),
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_plain_command() {
        let line = CommandLine::parse( "add  music/song.flac " );
        assert_eq!( line.command, "add" );
        assert_eq!( line.arguments, "music/song.flac" );
        assert!( !line.has_range() );
        assert!( !line.forced );
    }


    #[test]
    fn test_parse_range_and_forced() {
        let line = CommandLine::parse( "5,10delete!" );
        assert_eq!( line.range, "5,10" );
        assert_eq!( line.command, "delete" );
        assert!( line.forced );
        assert_eq!( line.arguments, "" );
    }


    #[test]
    fn test_parse_range_only() {
        let line = CommandLine::parse( ":12" );
        assert_eq!( line.range, "12" );
        assert!( line.command.is_empty() );
    }


    #[test]
    fn test_parse_alias_body_keeps_spaces() {
        let line = CommandLine::parse( "alias! np echo now playing" );
        assert_eq!( line.command, "alias" );
        assert!( line.forced );
        assert_eq!( line.arguments, "np echo now playing" );
    }


    #[test]
    fn test_range_order_independent() {
        assert_eq!( parse_range( "5", 1, 100 ).unwrap(), Range { start: 5, count: 1 } );
        assert_eq!( parse_range( "5,10", 1, 100 ).unwrap(), Range { start: 5, count: 6 } );
        assert_eq!( parse_range( "10,5", 1, 100 ).unwrap(), Range { start: 5, count: 6 } );
    }


    #[test]
    fn test_range_symbols() {
        assert_eq!( parse_range( ".", 7, 40 ).unwrap(), Range { start: 7, count: 1 } );
        assert_eq!( parse_range( ".,$", 7, 40 ).unwrap(), Range { start: 7, count: 34 } );
        assert_eq!( parse_range( "%", 7, 40 ).unwrap(), Range { start: 1, count: 40 } );
        assert_eq!( parse_range( "0", 7, 40 ).unwrap(), Range { start: 1, count: 1 } );
    }


    #[test]
    fn test_range_invalid() {
        assert!( matches!( parse_range( "1,2,3", 1, 10 ), Err( CommandError::InvalidParameter( _ ) ) ) );
        assert!( matches!( parse_range( "1$", 1, 10 ), Err( CommandError::InvalidParameter( _ ) ) ) );
    }


    #[test]
    fn test_split_chain_respects_escapes() {
        assert_eq!( split_chain( "next; play" ), ( "next", Some( " play" ) ) );
        assert_eq!( split_chain( "echo a\\;b; stop" ), ( "echo a\\;b", Some( " stop" ) ) );
        assert_eq!( split_chain( "echo a\\;b" ), ( "echo a\\;b", None ) );
        assert_eq!( unescape( "a\\;b" ), "a;b" );
    }


    #[test]
    fn test_parse_time() {
        assert_eq!( parse_time( "1:30" ).unwrap(), Duration::from_secs( 90 ) );
        assert_eq!( parse_time( "45" ).unwrap(), Duration::from_secs( 45 ) );
        assert!( matches!( parse_time( "x:10" ), Err( CommandError::InvalidParameter( _ ) ) ) );
        assert!( matches!( parse_time( "307445734561825861:0" ), Err( CommandError::InvalidParameter( _ ) ) ) );
        assert!( matches!( parse_time( "1:18446744073709551615" ), Err( CommandError::InvalidParameter( _ ) ) ) );
    }


    #[test]
    fn test_range_last_line_saturates() {
        assert_eq!( parse_range( "5,10", 1, 100 ).unwrap().last(), 10 );
        let huge = parse_range( "1,18446744073709551615", 1, 100 ).unwrap();
        assert_eq!( huge.count, usize::MAX );
        assert_eq!( huge.last(), usize::MAX );
        assert_eq!( parse_range( "18446744073709551615", 1, 100 ).unwrap().last(), usize::MAX );
    }


    #[test]
    fn test_parse_toggle() {
        assert!( parse_toggle( "on", false ).unwrap() );
        assert!( !parse_toggle( "OFF", true ).unwrap() );
        assert!( parse_toggle( "", false ).unwrap() );
        assert!( parse_toggle( "maybe", false ).is_err() );
    }
}
