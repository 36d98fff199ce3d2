//! Abstract key codes and key notation.
//!
//! Keys are plain integer codes so that dispatch tables can be keyed on
//! them directly. Printable characters use their Unicode scalar value,
//! control keys use the ASCII control range, named keys live above the
//! Unicode range and alt/escape-prefixed keys carry a high bit.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;


/// Errors produced while parsing key notation.
#[derive( Debug, Error, PartialEq, Eq )]
pub enum KeyError {
    #[error( "Empty key sequence" )]
    Empty,

    #[error( "Unknown key name: <{0}>" )]
    UnknownName( String ),
}


/// A single abstract key code.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord )]
pub struct Key( u32 );


/// First code used for named keys, just above the Unicode range.
const NAMED_BASE: u32 = 0x11_0000;


impl Key {
    /// High bit marking an alt/escape-prefixed key.
    pub const ALT_BIT: u32 = 1 << 31;

    pub const TAB: Key = Key( 9 );
    pub const ENTER: Key = Key( 13 );
    pub const ESCAPE: Key = Key( 27 );
    pub const SPACE: Key = Key( 32 );
    pub const BACKSPACE: Key = Key( 127 );

    pub const UP: Key = Key( NAMED_BASE );
    pub const DOWN: Key = Key( NAMED_BASE + 1 );
    pub const LEFT: Key = Key( NAMED_BASE + 2 );
    pub const RIGHT: Key = Key( NAMED_BASE + 3 );
    pub const PAGE_UP: Key = Key( NAMED_BASE + 4 );
    pub const PAGE_DOWN: Key = Key( NAMED_BASE + 5 );
    pub const HOME: Key = Key( NAMED_BASE + 6 );
    pub const END: Key = Key( NAMED_BASE + 7 );
    pub const DELETE: Key = Key( NAMED_BASE + 8 );
    pub const BACK_TAB: Key = Key( NAMED_BASE + 9 );


    /// Key for a printable character.
    pub const fn char( c: char ) -> Self {
        Key( c as u32 )
    }


    /// Control chord for an ASCII letter (`ctrl( 'a' )` is code 1).
    pub const fn ctrl( c: char ) -> Self {
        Key( ( c as u32 ) & 0x1f )
    }


    /// Key from a raw code.
    pub const fn from_code( code: u32 ) -> Self {
        Key( code )
    }


    /// The raw integer code.
    pub const fn code( self ) -> u32 {
        self.0
    }


    /// The same key with the alt/escape bit set.
    pub const fn alt( self ) -> Self {
        Key( self.0 | Self::ALT_BIT )
    }


    pub const fn is_alt( self ) -> bool {
        self.0 & Self::ALT_BIT != 0
    }


    pub const fn without_alt( self ) -> Self {
        Key( self.0 & !Self::ALT_BIT )
    }


    /// The printable character this key types, if any.
    pub fn as_char( self ) -> Option<char> {
        if self.is_alt() || self.0 < 32 || self.0 == 127 || self.0 >= NAMED_BASE {
            return None;
        }
        char::from_u32( self.0 )
    }


    /// Numeric value of a `0`-`9` key.
    pub fn digit( self ) -> Option<u32> {
        self.as_char().and_then( |c| c.to_digit( 10 ) )
    }


    fn name( self ) -> Option<&'static str> {
        let name = match self {
            Key::TAB => "Tab",
            Key::ENTER => "CR",
            Key::ESCAPE => "Esc",
            Key::SPACE => "Space",
            Key::BACKSPACE => "BS",
            Key::UP => "Up",
            Key::DOWN => "Down",
            Key::LEFT => "Left",
            Key::RIGHT => "Right",
            Key::PAGE_UP => "PageUp",
            Key::PAGE_DOWN => "PageDown",
            Key::HOME => "Home",
            Key::END => "End",
            Key::DELETE => "Del",
            Key::BACK_TAB => "S-Tab",
            Key( c ) if c == '<' as u32 => "lt",
            _ => return None,
        };
        Some( name )
    }


    fn from_name( name: &str ) -> Result<Self, KeyError> {
        let lower = name.to_lowercase();

        if let Some( rest ) = lower.strip_prefix( "c-" ) {
            let mut chars = rest.chars();
            return match ( chars.next(), chars.next() ) {
                ( Some( c ), None ) if c.is_ascii_alphabetic() || "[\\]^_".contains( c ) => Ok( Key::ctrl( c ) ),
                _ => Err( KeyError::UnknownName( name.to_string() ) ),
            };
        }

        if let Some( rest ) = lower.strip_prefix( "a-" ).or_else( || lower.strip_prefix( "m-" ) ) {
            // Keep the case of the character being modified
            let original = &name[ 2.. ];
            return if original.chars().count() == 1 {
                Ok( Key::char( original.chars().next().unwrap_or_default() ).alt() )
            } else {
                Key::from_name( rest ).map( Key::alt )
            };
        }

        let key = match lower.as_str() {
            "cr" | "enter" | "return" => Key::ENTER,
            "esc" | "escape" => Key::ESCAPE,
            "tab" => Key::TAB,
            "s-tab" => Key::BACK_TAB,
            "bs" | "backspace" => Key::BACKSPACE,
            "del" | "delete" => Key::DELETE,
            "space" => Key::SPACE,
            "lt" => Key::char( '<' ),
            "up" => Key::UP,
            "down" => Key::DOWN,
            "left" => Key::LEFT,
            "right" => Key::RIGHT,
            "pageup" => Key::PAGE_UP,
            "pagedown" => Key::PAGE_DOWN,
            "home" => Key::HOME,
            "end" => Key::END,
            _ => return Err( KeyError::UnknownName( name.to_string() ) ),
        };
        Ok( key )
    }
}


impl From<char> for Key {
    fn from( c: char ) -> Self {
        Key::char( c )
    }
}


impl fmt::Display for Key {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        if self.is_alt() {
            let inner = self.without_alt();
            return match inner.name() {
                Some( name ) => write!( f, "<A-{}>", name ),
                None => match inner.as_char() {
                    Some( c ) => write!( f, "<A-{}>", c ),
                    None => write!( f, "<A-#{}>", inner.0 ),
                },
            };
        }

        if let Some( name ) = self.name() {
            return write!( f, "<{}>", name );
        }

        if ( 1..=26 ).contains( &self.0 ) {
            return write!( f, "<C-{}>", ( b'a' + self.0 as u8 - 1 ) as char );
        }

        match self.as_char() {
            Some( c ) => write!( f, "{}", c ),
            None => write!( f, "<#{}>", self.0 ),
        }
    }
}


/// Parses vim-style key notation such as `gg`, `<C-a>` or `:play<CR>`.
///
/// @param notation - The key notation to parse
///
/// @returns The key sequence or an error for malformed names
pub fn parse_keys( notation: &str ) -> Result<Vec<Key>, KeyError> {
    let mut keys = Vec::new();
    let mut rest = notation;

    while let Some( c ) = rest.chars().next() {
        if c == '<' {
            // A `<` that does not open a key name is a literal character
            if let Some( end ) = rest.find( '>' ) {
                let name = &rest[ 1..end ];
                if !name.is_empty() && !name.contains( '<' ) {
                    keys.push( Key::from_name( name )? );
                    rest = &rest[ end + 1.. ];
                    continue;
                }
            }
        }
        keys.push( Key::char( c ) );
        rest = &rest[ c.len_utf8().. ];
    }

    if keys.is_empty() {
        return Err( KeyError::Empty );
    }
    Ok( keys )
}


/// Renders a key sequence back into notation.
pub fn format_keys( keys: &[Key] ) -> String {
    keys.iter().map( |k| k.to_string() ).collect()
}


/// User defined key bindings for normal mode.
///
/// Each binding maps a single key onto the sequence of keys it stands for.
#[derive( Debug, Default, Clone )]
pub struct KeyMap {
    bindings: HashMap<Key, Vec<Key>>,
}


impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }


    /// Binds `key` to `keys`, replacing any earlier binding.
    pub fn map( &mut self, key: Key, keys: Vec<Key> ) {
        self.bindings.insert( key, keys );
    }


    /// Removes a binding, returning whether one existed.
    pub fn unmap( &mut self, key: Key ) -> bool {
        self.bindings.remove( &key ).is_some()
    }


    pub fn get( &self, key: Key ) -> Option<&[Key]> {
        self.bindings.get( &key ).map( Vec::as_slice )
    }


    /// Bindings sorted by key for display.
    pub fn bindings( &self ) -> Vec<( Key, &[Key] )> {
        let mut bindings: Vec<_> = self.bindings
            .iter()
            .map( |( k, v )| ( *k, v.as_slice() ) )
            .collect();
        bindings.sort_by_key( |( k, _ )| *k );
        bindings
    }


    pub fn is_empty( &self ) -> bool {
        self.bindings.is_empty()
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_alt_bit_round_trip() {
        let key = Key::char( '3' ).alt();
        assert!( key.is_alt() );
        assert_eq!( key.without_alt(), Key::char( '3' ) );
        assert_eq!( key.digit(), None );
        assert_eq!( key.without_alt().digit(), Some( 3 ) );
    }


    #[test]
    fn test_control_keys_are_not_printable() {
        assert_eq!( Key::ctrl( 'e' ).code(), 5 );
        assert_eq!( Key::ctrl( 'e' ).as_char(), None );
        assert_eq!( Key::ENTER.as_char(), None );
        assert_eq!( Key::UP.as_char(), None );
    }


    #[test]
    fn test_parse_plain_and_named_keys() {
        let keys = parse_keys( ":play<CR>" ).unwrap();
        assert_eq!( keys.len(), 6 );
        assert_eq!( keys[ 0 ], Key::char( ':' ) );
        assert_eq!( keys[ 5 ], Key::ENTER );
    }


    #[test]
    fn test_parse_modifiers() {
        assert_eq!( parse_keys( "<C-a>" ).unwrap(), vec![ Key::ctrl( 'a' ) ] );
        assert_eq!( parse_keys( "<A-2>" ).unwrap(), vec![ Key::char( '2' ).alt() ] );
        assert_eq!( parse_keys( "<M-J>" ).unwrap(), vec![ Key::char( 'J' ).alt() ] );
        assert_eq!( parse_keys( "<S-Tab>" ).unwrap(), vec![ Key::BACK_TAB ] );
    }


    #[test]
    fn test_parse_literal_angle_bracket() {
        assert_eq!( parse_keys( "<" ).unwrap(), vec![ Key::char( '<' ) ] );
        assert_eq!( parse_keys( "<lt>" ).unwrap(), vec![ Key::char( '<' ) ] );
        assert_eq!( parse_keys( "<>" ).unwrap(), vec![ Key::char( '<' ), Key::char( '>' ) ] );
        assert_eq!( parse_keys( "a<b" ).unwrap(), vec![ Key::char( 'a' ), Key::char( '<' ), Key::char( 'b' ) ] );
        assert_eq!( parse_keys( "<C-a" ).unwrap().len(), 4 );
    }


    #[test]
    fn test_parse_errors() {
        assert_eq!( parse_keys( "" ), Err( KeyError::Empty ) );
        assert!( matches!( parse_keys( "<Bogus>" ), Err( KeyError::UnknownName( _ ) ) ) );
    }


    #[test]
    fn test_display_matches_notation() {
        let keys = parse_keys( "gg<C-d><A-1><Space><lt>" ).unwrap();
        assert_eq!( format_keys( &keys ), "gg<C-d><A-1><Space><lt>" );
    }


    #[test]
    fn test_keymap_overwrites() {
        let mut map = KeyMap::new();
        map.map( Key::char( 'X' ), vec![ Key::char( 'j' ) ] );
        map.map( Key::char( 'X' ), vec![ Key::char( 'k' ) ] );
        assert_eq!( map.get( Key::char( 'X' ) ), Some( &[ Key::char( 'k' ) ][ .. ] ) );
        assert!( map.unmap( Key::char( 'X' ) ) );
        assert!( !map.unmap( Key::char( 'X' ) ) );
        assert!( map.is_empty() );
    }
}
