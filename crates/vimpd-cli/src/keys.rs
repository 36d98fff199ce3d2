//! Translation of terminal key events into dispatch keys.

use crossterm::event::{ KeyCode, KeyEvent, KeyModifiers };

use vimpd_core::Key;


/// Converts a crossterm key event, or returns None for keys with no
/// dispatch equivalent.
pub fn translate( event: KeyEvent ) -> Option<Key> {
    let modifiers = event.modifiers;

    let key = match event.code {
        KeyCode::Char( c ) if modifiers.contains( KeyModifiers::CONTROL ) => {
            if !c.is_ascii_alphabetic() && !"[\\]^_".contains( c ) {
                return None;
            }
            Key::ctrl( c.to_ascii_lowercase() )
        }
        KeyCode::Char( c ) => Key::char( c ),
        KeyCode::Enter => Key::ENTER,
        KeyCode::Esc => Key::ESCAPE,
        KeyCode::Tab => Key::TAB,
        KeyCode::BackTab => Key::BACK_TAB,
        KeyCode::Backspace => Key::BACKSPACE,
        KeyCode::Delete => Key::DELETE,
        KeyCode::Up => Key::UP,
        KeyCode::Down => Key::DOWN,
        KeyCode::Left => Key::LEFT,
        KeyCode::Right => Key::RIGHT,
        KeyCode::PageUp => Key::PAGE_UP,
        KeyCode::PageDown => Key::PAGE_DOWN,
        KeyCode::Home => Key::HOME,
        KeyCode::End => Key::END,
        _ => return None,
    };

    if modifiers.contains( KeyModifiers::ALT ) {
        Some( key.alt() )
    } else {
        Some( key )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn event( code: KeyCode, modifiers: KeyModifiers ) -> KeyEvent {
        KeyEvent::new( code, modifiers )
    }


    #[test]
    fn test_plain_and_shifted_characters() {
        assert_eq!( translate( event( KeyCode::Char( 'j' ), KeyModifiers::NONE ) ), Some( Key::char( 'j' ) ) );
        assert_eq!( translate( event( KeyCode::Char( 'G' ), KeyModifiers::SHIFT ) ), Some( Key::char( 'G' ) ) );
        assert_eq!( translate( event( KeyCode::Char( ' ' ), KeyModifiers::NONE ) ), Some( Key::SPACE ) );
    }


    #[test]
    fn test_control_keys() {
        assert_eq!( translate( event( KeyCode::Char( 'd' ), KeyModifiers::CONTROL ) ), Some( Key::ctrl( 'd' ) ) );
        assert_eq!( translate( event( KeyCode::Char( 'F' ), KeyModifiers::CONTROL ) ), Some( Key::ctrl( 'f' ) ) );
        assert_eq!( translate( event( KeyCode::Char( '1' ), KeyModifiers::CONTROL ) ), None );
    }


    #[test]
    fn test_alt_sets_the_alt_bit() {
        let key = translate( event( KeyCode::Char( '3' ), KeyModifiers::ALT ) ).unwrap();
        assert!( key.is_alt() );
        assert_eq!( key.without_alt(), Key::char( '3' ) );
    }


    #[test]
    fn test_named_keys() {
        assert_eq!( translate( event( KeyCode::Enter, KeyModifiers::NONE ) ), Some( Key::ENTER ) );
        assert_eq!( translate( event( KeyCode::BackTab, KeyModifiers::SHIFT ) ), Some( Key::BACK_TAB ) );
        assert_eq!( translate( event( KeyCode::F( 5 ), KeyModifiers::NONE ) ), None );
    }
}
