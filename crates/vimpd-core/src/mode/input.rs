//! Line editing shared by the command and search modes.

use crate::key::Key;
use crate::mode::Prompt;


/// Editable line with a cursor, a prompt character and history.
#[derive( Debug, Default )]
pub struct LineInput {
    prompt: char,
    content: String,
    cursor: usize,
    history: Vec<String>,
    /// Position while browsing history, None when editing a fresh line
    history_index: Option<usize>,
    /// The fresh line, kept while browsing history
    draft: String,
}


impl LineInput {
    pub fn new( prompt: char ) -> Self {
        Self { prompt, ..Self::default() }
    }


    pub fn prompt( &self ) -> char {
        self.prompt
    }


    pub fn set_prompt( &mut self, prompt: char ) {
        self.prompt = prompt;
    }


    /// Starts a fresh line.
    pub fn reset( &mut self ) {
        self.clear();
        self.history_index = None;
        self.draft.clear();
    }


    /// Applies an editing key.
    ///
    /// @returns Whether the key was an editing key
    pub fn edit( &mut self, key: Key ) -> bool {
        match key {
            Key::BACKSPACE => self.backspace(),
            Key::DELETE => self.delete(),
            Key::LEFT => self.move_left(),
            Key::RIGHT => self.move_right(),
            Key::HOME => self.move_home(),
            Key::END => self.move_end(),
            Key::UP => self.history_previous(),
            Key::DOWN => self.history_next(),
            _ if key == Key::ctrl( 'a' ) => self.move_home(),
            _ if key == Key::ctrl( 'e' ) => self.move_end(),
            _ if key == Key::ctrl( 'u' ) => self.clear_to_start(),
            _ if key == Key::ctrl( 'w' ) => self.delete_word(),
            _ => match key.as_char() {
                Some( c ) => self.insert( c ),
                None => return false,
            },
        }
        true
    }


    /// Inserts a character at the cursor position.
    pub fn insert( &mut self, c: char ) {
        self.content.insert( self.cursor, c );
        self.cursor += c.len_utf8();
    }


    /// Deletes the character before the cursor.
    pub fn backspace( &mut self ) {
        if self.cursor > 0 {
            let prev_char_boundary = self.previous_boundary();
            self.content.remove( prev_char_boundary );
            self.cursor = prev_char_boundary;
        }
    }


    /// Deletes the character at the cursor position.
    pub fn delete( &mut self ) {
        if self.cursor < self.content.len() {
            self.content.remove( self.cursor );
        }
    }


    /// Deletes everything before the cursor.
    pub fn clear_to_start( &mut self ) {
        self.content.replace_range( ..self.cursor, "" );
        self.cursor = 0;
    }


    /// Deletes the word before the cursor along with trailing spaces.
    pub fn delete_word( &mut self ) {
        let before = &self.content[ ..self.cursor ];
        let trimmed = before.trim_end();
        let start = trimmed
            .char_indices()
            .rev()
            .find( |( _, c )| c.is_whitespace() )
            .map( |( i, c )| i + c.len_utf8() )
            .unwrap_or( 0 );
        self.content.replace_range( start..self.cursor, "" );
        self.cursor = start;
    }


    pub fn clear( &mut self ) {
        self.content.clear();
        self.cursor = 0;
    }


    pub fn content( &self ) -> &str {
        &self.content
    }


    /// Replaces the content and moves the cursor to the end.
    pub fn set_content( &mut self, content: &str ) {
        self.content = content.to_string();
        self.cursor = self.content.len();
    }


    /// Gets the cursor position as character count (for display).
    pub fn cursor_char_pos( &self ) -> usize {
        self.content[ ..self.cursor ].chars().count()
    }


    pub fn move_left( &mut self ) {
        if self.cursor > 0 {
            self.cursor = self.previous_boundary();
        }
    }


    pub fn move_right( &mut self ) {
        if self.cursor < self.content.len() {
            self.cursor = self.content[ self.cursor.. ]
                .char_indices()
                .nth( 1 )
                .map( |( i, _ )| self.cursor + i )
                .unwrap_or( self.content.len() );
        }
    }


    pub fn move_home( &mut self ) {
        self.cursor = 0;
    }


    pub fn move_end( &mut self ) {
        self.cursor = self.content.len();
    }


    pub fn is_empty( &self ) -> bool {
        self.content.is_empty()
    }


    /// Records a finished line. Empty lines and repeats of the last entry
    /// are skipped.
    pub fn push_history( &mut self, line: &str ) {
        if !line.is_empty() && self.history.last().map( String::as_str ) != Some( line ) {
            self.history.push( line.to_string() );
        }
        self.history_index = None;
    }


    pub fn history( &self ) -> &[String] {
        &self.history
    }


    pub fn history_previous( &mut self ) {
        let index = match self.history_index {
            Some( 0 ) => return,
            Some( i ) => i - 1,
            None if self.history.is_empty() => return,
            None => {
                self.draft = self.content.clone();
                self.history.len() - 1
            }
        };
        self.history_index = Some( index );
        let line = self.history[ index ].clone();
        self.set_content( &line );
    }


    pub fn history_next( &mut self ) {
        let Some( index ) = self.history_index else {
            return;
        };
        if index + 1 < self.history.len() {
            self.history_index = Some( index + 1 );
            let line = self.history[ index + 1 ].clone();
            self.set_content( &line );
        } else {
            self.history_index = None;
            let draft = std::mem::take( &mut self.draft );
            self.set_content( &draft );
        }
    }


    /// The prompt row for this line.
    pub fn to_prompt( &self ) -> Prompt {
        Prompt {
            text: format!( "{}{}", self.prompt, self.content ),
            cursor: 1 + self.cursor_char_pos(),
        }
    }


    fn previous_boundary( &self ) -> usize {
        self.content[ ..self.cursor ]
            .char_indices()
            .last()
            .map( |( i, _ )| i )
            .unwrap_or( 0 )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn typed( text: &str ) -> LineInput {
        let mut input = LineInput::new( ':' );
        for c in text.chars() {
            input.edit( Key::char( c ) );
        }
        input
    }


    #[test]
    fn test_insert_and_cursor_movement() {
        let mut input = typed( "plya" );
        input.edit( Key::LEFT );
        input.edit( Key::LEFT );
        input.edit( Key::DELETE );
        input.move_right();
        input.insert( 'y' );
        assert_eq!( input.content(), "play" );
        input.edit( Key::HOME );
        assert_eq!( input.cursor_char_pos(), 0 );
    }


    #[test]
    fn test_multibyte_backspace() {
        let mut input = typed( "café" );
        input.edit( Key::BACKSPACE );
        assert_eq!( input.content(), "caf" );
        assert_eq!( input.cursor_char_pos(), 3 );
    }


    #[test]
    fn test_ctrl_w_and_ctrl_u() {
        let mut input = typed( "add some song  " );
        input.edit( Key::ctrl( 'w' ) );
        assert_eq!( input.content(), "add some " );
        input.edit( Key::ctrl( 'u' ) );
        assert!( input.is_empty() );
    }


    #[test]
    fn test_history_browsing_restores_draft() {
        let mut input = LineInput::new( ':' );
        input.push_history( "next" );
        input.push_history( "next" );
        input.push_history( "stop" );
        assert_eq!( input.history().len(), 2 );

        input.set_content( "pla" );
        input.edit( Key::UP );
        assert_eq!( input.content(), "stop" );
        input.edit( Key::UP );
        input.edit( Key::UP );
        assert_eq!( input.content(), "next" );
        input.edit( Key::DOWN );
        input.edit( Key::DOWN );
        assert_eq!( input.content(), "pla" );
    }


    #[test]
    fn test_prompt_and_unhandled_keys() {
        let mut input = typed( "ab" );
        assert!( !input.edit( Key::ENTER ) );
        assert!( !input.edit( Key::TAB ) );
        assert_eq!( input.to_prompt(), Prompt { text: ":ab".into(), cursor: 3 } );
    }
}
