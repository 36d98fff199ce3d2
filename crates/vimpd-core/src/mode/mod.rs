//! Input modes and the controller that switches between them.

pub mod command;
pub mod controller;
pub mod input;
pub mod normal;
pub mod search;

use std::fmt;

use crate::context::Context;
use crate::key::Key;

pub use command::CommandMode;
pub use controller::ModeController;
pub use normal::NormalMode;
pub use search::SearchMode;


/// Identifies one of the modes.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum ModeName {
    #[default]
    Normal,
    Command,
    Search,
}


impl fmt::Display for ModeName {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        let name = match self {
            ModeName::Normal => "normal",
            ModeName::Command => "command",
            ModeName::Search => "search",
        };
        f.write_str( name )
    }
}


/// What a mode wants drawn on the command row.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct Prompt {
    /// Prompt character followed by the typed text
    pub text: String,
    /// Cursor column within `text`, in characters
    pub cursor: usize,
}


/// A keyboard input mode.
///
/// Modes are created once and reused; `initialise` and `finalise` only mark
/// activation.
pub trait Mode {
    fn name( &self ) -> ModeName;

    /// Called when the mode becomes active, with the key that caused it.
    fn initialise( &mut self, key: Key, ctx: &mut Context );

    /// Called when the mode stops being active, with the key that caused it.
    fn finalise( &mut self, key: Key, ctx: &mut Context );

    /// Command row content while the mode is active.
    fn refresh( &self, ctx: &Context ) -> Option<Prompt>;

    /// Handles one key.
    ///
    /// @returns false when the program should quit
    fn handle( &mut self, key: Key, ctx: &mut Context ) -> bool;

    /// Whether `key` pressed in normal mode activates this mode.
    fn causes_mode_to_start( &self, key: Key ) -> bool;

    /// Whether `key` pressed in this mode returns to normal mode.
    fn causes_mode_to_end( &self, key: Key ) -> bool;
}
