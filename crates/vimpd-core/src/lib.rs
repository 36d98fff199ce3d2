//! vimpd Core - Modal key dispatch for an MPD client
//!
//! This crate provides everything between a key press and a call on the
//! playback server: scrolling and selectable viewports, the normal, command
//! and search modes, ex command parsing, and the event queue fed by
//! background workers.

pub mod command;
pub mod context;
pub mod events;
pub mod key;
pub mod mode;
pub mod player;
pub mod selection;
pub mod settings;
pub mod viewport;
pub mod window;
pub mod windows;
pub mod worker;

#[cfg( test )]
mod testing;

pub use command::{ CommandError, CommandLine, Range };
pub use context::{ Context, Message, StatusLine };
pub use events::{ event_queue, Event, EventQueue, EventSender, ListingKind, EVENT_QUEUE_CAPACITY };
pub use key::{ parse_keys, Key, KeyError, KeyMap };
pub use mode::{ ModeController, ModeName, Prompt };
pub use player::{ PlaybackState, Player, PlayerError, Status };
pub use settings::Settings;
pub use window::{ Screen, Window, WindowError };
pub use windows::{ HelpWindow, LibraryWindow, PlaylistWindow };
pub use worker::Worker;
