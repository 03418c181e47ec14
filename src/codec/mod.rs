pub mod message;
pub mod types;

pub use message::{
    ParsedCommand, CHROMATIC_NAMES, NOTE_SEPARATOR,
    decode, note_name_from_midi,
};
pub use types::*;
