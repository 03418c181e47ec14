pub mod controller;
pub mod direction;

pub use controller::{
    Facing, Target, MotionController, MotionState, TickOutcome,
    horizontal_forward, to_world_direction,
};
pub use direction::{NoteDirection, default_note_directions, resolve};
