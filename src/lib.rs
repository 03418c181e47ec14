//! MIDI Locomotion
//!
//! Turns note messages arriving over UDP into stepped, time-integrated
//! motion of an agent. A background task receives datagrams into a
//! single-slot mailbox; the host calls [`MotionController::tick`] once per
//! frame to consume the latest message and move its target.

pub mod codec;
pub mod error;
pub mod protocol;
pub mod bot;
pub mod client;

pub use error::{Error, Result};
pub use codec::{ParsedCommand, Vec3, decode, note_name_from_midi};
pub use protocol::{UdpReceiver, RawMessage, MailboxReader, MailboxWriter};
pub use bot::{
    Facing, Target, MotionController, MotionState, TickOutcome,
    NoteDirection, default_note_directions, resolve,
};
pub use client::{LocomotionConfig, LocomotionSession, MotionConfig, ReceiverConfig};
