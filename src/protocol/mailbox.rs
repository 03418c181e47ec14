//! Single-slot hand-off between the receive task and the tick loop.
//!
//! - [`MailboxWriter`] - publish end, owned by the receiver
//! - [`MailboxReader`] - take end, owned by the motion controller
//!
//! The slot holds at most one message. Publishing overwrites whatever is
//! still pending, and taking clears the slot, so the reader only ever sees
//! the most recent message. Both sides hold the lock for a single
//! `Option` swap.
//!
//! ```
//! use midi_locomotion::protocol::mailbox;
//!
//! let (writer, reader) = mailbox::channel();
//! writer.publish("vel:10;C4".to_string());
//! writer.publish("vel:90;D4".to_string());
//! assert_eq!(reader.take().as_deref(), Some("vel:90;D4"));
//! assert_eq!(reader.take(), None);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

type Slot = Mutex<Option<String>>;

/// Create a connected writer/reader pair around an empty slot.
pub fn channel() -> (MailboxWriter, MailboxReader) {
    let slot = Arc::new(Mutex::new(None));
    (
        MailboxWriter { slot: slot.clone() },
        MailboxReader { slot },
    )
}

// A panic on the other side never leaves the slot half-written, so a
// poisoned lock is still safe to use.
fn lock(slot: &Slot) -> MutexGuard<'_, Option<String>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Publish end of the mailbox
#[derive(Debug)]
pub struct MailboxWriter {
    slot: Arc<Slot>,
}

impl MailboxWriter {
    /// Store a message, replacing any unconsumed one.
    ///
    /// Returns `true` if a pending message was overwritten.
    pub fn publish(&self, message: String) -> bool {
        lock(&self.slot).replace(message).is_some()
    }
}

/// Take end of the mailbox
#[derive(Debug)]
pub struct MailboxReader {
    slot: Arc<Slot>,
}

impl MailboxReader {
    /// Take the pending message, leaving the slot empty.
    pub fn take(&self) -> Option<String> {
        lock(&self.slot).take()
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.slot).is_some()
    }
}
