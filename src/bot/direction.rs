use serde::{Deserialize, Serialize};

use crate::codec::Vec3;

/// Note-name prefix mapped to a local-space direction (x = right, z = forward)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDirection {
    pub prefix: String,
    pub direction: Vec3,
}

impl NoteDirection {
    pub fn new(prefix: impl Into<String>, x: f32, z: f32) -> Self {
        Self {
            prefix: prefix.into(),
            direction: Vec3::new(x, 0.0, z),
        }
    }

    /// Case-insensitive prefix match. Empty prefixes never match.
    pub fn matches(&self, note_name: &str) -> bool {
        if self.prefix.is_empty() {
            return false;
        }
        note_name
            .to_uppercase()
            .starts_with(&self.prefix.to_uppercase())
    }
}

/// The seven natural notes, one direction each.
pub fn default_note_directions() -> Vec<NoteDirection> {
    vec![
        NoteDirection::new("C", 0.0, 1.0),
        NoteDirection::new("D", 1.0, 0.0),
        NoteDirection::new("E", 0.0, -1.0),
        NoteDirection::new("F", -1.0, 0.0),
        NoteDirection::new("G", 1.0, 1.0),
        NoteDirection::new("A", -1.0, 1.0),
        NoteDirection::new("B", 0.0, 1.0),
    ]
}

/// Resolve a note name to a horizontal local direction.
///
/// Scans `table` in order and returns the first match with its vertical
/// component dropped. Returns zero when nothing matches, so the caller
/// travels straight along its forward axis.
pub fn resolve(note_name: Option<&str>, table: &[NoteDirection]) -> Vec3 {
    let Some(note_name) = note_name.filter(|n| !n.is_empty()) else {
        return Vec3::ZERO;
    };

    table
        .iter()
        .find(|entry| entry.matches(note_name))
        .map(|entry| entry.direction.horizontal())
        .unwrap_or(Vec3::ZERO)
}
