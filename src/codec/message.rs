//! Control message decoding.
//!
//! A datagram carries one record of comma-separated `key:value` pairs,
//! optionally followed by `;` and a free-form note name:
//!
//! ```text
//! vel:100,speed:0.5,midi:60;C4
//! ```
//!
//! Decoding never fails. Each field falls back to its default on its own,
//! so a broken `vel` still lets `speed` and the note through.

/// Semitone names starting at C.
pub const CHROMATIC_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Separator between the key/value section and the trailing note name.
pub const NOTE_SEPARATOR: char = ';';

/// Best-effort result of decoding one control message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedCommand {
    /// Note velocity, 0-127 expected
    pub vel: f32,
    /// Payload speed, 0-1 expected
    pub speed: f32,
    /// Explicit note name (`note` key or trailing segment)
    pub note: Option<String>,
    /// MIDI note number, unvalidated. A `midi` key with an unparseable
    /// value decodes as `Some(0)`.
    pub midi: Option<i32>,
}

impl ParsedCommand {
    /// Note name to resolve a direction from.
    ///
    /// An explicit name wins; otherwise a non-negative MIDI number is
    /// converted to its equal-tempered name.
    pub fn note_name(&self) -> Option<String> {
        match &self.note {
            Some(name) if !name.is_empty() => Some(name.clone()),
            _ => self.midi.and_then(note_name_from_midi),
        }
    }
}

/// Decode a control message. Always succeeds.
pub fn decode(text: &str) -> ParsedCommand {
    let mut cmd = ParsedCommand::default();

    let (head, tail) = match text.split_once(NOTE_SEPARATOR) {
        Some((head, tail)) => (head, Some(tail)),
        None => (text, None),
    };

    for pair in head.split(',') {
        let mut kv = pair.split(':');
        let (Some(key), Some(value), None) = (kv.next(), kv.next(), kv.next()) else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "vel" => cmd.vel = parse_f32(value),
            "speed" => cmd.speed = parse_f32(value),
            "note" => cmd.note = Some(value.to_string()),
            "midi" => cmd.midi = Some(value.parse::<i32>().unwrap_or(0)),
            _ => {}
        }
    }

    let has_note = cmd.note.as_deref().is_some_and(|n| !n.is_empty());
    if !has_note {
        if let Some(tail) = tail.map(str::trim).filter(|t| !t.is_empty()) {
            cmd.note = Some(tail.to_string());
        }
    }

    cmd
}

/// Non-finite values are rejected along with garbage so they can't leak
/// into the step computation.
fn parse_f32(value: &str) -> f32 {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Equal-tempered note name for a MIDI number (`60` -> `"C4"`).
pub fn note_name_from_midi(midi: i32) -> Option<String> {
    if midi < 0 {
        return None;
    }
    let name = CHROMATIC_NAMES[(midi % 12) as usize];
    let octave = midi / 12 - 1;
    Some(format!("{}{}", name, octave))
}
