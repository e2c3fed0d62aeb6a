//! Timed event type definitions

use serde::{Deserialize, Serialize};

/// MIDI resolution: ticks per quarter note.
pub const TICKS_PER_BEAT: u16 = 480;

/// Ticks per duration unit (one eighth note).
pub const TICKS_PER_UNIT: u32 = TICKS_PER_BEAT as u32 / 2;

/// One event of the sequenced stream.
///
/// `delta` is the number of ticks elapsed since the previous event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimedEvent {
    /// Sound starts; always emitted with a zero delta
    NoteOn { pitch: u8, velocity: u8, delta: u32 },
    /// Sound stops; the delta is the full note length
    NoteOff { pitch: u8, velocity: u8, delta: u32 },
    /// Silence spanning one or more consecutive rests
    RestAdvance { delta: u32 },
}

impl TimedEvent {
    pub fn delta(&self) -> u32 {
        match self {
            TimedEvent::NoteOn { delta, .. }
            | TimedEvent::NoteOff { delta, .. }
            | TimedEvent::RestAdvance { delta } => *delta,
        }
    }
}

/// Sum of all deltas in a stream.
pub fn total_ticks(events: &[TimedEvent]) -> u64 {
    events.iter().map(|e| e.delta() as u64).sum()
}
