//! Event stream generation engine
//!
//! Converts a canonical note list into timed events with rest coalescing.

use crate::error::EtudeError;
use crate::pitch::Pitch;
use crate::types::CanonicalNoteEvent;

use super::types::TimedEvent;
use super::velocity::VelocitySource;

/// Sequence canonical notes into timed events.
///
/// # Parameters
/// - `notes`: canonical note list (durations in units)
/// - `ticks_per_unit`: tick length of one unit; every note lasts at least 1 tick
/// - `velocity`: source of note-on velocities
///
/// # Stream Shape
/// - Rests add to a pending-rest accumulator and emit nothing
/// - A pitched note first flushes the accumulator as one `RestAdvance`, then emits
///   `NoteOn` (delta 0) followed by `NoteOff` (delta = note ticks)
/// - A non-empty accumulator at the end becomes a final `RestAdvance`
///
/// # Errors
/// - [`EtudeError::InvalidPitch`] if a note's text does not parse
/// - [`EtudeError::InvalidSequence`] if a note, or a run of rests, is longer
///   than `u32::MAX` ticks
pub fn sequence<V: VelocitySource + ?Sized>(
    notes: &[CanonicalNoteEvent],
    ticks_per_unit: u32,
    velocity: &mut V,
) -> Result<Vec<TimedEvent>, EtudeError> {
    let mut events = Vec::with_capacity(notes.len() * 2 + 1);
    let mut pending_rest: u32 = 0;

    for (index, note) in notes.iter().enumerate() {
        let ticks = note
            .duration
            .checked_mul(ticks_per_unit)
            .ok_or_else(|| tick_overflow(index))?
            .max(1);

        match Pitch::parse(&note.note)? {
            Pitch::Rest => {
                pending_rest = pending_rest.checked_add(ticks).ok_or_else(|| tick_overflow(index))?;
            }
            Pitch::Midi(pitch) => {
                if pending_rest > 0 {
                    events.push(TimedEvent::RestAdvance { delta: pending_rest });
                    pending_rest = 0;
                }
                let vel = velocity.next_velocity();
                events.push(TimedEvent::NoteOn {
                    pitch,
                    velocity: vel,
                    delta: 0,
                });
                events.push(TimedEvent::NoteOff {
                    pitch,
                    velocity: vel,
                    delta: ticks,
                });
            }
        }
    }

    if pending_rest > 0 {
        events.push(TimedEvent::RestAdvance { delta: pending_rest });
    }

    Ok(events)
}

fn tick_overflow(index: usize) -> EtudeError {
    EtudeError::InvalidSequence {
        index,
        message: "note length overflows the tick range".to_string(),
    }
}
