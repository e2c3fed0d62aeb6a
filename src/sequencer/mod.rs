//! # Sequencer Module
//!
//! Turn a canonical note list into an ordered stream of timed events.
//!
//! ## Purpose
//! The event stream is what the MIDI writer and any audio renderer consume. It
//! must preserve the exercise length to the tick: the sum of every event's delta
//! equals the sum of every note's duration converted to ticks.
//!
//! ## Sub-modules
//! - `types` - [`TimedEvent`] and tick constants
//! - `engine` - [`sequence()`], the conversion itself
//! - `velocity` - [`VelocitySource`] and its seeded / fixed implementations
//!
//! ## Rest Coalescing
//! Rests never become events of their own. Consecutive rests accumulate into a
//! single [`TimedEvent::RestAdvance`], emitted right before the next pitched note
//! (or at the very end of the stream).
//!
//! ```text
//! Rest/2  Rest/3  C4/4      (units, 240 ticks each)
//!   -> RestAdvance(1200)  NoteOn(60, v, 0)  NoteOff(60, v, 960)
//! ```
//!
//! ## Example
//! ```rust
//! use etude::sequencer::{sequence, FixedVelocity, TimedEvent, TICKS_PER_UNIT};
//! use etude::types::accumulate;
//!
//! let notes = accumulate(vec![("Rest".to_string(), 2), ("C4".to_string(), 2)]).unwrap();
//! let events = sequence(&notes, TICKS_PER_UNIT, &mut FixedVelocity(80)).unwrap();
//!
//! assert_eq!(events[0], TimedEvent::RestAdvance { delta: 480 });
//! assert_eq!(events[2], TimedEvent::NoteOff { pitch: 60, velocity: 80, delta: 480 });
//! ```
//!
//! ## Related Modules
//! - `pitch` - Resolves note text to MIDI numbers
//! - `midi` - Writes the stream as a Standard MIDI File

mod engine;
mod types;
mod velocity;

#[cfg(test)]
mod tests;

pub use engine::sequence;
pub use types::{total_ticks, TimedEvent, TICKS_PER_BEAT, TICKS_PER_UNIT};
pub use velocity::{FixedVelocity, RandomVelocity, VelocitySource, DEFAULT_VELOCITY_HIGH, DEFAULT_VELOCITY_LOW};
