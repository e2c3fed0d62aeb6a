// Standard MIDI File output for sequenced exercises.
//
// Writes a format 0 (single track) file: time signature and tempo meta events,
// a program change selecting the instrument, then the event stream. Rest advances
// have no MIDI message of their own; their ticks are carried as delta time onto
// the next written event, or onto end-of-track for a trailing rest.
//
// Uses the `midly` crate for writing and for reading files back.

use std::path::Path;

use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use tracing::info;

use crate::error::EtudeError;
use crate::sequencer::{TimedEvent, TICKS_PER_BEAT};
use crate::types::TimeSignature;

/// Largest delta a variable-length quantity can carry.
const MAX_DELTA: u64 = 0x0FFF_FFFF;

/// Largest tempo value (microseconds per quarter) a tempo meta event can carry.
const MAX_TEMPO_MICROS: u32 = 0x00FF_FFFF;

/// Header and setup values for one exported file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiSettings {
    pub ticks_per_beat: u16,
    /// Quarter-note BPM
    pub tempo: u16,
    pub time_signature: TimeSignature,
    /// General MIDI program (0-indexed)
    pub program: u8,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            ticks_per_beat: TICKS_PER_BEAT,
            tempo: 60,
            time_signature: TimeSignature::default(),
            program: 56,
        }
    }
}

/// Microseconds per quarter note for a BPM value.
pub fn tempo_micros(bpm: u16) -> u32 {
    (60_000_000 / bpm.max(1) as u32).min(MAX_TEMPO_MICROS)
}

fn meta(delta: u32, message: MetaMessage<'static>) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Meta(message),
    }
}

fn channel_message(delta: u32, message: MidiMessage) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message,
        },
    }
}

/// Build an in-memory SMF from a timed event stream.
pub fn build_smf(events: &[TimedEvent], settings: &MidiSettings) -> Result<Smf<'static>, EtudeError> {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(settings.ticks_per_beat)),
    ));

    let ts = settings.time_signature;
    let mut track: Track<'static> = Vec::with_capacity(events.len() + 4);
    track.push(meta(
        0,
        MetaMessage::TimeSignature(ts.numerator, ts.denominator.trailing_zeros() as u8, 24, 8),
    ));
    track.push(meta(0, MetaMessage::Tempo(u24::new(tempo_micros(settings.tempo)))));
    track.push(channel_message(
        0,
        MidiMessage::ProgramChange {
            program: u7::new(settings.program.min(127)),
        },
    ));

    let mut carried: u64 = 0;
    for event in events {
        let delta = carried + event.delta() as u64;
        let message = match *event {
            TimedEvent::RestAdvance { .. } => {
                carried = delta;
                continue;
            }
            TimedEvent::NoteOn { pitch, velocity, .. } => MidiMessage::NoteOn {
                key: u7::new(pitch.min(127)),
                vel: u7::new(velocity.clamp(1, 127)),
            },
            TimedEvent::NoteOff { pitch, velocity, .. } => MidiMessage::NoteOff {
                key: u7::new(pitch.min(127)),
                vel: u7::new(velocity.min(127)),
            },
        };
        track.push(channel_message(checked_delta(delta)?, message));
        carried = 0;
    }

    track.push(meta(checked_delta(carried)?, MetaMessage::EndOfTrack));
    smf.tracks.push(track);
    Ok(smf)
}

fn checked_delta(delta: u64) -> Result<u32, EtudeError> {
    if delta > MAX_DELTA {
        return Err(EtudeError::Midi(format!(
            "delta of {} ticks exceeds the file format limit",
            delta
        )));
    }
    Ok(delta as u32)
}

/// Encode a timed event stream as SMF bytes.
pub fn write_smf(events: &[TimedEvent], settings: &MidiSettings) -> Result<Vec<u8>, EtudeError> {
    let smf = build_smf(events, settings)?;
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

/// Write SMF bytes to `path`.
pub fn save_smf(bytes: &[u8], path: &Path) -> Result<(), EtudeError> {
    std::fs::write(path, bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote MIDI file");
    Ok(())
}

/// What a written file contains, read back from its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmfSummary {
    pub track_count: usize,
    pub ticks_per_beat: Option<u16>,
    pub tempo_micros: Option<u32>,
    pub time_signature: Option<(u8, u8)>,
    pub program: Option<u8>,
    pub note_count: usize,
    /// Sum of all deltas of the first track
    pub total_ticks: u64,
}

/// Parse SMF bytes and summarize the first track.
pub fn inspect_smf(bytes: &[u8]) -> Result<SmfSummary, EtudeError> {
    let smf = Smf::parse(bytes).map_err(|e| EtudeError::Midi(e.to_string()))?;

    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => Some(tpb.as_int()),
        Timing::Timecode(..) => None,
    };

    let mut summary = SmfSummary {
        track_count: smf.tracks.len(),
        ticks_per_beat,
        tempo_micros: None,
        time_signature: None,
        program: None,
        note_count: 0,
        total_ticks: 0,
    };

    if let Some(track) = smf.tracks.first() {
        for event in track {
            summary.total_ticks += event.delta.as_int() as u64;
            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(t)) => summary.tempo_micros = Some(t.as_int()),
                TrackEventKind::Meta(MetaMessage::TimeSignature(num, den_pow, _, _)) => {
                    summary.time_signature = Some((num, 1u8.checked_shl(den_pow as u32).unwrap_or(0)))
                }
                TrackEventKind::Midi { message, .. } => match message {
                    MidiMessage::ProgramChange { program } => summary.program = Some(program.as_int()),
                    MidiMessage::NoteOn { vel, .. } if vel.as_int() > 0 => summary.note_count += 1,
                    _ => {}
                },
                _ => {}
            }
        }
    }

    Ok(summary)
}
