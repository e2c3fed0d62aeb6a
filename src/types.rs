//! # Core Types
//!
//! Value types shared by every stage of the exercise pipeline.
//!
//! ## Duration Units
//! All integer duration bookkeeping uses one **unit = one eighth note**:
//! `1` = eighth, `2` = quarter, `4` = half, `8` = whole. A time signature
//! contributes `numerator * (8 / denominator)` units per measure, so 4/4 has 8
//! units per measure and 3/4 has 6.
//!
//! ## Type Flow
//! ```text
//! generator text --normalize--> Vec<RawNoteEvent>
//!                --quantize---> Vec<CanonicalNoteEvent>  (sums to target units)
//!                --sequence---> Vec<TimedEvent>          (see sequencer)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EtudeError;

/// Number of units in a whole note (the unit is an eighth note).
pub const UNITS_PER_WHOLE: u32 = 8;

/// Longest exercise, in measures, that a request may ask for.
pub const MAX_MEASURES: u32 = 1024;

/// Time signature (e.g., 4/4, 3/4, 6/8)
///
/// Only denominators that divide a whole note into a whole number of eighth
/// notes are supported: 1, 2, 4 and 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }
}

impl TimeSignature {
    pub fn new(numerator: u8, denominator: u8) -> Result<Self, EtudeError> {
        let ts = Self {
            numerator,
            denominator,
        };
        if numerator == 0 || denominator == 0 || UNITS_PER_WHOLE % denominator as u32 != 0 {
            return Err(EtudeError::InvalidTimeSignature(ts.to_string()));
        }
        Ok(ts)
    }

    /// Parse "N/D" text.
    ///
    /// # Examples
    /// ```
    /// use etude::TimeSignature;
    ///
    /// let ts = TimeSignature::parse("3/4").unwrap();
    /// assert_eq!(ts.units_per_measure(), 6);
    /// assert!(TimeSignature::parse("5/16").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, EtudeError> {
        let invalid = || EtudeError::InvalidTimeSignature(s.trim().to_string());
        let (num, den) = s.trim().split_once('/').ok_or_else(invalid)?;
        let numerator = num.trim().parse().map_err(|_| invalid())?;
        let denominator = den.trim().parse().map_err(|_| invalid())?;
        Self::new(numerator, denominator)
    }

    /// Eighth-note units in one measure.
    pub fn units_per_measure(&self) -> u32 {
        self.numerator as u32 * (UNITS_PER_WHOLE / self.denominator as u32)
    }

    /// Total units for `measures` measures.
    pub fn target_units(&self, measures: u32) -> Result<u32, EtudeError> {
        self.units_per_measure().checked_mul(measures).ok_or_else(|| {
            EtudeError::InvalidRequest(format!("{} measures of {} is too long", measures, self))
        })
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// One unvalidated (note, duration) pair from the generator or the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNoteEvent {
    pub note: String,
    pub duration: u32,
}

impl RawNoteEvent {
    pub fn new(note: impl Into<String>, duration: u32) -> Self {
        Self {
            note: note.into(),
            duration,
        }
    }
}

/// A validated note with its running position.
///
/// In a canonical list `cumulative_duration` strictly increases and the last
/// entry equals the exercise's target unit total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalNoteEvent {
    pub note: String,
    pub duration: u32,
    pub cumulative_duration: u32,
}

/// Attach running totals to a list of (note, duration) pairs.
///
/// Fails with [`EtudeError::InvalidSequence`] when the running total no longer
/// fits in a `u32`.
pub fn accumulate(entries: Vec<(String, u32)>) -> Result<Vec<CanonicalNoteEvent>, EtudeError> {
    let mut cumulative: u32 = 0;
    entries
        .into_iter()
        .enumerate()
        .map(|(i, (note, duration))| {
            cumulative = cumulative.checked_add(duration).ok_or_else(|| total_overflow(i))?;
            Ok(CanonicalNoteEvent {
                note,
                duration,
                cumulative_duration: cumulative,
            })
        })
        .collect()
}

fn total_overflow(index: usize) -> EtudeError {
    EtudeError::InvalidSequence {
        index,
        message: "cumulative duration overflows".to_string(),
    }
}

/// Check the canonical invariants: non-empty, every duration >= 1, cumulative
/// totals consistent with the durations, and (when given) a final total equal to
/// `target_units`.
pub fn validate_canonical(
    notes: &[CanonicalNoteEvent],
    target_units: Option<u32>,
) -> Result<(), EtudeError> {
    if notes.is_empty() {
        return Err(EtudeError::InvalidSequence {
            index: 0,
            message: "sequence is empty".to_string(),
        });
    }

    let mut running = 0u32;
    for (i, note) in notes.iter().enumerate() {
        if note.duration == 0 {
            return Err(EtudeError::InvalidSequence {
                index: i,
                message: "duration must be at least 1 unit".to_string(),
            });
        }
        running = running.checked_add(note.duration).ok_or_else(|| total_overflow(i))?;
        if note.cumulative_duration != running {
            return Err(EtudeError::InvalidSequence {
                index: i,
                message: format!(
                    "cumulative_duration is {}, expected {}",
                    note.cumulative_duration, running
                ),
            });
        }
    }

    if let Some(target) = target_units {
        if running != target {
            return Err(EtudeError::InvalidSequence {
                index: notes.len() - 1,
                message: format!("total is {} units, expected {}", running, target),
            });
        }
    }

    Ok(())
}

/// Instruments with their General MIDI programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Instrument {
    Piano,
    Violin,
    #[default]
    Trumpet,
    Clarinet,
    Flute,
}

impl Instrument {
    pub const ALL: [Instrument; 5] = [
        Instrument::Trumpet,
        Instrument::Piano,
        Instrument::Violin,
        Instrument::Clarinet,
        Instrument::Flute,
    ];

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "piano" => Some(Instrument::Piano),
            "violin" => Some(Instrument::Violin),
            "trumpet" => Some(Instrument::Trumpet),
            "clarinet" => Some(Instrument::Clarinet),
            "flute" => Some(Instrument::Flute),
            _ => None,
        }
    }

    /// General MIDI program number (0-indexed).
    pub fn program(&self) -> u8 {
        match self {
            Instrument::Piano => 0,
            Instrument::Violin => 40,
            Instrument::Trumpet => 56,
            Instrument::Clarinet => 71,
            Instrument::Flute => 73,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Instrument::Piano => "Piano",
            Instrument::Violin => "Violin",
            Instrument::Trumpet => "Trumpet",
            Instrument::Clarinet => "Clarinet",
            Instrument::Flute => "Flute",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Player difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Level {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Level {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Some(Level::Beginner),
            "intermediate" => Some(Level::Intermediate),
            "advanced" => Some(Level::Advanced),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keys offered for exercises. Unknown keys are accepted and treated as C Major
/// wherever a note pool is needed.
pub const KEYS: [&str; 7] = [
    "C Major", "G Major", "D Major", "F Major", "Bb Major", "A Minor", "E Minor",
];

/// Everything needed to produce one exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseRequest {
    pub instrument: Instrument,
    pub level: Level,
    pub key: String,
    pub time_signature: TimeSignature,
    pub measures: u32,
    /// Quarter-note BPM
    pub tempo: u16,
    /// Free-form instruction replacing the parameter-driven prompt
    pub custom_prompt: Option<String>,
}

impl Default for ExerciseRequest {
    fn default() -> Self {
        Self {
            instrument: Instrument::default(),
            level: Level::default(),
            key: KEYS[0].to_string(),
            time_signature: TimeSignature::default(),
            measures: 4,
            tempo: 60,
            custom_prompt: None,
        }
    }
}

impl ExerciseRequest {
    /// Exact number of eighth-note units the exercise must fill.
    pub fn target_units(&self) -> Result<u32, EtudeError> {
        self.time_signature.target_units(self.measures)
    }

    /// Check the request can produce an exercise and return its unit total.
    ///
    /// Measures must be in `1..=MAX_MEASURES` and the tempo positive.
    pub fn validate(&self) -> Result<u32, EtudeError> {
        if self.measures == 0 || self.measures > MAX_MEASURES {
            return Err(EtudeError::InvalidRequest(format!(
                "measures must be between 1 and {}, got {}",
                MAX_MEASURES, self.measures
            )));
        }
        if self.tempo == 0 {
            return Err(EtudeError::InvalidRequest("tempo must be positive".to_string()));
        }
        self.target_units()
    }
}
