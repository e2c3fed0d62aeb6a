//! # Output Normalizer
//!
//! Best-effort recovery of a note list from free-form generator text.
//!
//! ## Repair Pipeline
//! Each step leaves already-valid input untouched, and steps 3-5 never rewrite
//! text inside a quoted string:
//! 1. Quote characters (`'`, `‘ ’ “ ”`) become `"`
//! 2. Keep the text from the first `[` to the last `]`
//! 3. Strip trailing commas before `}` or `]`
//! 4. Quote bare object keys: `{note: ...}` -> `{"note": ...}`
//! 5. Quote bare identifier values: `"note": C#4,` -> `"note": "C#4",`
//! 6. Parse as JSON; the top level must be an array
//! 7. Resolve each element through [`NoteIntake`]: object elements only, first
//!    present alias wins, durations coerced to integers, invalid pitches dropped
//! 8. An empty survivor list is a failure
//!
//! ## Failure Policy
//! [`normalize_output`] never returns an error: any failure becomes `None`, the
//! "no valid data" sentinel, and the orchestrator moves on to its fallback chain.
//! [`try_normalize`] exposes the reason for logging and tests.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::EtudeError;
use crate::pitch::Pitch;
use crate::types::RawNoteEvent;

/// Keys probed, in order, for the note value.
pub const NOTE_KEYS: [&str; 4] = ["note", "pitch", "nota", "ton"];

/// Keys probed, in order, for the duration value.
pub const DURATION_KEYS: [&str; 4] = ["duration", "dur", "length", "value"];

// Each repair pattern first matches a whole string literal, which is copied
// through unchanged, so the repair groups only capture text outside strings.
const STRING_LITERAL: &str = r#""(?:[^"\\]|\\.)*""#;

static TRAILING_COMMA_REGEX: OnceLock<Regex> = OnceLock::new();
static BARE_KEY_REGEX: OnceLock<Regex> = OnceLock::new();
static BARE_VALUE_REGEX: OnceLock<Regex> = OnceLock::new();

fn trailing_comma_regex() -> &'static Regex {
    TRAILING_COMMA_REGEX.get_or_init(|| {
        Regex::new(&format!(r"{STRING_LITERAL}|,\s*([}}\]])")).expect("invalid regex pattern")
    })
}

fn bare_key_regex() -> &'static Regex {
    BARE_KEY_REGEX.get_or_init(|| {
        Regex::new(&format!(r"{STRING_LITERAL}|([{{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:"))
            .expect("invalid regex pattern")
    })
}

fn bare_value_regex() -> &'static Regex {
    BARE_VALUE_REGEX.get_or_init(|| {
        Regex::new(&format!(r"{STRING_LITERAL}|:\s*([A-Za-z_][A-Za-z0-9_#]*)(\s*[,}}\]])"))
            .expect("invalid regex pattern")
    })
}

/// One element of externally supplied JSON, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteIntake {
    /// `{"note": "C4", "duration": 2}` or any alias spelling
    Object(Map<String, Value>),
    /// `["C4", 2]`
    Pair(Value, Value),
    /// Anything else
    Other(Value),
}

impl From<Value> for NoteIntake {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => NoteIntake::Object(map),
            Value::Array(items) if items.len() == 2 => {
                let mut items = items.into_iter();
                match (items.next(), items.next()) {
                    (Some(note), Some(duration)) => NoteIntake::Pair(note, duration),
                    _ => NoteIntake::Other(Value::Null),
                }
            }
            other => NoteIntake::Other(other),
        }
    }
}

impl NoteIntake {
    /// Resolve the note and duration of this element.
    ///
    /// Returns None when either value is missing or the duration cannot be
    /// coerced to a non-negative integer. Pitch text is not validated here.
    pub fn normalize(self) -> Option<RawNoteEvent> {
        match self {
            NoteIntake::Object(map) => {
                let note = first_present(&map, &NOTE_KEYS).and_then(coerce_note)?;
                let duration = first_present(&map, &DURATION_KEYS).and_then(coerce_duration)?;
                Some(RawNoteEvent { note, duration })
            }
            NoteIntake::Pair(note, duration) => Some(RawNoteEvent {
                note: coerce_note(&note)?,
                duration: coerce_duration(&duration)?,
            }),
            NoteIntake::Other(_) => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, NoteIntake::Object(_))
    }
}

fn first_present<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key))
}

fn coerce_note(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integers pass through, finite non-negative floats truncate, numeric strings
/// parse. Everything else fails.
fn coerce_duration(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u32::try_from(u).ok()
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u32::MAX as f64)
                    .map(|f| f.trunc() as u32)
            }
        }
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Apply the textual repair steps (1-5). Returns None when there is no array
/// to recover.
pub fn repair_json(text: &str) -> Option<String> {
    let text: String = text
        .trim()
        .chars()
        .map(|c| match c {
            '\'' | '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect();

    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    let json = &text[start..=end];

    let json = trailing_comma_regex().replace_all(json, |caps: &Captures| match caps.get(1) {
        Some(close) => close.as_str().to_string(),
        None => caps[0].to_string(),
    });
    let json = bare_key_regex().replace_all(&json, |caps: &Captures| match caps.get(2) {
        Some(key) => format!("{}\"{}\":", &caps[1], key.as_str()),
        None => caps[0].to_string(),
    });
    let json = bare_value_regex().replace_all(&json, |caps: &Captures| match caps.get(1) {
        Some(value) => format!(":\"{}\"{}", value.as_str(), &caps[2]),
        None => caps[0].to_string(),
    });

    Some(json.into_owned())
}

/// Repair and parse generator text into intake elements (steps 1-6).
pub fn parse_intake(text: &str) -> Result<Vec<NoteIntake>, EtudeError> {
    let json = repair_json(text)
        .ok_or_else(|| EtudeError::ParseFailure("no [ ... ] array in output".to_string()))?;

    match serde_json::from_str::<Value>(&json) {
        Ok(Value::Array(items)) => Ok(items.into_iter().map(NoteIntake::from).collect()),
        Ok(_) => Err(EtudeError::ParseFailure("top level is not an array".to_string())),
        Err(e) => Err(EtudeError::ParseFailure(e.to_string())),
    }
}

/// Run the full pipeline, reporting why it failed.
pub fn try_normalize(text: &str) -> Result<Vec<RawNoteEvent>, EtudeError> {
    let mut notes = Vec::new();

    for (i, intake) in parse_intake(text)?.into_iter().enumerate() {
        if !intake.is_object() {
            debug!(index = i, "skipping non-object element");
            continue;
        }
        let Some(raw) = intake.normalize() else {
            debug!(index = i, "skipping element without note or integer duration");
            continue;
        };
        if let Err(e) = Pitch::parse(&raw.note) {
            debug!(index = i, error = %e, "skipping element with invalid pitch");
            continue;
        }
        notes.push(raw);
    }

    if notes.is_empty() {
        return Err(EtudeError::ParseFailure("no valid note entries".to_string()));
    }
    Ok(notes)
}

/// Normalize generator text into raw notes, or None when nothing is usable.
///
/// # Examples
/// ```
/// use etude::{normalize_output, RawNoteEvent};
///
/// let text = "[{note: C4, duration: 2,}, {'note':'D4','duration':'3'}]";
/// assert_eq!(
///     normalize_output(text),
///     Some(vec![RawNoteEvent::new("C4", 2), RawNoteEvent::new("D4", 3)])
/// );
/// assert_eq!(normalize_output("no array here"), None);
/// ```
pub fn normalize_output(text: &str) -> Option<Vec<RawNoteEvent>> {
    match try_normalize(text) {
        Ok(notes) => Some(notes),
        Err(e) => {
            debug!(error = %e, "generator output rejected");
            None
        }
    }
}
