//! # Pitch Codec
//!
//! Bidirectional mapping between note-name text and MIDI pitch numbers.
//!
//! ## Accepted Spellings
//! - Scientific notation: `C4`, `F#5`, `Bb3`, `C-1`
//! - Apostrophe notation: `C'` (octave 5), `C''` (octave 6), ...
//! - Bare names default to octave 4: `A` = `A4` = 69
//! - Rest tokens (case-insensitive): `rest`, `r`, `pause`, `p`
//!
//! Letters and accidentals are case-insensitive, so `bb4`, `BB4` and `Bb4` all
//! name B-flat 4. An explicit octave digit wins over apostrophes (`C'3` = `C3`).
//!
//! ## Output
//! Formatting always uses scientific notation with sharps. Spelling is lossy
//! (`Db4` formats as `C#4`); the pitch number is the durable identity, and
//! `Pitch::parse(&p.to_string())` returns `p` for every pitch in 0..=127.

use std::fmt;

use crate::error::EtudeError;

/// Text tokens that mark a rest (compared case-insensitively).
pub const REST_TOKENS: [&str; 4] = ["rest", "r", "pause", "p"];

/// Literal used when formatting a rest.
pub const REST_LITERAL: &str = "Rest";

/// Octave used when neither a digit nor an apostrophe is given.
pub const DEFAULT_OCTAVE: i32 = 4;

/// Highest valid MIDI pitch.
pub const MAX_PITCH: u8 = 127;

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A parsed pitch: either a rest or a MIDI note number (C4 = 60).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pitch {
    Rest,
    Midi(u8),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Accidental {
    Natural,
    Sharp,
    Flat,
}

/// Returns true when `text` is one of the rest tokens.
///
/// Empty or whitespace-only text is not a rest.
pub fn is_rest(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && REST_TOKENS.iter().any(|r| trimmed.eq_ignore_ascii_case(r))
}

/// Semitone offset within the octave, or None for spellings outside the twelve
/// recognized pitch classes (E#, B#, Cb, Fb).
fn pitch_class(letter: char, accidental: Accidental) -> Option<i32> {
    let base = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    match accidental {
        Accidental::Natural => Some(base),
        Accidental::Sharp if matches!(letter, 'C' | 'D' | 'F' | 'G' | 'A') => Some(base + 1),
        Accidental::Flat if matches!(letter, 'D' | 'E' | 'G' | 'A' | 'B') => Some(base - 1),
        _ => None,
    }
}

impl Pitch {
    /// Parse note text into a pitch.
    ///
    /// # Examples
    /// ```
    /// use etude::Pitch;
    ///
    /// assert_eq!(Pitch::parse("C4").unwrap(), Pitch::Midi(60));
    /// assert_eq!(Pitch::parse(" db4 ").unwrap(), Pitch::Midi(61));
    /// assert_eq!(Pitch::parse("C''").unwrap(), Pitch::parse("C6").unwrap());
    /// assert_eq!(Pitch::parse("Pause").unwrap(), Pitch::Rest);
    /// assert!(Pitch::parse("").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, EtudeError> {
        let trimmed = text.trim();
        if is_rest(trimmed) {
            return Ok(Pitch::Rest);
        }
        let invalid = || EtudeError::InvalidPitch(trimmed.to_string());

        let mut chars = trimmed.chars().peekable();

        let letter = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some(c @ 'A'..='G') => c,
            _ => return Err(invalid()),
        };

        let accidental = match chars.peek() {
            Some('#') => {
                chars.next();
                Accidental::Sharp
            }
            Some('b') | Some('B') => {
                chars.next();
                Accidental::Flat
            }
            _ => Accidental::Natural,
        };

        let mut apostrophes = 0;
        while chars.peek() == Some(&'\'') {
            chars.next();
            apostrophes += 1;
        }

        // "-1" is the only negative octave that lands inside the MIDI range
        let negative = chars.peek() == Some(&'-');
        if negative {
            chars.next();
        }

        let octave = match chars.next() {
            Some(d) if d.is_ascii_digit() => {
                let value = d.to_digit(10).map(|v| v as i32).ok_or_else(invalid)?;
                if negative {
                    -value
                } else {
                    value
                }
            }
            Some(_) => return Err(invalid()),
            None if negative => return Err(invalid()),
            None => DEFAULT_OCTAVE + apostrophes,
        };

        if chars.next().is_some() {
            return Err(invalid());
        }

        let class = pitch_class(letter, accidental).ok_or_else(invalid)?;
        let midi = class + (octave + 1) * 12;
        if !(0..=MAX_PITCH as i32).contains(&midi) {
            return Err(invalid());
        }

        Ok(Pitch::Midi(midi as u8))
    }

    /// MIDI note number, or None for a rest.
    pub fn midi(&self) -> Option<u8> {
        match self {
            Pitch::Rest => None,
            Pitch::Midi(n) => Some(*n),
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Pitch::Rest)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pitch::Rest => f.write_str(REST_LITERAL),
            Pitch::Midi(n) => {
                let octave = (*n as i32 / 12) - 1;
                write!(f, "{}{}", SHARP_NAMES[(*n % 12) as usize], octave)
            }
        }
    }
}
