//! # Error Types
//!
//! This module defines all error types for the etude exercise pipeline.
//!
//! Most failures inside the pipeline never reach the caller: the output normalizer
//! degrades to a sentinel and the orchestrator walks its fallback chain instead.
//! The variants below are what remains visible at the library boundary.
//!
//! ## Error Types
//! - `InvalidPitch` - Note text that is not a rest and not a recognized pitch
//! - `InvalidTimeSignature` - Time signature text that cannot be used for unit math
//! - `ParseFailure` - Generator output that could not be repaired into a note list
//! - `DegenerateInput` - Raw durations that are empty or sum to zero
//! - `InfeasibleTarget` - More notes than available duration units
//! - `InvalidSequence` - A canonical note list that breaks its invariants
//! - `InvalidRequest` - Exercise parameters with nothing to fill
//! - `Config` - Invalid YAML configuration
//! - `GeneratorUnavailable` - The external generator did not produce text
//! - `Render` - The audio renderer failed
//! - `Midi` / `Io` / `Json` - Wrapped lower-level failures
//!
//! ## Usage
//! ```rust
//! use etude::{EtudeError, Pitch};
//!
//! match Pitch::parse("H4") {
//!     Ok(pitch) => println!("parsed {}", pitch),
//!     Err(EtudeError::InvalidPitch(text)) => eprintln!("not a note: {}", text),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtudeError {
    /// Malformed note text.
    ///
    /// Fatal to a single note's parse only: the normalizer drops the offending
    /// element rather than aborting the whole sequence.
    ///
    /// # Example
    /// ```
    /// # use etude::EtudeError;
    /// let err = EtudeError::InvalidPitch("E#4".to_string());
    /// assert_eq!(err.to_string(), "Invalid pitch: E#4");
    /// ```
    #[error("Invalid pitch: {0}")]
    InvalidPitch(String),

    /// Time signature text that is malformed or has an unsupported denominator.
    ///
    /// # Example
    /// ```
    /// # use etude::EtudeError;
    /// let err = EtudeError::InvalidTimeSignature("7/16".to_string());
    /// assert_eq!(err.to_string(), "Invalid time signature: 7/16");
    /// ```
    #[error("Invalid time signature: {0}")]
    InvalidTimeSignature(String),

    /// Generator output that could not be repaired into a note list.
    #[error("Unrepairable generator output: {0}")]
    ParseFailure(String),

    /// Raw durations that are empty or all zero; there is no shape to rescale.
    #[error("Degenerate input: raw durations are empty or sum to zero")]
    DegenerateInput,

    /// More notes than target units, so no quantization can keep every note at
    /// least one unit long.
    ///
    /// # Example
    /// ```
    /// # use etude::EtudeError;
    /// let err = EtudeError::InfeasibleTarget { notes: 9, target: 6 };
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Cannot fit 9 notes into 6 units with a minimum of one unit each"
    /// );
    /// ```
    #[error("Cannot fit {notes} notes into {target} units with a minimum of one unit each")]
    InfeasibleTarget { notes: usize, target: u32 },

    /// Canonical note list that breaks the cumulative-duration invariants.
    #[error("Invalid sequence at note {index}: {message}")]
    InvalidSequence { index: usize, message: String },

    /// Exercise request that cannot be built: zero tempo, a measure count outside
    /// `1..=MAX_MEASURES`, or a unit total that does not fit in a `u32`.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid configuration.
    ///
    /// # Example
    /// ```
    /// # use etude::EtudeError;
    /// let err = EtudeError::Config("tempo must be greater than 0".to_string());
    /// assert_eq!(err.to_string(), "Invalid configuration: tempo must be greater than 0");
    /// ```
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The external generator could not be reached or returned nothing usable.
    #[error("Generator unavailable: {0}")]
    GeneratorUnavailable(String),

    /// The audio renderer failed.
    #[error("Render failed: {0}")]
    Render(String),

    /// A Standard MIDI File could not be built or parsed.
    #[error("MIDI error: {0}")]
    Midi(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
