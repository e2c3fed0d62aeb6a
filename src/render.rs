//! # Audio Rendering Seam
//!
//! Rendering SMF bytes to audio is delegated to an [`AudioRenderer`]. The crate
//! ships no synthesizer; callers plug one in (a soundfont player, a test double).
//! Rendering is optional and its failures never discard an exercise.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::EtudeError;
use crate::types::Instrument;

/// What a renderer needs to voice one instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentPatch {
    pub instrument: Instrument,
    /// General MIDI program (0-indexed)
    pub program: u8,
    pub soundfont: Option<PathBuf>,
}

impl InstrumentPatch {
    /// Patch for `instrument`, with its soundfont taken from `config` when one is
    /// configured.
    pub fn for_instrument(instrument: Instrument, config: &Config) -> Self {
        Self {
            instrument,
            program: instrument.program(),
            soundfont: config.soundfonts.get(&instrument).cloned(),
        }
    }
}

/// Encoded audio produced from an exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAudio {
    pub bytes: Vec<u8>,
    pub duration_secs: f64,
}

/// Turns SMF bytes into audio.
pub trait AudioRenderer {
    fn render(&self, smf: &[u8], patch: &InstrumentPatch) -> Result<RenderedAudio, EtudeError>;
}
