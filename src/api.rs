//! # Public API
//!
//! The orchestrator that turns an exercise request into a finished exercise.
//!
//! ## Pipeline
//! 1. Build the generator prompt and ask the [`Generator`] for text
//! 2. Normalize the text into raw notes
//! 3. Quantize the raw notes to the exact unit total and attach running totals
//! 4. Sequence into timed events and encode a Standard MIDI File
//! 5. Optionally render audio
//!
//! ## Fallback Chain
//! Steps 2-3 are attempted on up to three note sources, in order:
//!
//! | Level       | Source                                   |
//! |-------------|------------------------------------------|
//! | `Generator` | normalized generator output              |
//! | `Synthetic` | random walk over the key's note pool     |
//! | `Scale`     | fixed C major scale                      |
//!
//! A generator error, an unrepairable response or a degenerate note list moves
//! on to the next level. A source with more notes than units is truncated to
//! the target length before quantizing.
//!
//! ## Typical Usage
//!
//! ```rust
//! use etude::{CannedGenerator, Config, ExerciseRequest, ExerciseSource, Orchestrator};
//!
//! let output = r#"[{"note": "C4", "duration": 2}, {"note": "E4", "duration": 2}]"#;
//! let mut orchestrator = Orchestrator::new(Config::default(), CannedGenerator::new(output));
//!
//! let exercise = orchestrator.generate(&ExerciseRequest::default())?;
//! assert_eq!(exercise.source, ExerciseSource::Generator);
//! assert_eq!(exercise.notes.last().map(|n| n.cumulative_duration), Some(32));
//! # Ok::<(), etude::EtudeError>(())
//! ```
//!
//! ## Rebuilding
//!
//! [`rebuild_from_json`] re-ingests a previously displayed (and possibly hand
//! edited) note list without re-quantizing it, then rebuilds the MIDI.

use std::path::Path;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::EtudeError;
use crate::fallback::{scale_exercise, synthetic_exercise};
use crate::midi::{write_smf, MidiSettings};
use crate::normalize::{normalize_output, parse_intake};
use crate::pitch::Pitch;
use crate::prompt::{build_prompt, Generator, GeneratorPrompt};
use crate::quantize::{quantize, round_half_even};
use crate::render::{AudioRenderer, InstrumentPatch, RenderedAudio};
use crate::sequencer::{sequence, RandomVelocity, TimedEvent};
use crate::types::{
    accumulate, validate_canonical, CanonicalNoteEvent, ExerciseRequest, Instrument,
    RawNoteEvent, TimeSignature,
};

const FALLBACK_STREAM: u64 = 0x5EED_FA11_BAC4_0001;
const VELOCITY_STREAM: u64 = 0x5EED_7E10_C170_0002;

/// Where an exercise's notes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseSource {
    Generator,
    Synthetic,
    Scale,
    /// Re-ingested from previously exported JSON
    Imported,
}

/// A finished exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct Exercise {
    pub instrument: Instrument,
    pub time_signature: TimeSignature,
    pub measures: u32,
    pub tempo: u16,
    pub target_units: u32,
    pub notes: Vec<CanonicalNoteEvent>,
    pub events: Vec<TimedEvent>,
    /// Standard MIDI File bytes
    pub midi: Vec<u8>,
    pub source: ExerciseSource,
    pub audio: Option<RenderedAudio>,
}

impl Exercise {
    /// The canonical note list as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, EtudeError> {
        Ok(serde_json::to_string_pretty(&self.notes)?)
    }

    /// Expected playback length at the exercise tempo.
    pub fn duration_seconds(&self) -> f64 {
        // one unit is half a beat
        self.target_units as f64 * 30.0 / self.tempo.max(1) as f64
    }

    pub fn write_json(&self, path: &Path) -> Result<(), EtudeError> {
        std::fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), "wrote exercise JSON");
        Ok(())
    }

    pub fn write_midi(&self, path: &Path) -> Result<(), EtudeError> {
        crate::midi::save_smf(&self.midi, path)
    }
}

/// Parse and strictly validate an exported canonical note list.
///
/// Every element must carry `note`, `duration` and `cumulative_duration`, every
/// note must parse, and the running totals must be consistent.
pub fn parse_canonical_json(text: &str) -> Result<Vec<CanonicalNoteEvent>, EtudeError> {
    let notes: Vec<CanonicalNoteEvent> = serde_json::from_str(text)?;
    validate_canonical(&notes, None)?;
    for note in &notes {
        Pitch::parse(&note.note)?;
    }
    Ok(notes)
}

/// Drives one request through generation, the fallback chain, sequencing and
/// MIDI encoding.
pub struct Orchestrator<G> {
    config: Config,
    generator: G,
    renderer: Option<Box<dyn AudioRenderer>>,
}

impl<G: Generator> Orchestrator<G> {
    pub fn new(config: Config, generator: G) -> Self {
        Self {
            config,
            generator,
            renderer: None,
        }
    }

    /// Attach an audio renderer. Without one, exercises carry no audio.
    pub fn with_renderer(mut self, renderer: Box<dyn AudioRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The prompt that [`generate`](Self::generate) would send for `request`
    /// under `seed`.
    pub fn prompt(&self, request: &ExerciseRequest, seed: u64) -> Result<GeneratorPrompt, EtudeError> {
        let mut prompt = build_prompt(request, &mut Pcg32::seed_from_u64(seed))?;
        prompt.max_tokens = self.config.generator.max_tokens;
        Ok(prompt)
    }

    /// Produce an exercise for `request`.
    ///
    /// # Errors
    /// [`EtudeError::InvalidRequest`] for zero tempo or a measure count outside
    /// `1..=MAX_MEASURES`. MIDI encoding errors propagate. Generator and
    /// rendering failures do not.
    pub fn generate(&mut self, request: &ExerciseRequest) -> Result<Exercise, EtudeError> {
        let target = request.validate()?;
        let seed = self.config.seed.unwrap_or_else(rand::random);

        let prompt = self.prompt(request, seed)?;
        let generated = match self.generator.generate(&prompt) {
            Ok(text) => normalize_output(&text),
            Err(e) => {
                warn!(error = %e, "generator failed");
                None
            }
        };

        let mut fallback_rng = Pcg32::seed_from_u64(seed ^ FALLBACK_STREAM);
        let (source, notes) = generated
            .and_then(|raw| fit(ExerciseSource::Generator, raw, target))
            .or_else(|| {
                let raw = synthetic_exercise(request, target, &mut fallback_rng);
                fit(ExerciseSource::Synthetic, raw, target)
            })
            .or_else(|| fit(ExerciseSource::Scale, scale_exercise(target), target))
            .ok_or(EtudeError::DegenerateInput)?;

        info!(
            source = ?source,
            notes = notes.len(),
            units = target,
            "exercise notes resolved"
        );

        self.assemble(
            notes,
            source,
            request.instrument,
            request.time_signature,
            request.measures,
            request.tempo,
            seed,
        )
    }

    /// Rebuild an exercise from previously exported JSON. See
    /// [`rebuild_from_json`].
    pub fn rebuild(
        &self,
        text: &str,
        time_signature: TimeSignature,
        instrument: Instrument,
        tempo: u16,
    ) -> Result<Exercise, EtudeError> {
        if tempo == 0 {
            return Err(EtudeError::InvalidRequest("tempo must be positive".to_string()));
        }
        let notes = lenient_intake(text)?;
        let total = notes.last().map(|n| n.cumulative_duration).unwrap_or(0);
        let measures = estimate_measures(total, &time_signature);
        let seed = self.config.seed.unwrap_or_else(rand::random);

        self.assemble(
            notes,
            ExerciseSource::Imported,
            instrument,
            time_signature,
            measures,
            tempo,
            seed,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        notes: Vec<CanonicalNoteEvent>,
        source: ExerciseSource,
        instrument: Instrument,
        time_signature: TimeSignature,
        measures: u32,
        tempo: u16,
        seed: u64,
    ) -> Result<Exercise, EtudeError> {
        let mut velocity = RandomVelocity::with_range(
            Pcg32::seed_from_u64(seed ^ VELOCITY_STREAM),
            self.config.velocity_low,
            self.config.velocity_high,
        );
        let events = sequence(&notes, self.config.ticks_per_unit(), &mut velocity)?;

        let settings = MidiSettings {
            ticks_per_beat: self.config.ticks_per_beat,
            tempo,
            time_signature,
            program: instrument.program(),
        };
        let midi = write_smf(&events, &settings)?;

        let audio = self.renderer.as_ref().and_then(|renderer| {
            let patch = InstrumentPatch::for_instrument(instrument, &self.config);
            match renderer.render(&midi, &patch) {
                Ok(audio) => Some(audio),
                Err(e) => {
                    warn!(error = %e, instrument = %instrument, "audio rendering failed");
                    None
                }
            }
        });

        let target_units = notes.last().map(|n| n.cumulative_duration).unwrap_or(0);
        Ok(Exercise {
            instrument,
            time_signature,
            measures,
            tempo,
            target_units,
            notes,
            events,
            midi,
            source,
            audio,
        })
    }
}

/// One-shot convenience over [`Orchestrator::generate`].
pub fn generate_exercise<G: Generator>(
    request: &ExerciseRequest,
    generator: G,
    config: Config,
) -> Result<Exercise, EtudeError> {
    Orchestrator::new(config, generator).generate(request)
}

/// Rebuild an exercise from displayed JSON.
///
/// Intake is lenient: objects with note/duration aliases and `[note, duration]`
/// pairs are both accepted, elements with invalid pitches or zero durations are
/// dropped, and cumulative totals are recomputed. Durations are kept as given;
/// the measure count is estimated as `max(1, round(total / units_per_measure))`.
pub fn rebuild_from_json(
    text: &str,
    time_signature: TimeSignature,
    instrument: Instrument,
    tempo: u16,
    config: Config,
) -> Result<Exercise, EtudeError> {
    Orchestrator::new(config, crate::prompt::NoGenerator).rebuild(text, time_signature, instrument, tempo)
}

/// Quantize one source's raw notes, or None when the source is unusable.
fn fit(
    source: ExerciseSource,
    raw: Vec<RawNoteEvent>,
    target: u32,
) -> Option<(ExerciseSource, Vec<CanonicalNoteEvent>)> {
    let mut entries: Vec<(String, u32)> = raw.into_iter().map(|r| (r.note, r.duration)).collect();
    if entries.len() > target as usize {
        warn!(
            source = ?source,
            notes = entries.len(),
            target,
            "more notes than units, truncating"
        );
        entries.truncate(target as usize);
    }

    match quantize(entries, target).and_then(accumulate) {
        Ok(notes) => Some((source, notes)),
        Err(e) => {
            warn!(source = ?source, error = %e, "note source rejected");
            None
        }
    }
}

fn lenient_intake(text: &str) -> Result<Vec<CanonicalNoteEvent>, EtudeError> {
    let mut entries = Vec::new();
    for (i, intake) in parse_intake(text)?.into_iter().enumerate() {
        let Some(raw) = intake.normalize() else {
            warn!(index = i, "dropping element without note and duration");
            continue;
        };
        if raw.duration == 0 {
            warn!(index = i, note = %raw.note, "dropping zero-length note");
            continue;
        }
        if let Err(e) = Pitch::parse(&raw.note) {
            warn!(index = i, error = %e, "dropping element with invalid pitch");
            continue;
        }
        entries.push((raw.note, raw.duration));
    }

    if entries.is_empty() {
        return Err(EtudeError::ParseFailure("no valid note entries".to_string()));
    }
    accumulate(entries)
}

fn estimate_measures(total_units: u32, time_signature: &TimeSignature) -> u32 {
    let per_measure = time_signature.units_per_measure().max(1) as u64;
    (round_half_even(total_units as u64, per_measure) as u32).max(1)
}
