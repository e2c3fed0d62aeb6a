//! # Generator Prompt
//!
//! Builds the instruction sent to the external note generator and defines the
//! [`Generator`] seam the orchestrator calls through.
//!
//! Every prompt states the exact unit total the exercise must fill. Generators
//! are expected to miss it anyway; the quantizer fixes the total afterwards, the
//! prompt only keeps the raw output close.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::json;

use crate::error::EtudeError;
use crate::types::{ExerciseRequest, Level};

/// Response length cap requested from the generator.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

const OUTPUT_SHAPE: &str = "Output ONLY a JSON array of objects with the following structure: \
     [{'note': string, 'duration': integer, 'cumulative_duration': integer}]";

/// A fully rendered request for the note generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratorPrompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl GeneratorPrompt {
    /// Chat-completions request body for `model`.
    pub fn chat_request(&self, model: &str) -> serde_json::Value {
        json!({
            "model": model,
            "messages": [
                { "role": "system", "content": self.system },
                { "role": "user", "content": self.user },
            ],
            "temperature": self.temperature,
            "top_p": self.top_p,
            "max_tokens": self.max_tokens,
        })
    }
}

/// Source of raw generator text.
///
/// Implementations wrap whatever produces note lists: a hosted language model,
/// a recorded response, a test double. Errors are not fatal to the pipeline;
/// the orchestrator moves on to its fallbacks.
pub trait Generator {
    fn generate(&mut self, prompt: &GeneratorPrompt) -> Result<String, EtudeError>;
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn generate(&mut self, prompt: &GeneratorPrompt) -> Result<String, EtudeError> {
        (**self).generate(prompt)
    }
}

/// A generator that is never available. Forces the fallback chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGenerator;

impl Generator for NoGenerator {
    fn generate(&mut self, _prompt: &GeneratorPrompt) -> Result<String, EtudeError> {
        Err(EtudeError::GeneratorUnavailable(
            "no generator configured".to_string(),
        ))
    }
}

/// Replays pre-recorded generator output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedGenerator(pub String);

impl CannedGenerator {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl Generator for CannedGenerator {
    fn generate(&mut self, _prompt: &GeneratorPrompt) -> Result<String, EtudeError> {
        Ok(self.0.clone())
    }
}

/// Style adjectives offered per level.
pub fn styles(level: Level) -> &'static [&'static str] {
    match level {
        Level::Beginner => &["simple", "legato", "stepwise"],
        Level::Intermediate => &["jazzy", "bluesy", "march-like", "syncopated"],
        Level::Advanced => &["technical", "chromatic", "fast arpeggios", "wide intervals"],
    }
}

/// Technique phrases offered per level.
pub fn techniques(level: Level) -> &'static [&'static str] {
    match level {
        Level::Beginner => &["with long tones", "with simple rhythms", "focusing on tone"],
        Level::Intermediate => &["with slurs", "with accents", "using triplets"],
        Level::Advanced => &["with double tonguing", "with extreme registers", "complex rhythms"],
    }
}

/// Sampling temperature for a level.
pub fn temperature(level: Level) -> f32 {
    match level {
        Level::Advanced => 0.7,
        _ => 0.5,
    }
}

/// The sentence pinning the exact unit total.
pub fn duration_constraint(target_units: u32) -> String {
    format!(
        "Sum of all durations MUST BE EXACTLY {} units (8th notes). \
         Each integer duration represents an 8th note (1=8th, 2=quarter, 4=half, 8=whole). \
         If it doesn't match, the exercise is invalid.",
        target_units
    )
}

/// Build the generator prompt for `request`.
///
/// A non-blank `custom_prompt` is used verbatim with the duration constraint and
/// output shape appended. Otherwise the prompt is assembled from the request
/// parameters with a style and technique drawn from `rng`.
///
/// # Errors
/// [`EtudeError::InvalidRequest`] when the unit total does not fit in a `u32`.
///
/// # Examples
/// ```
/// use etude::prompt::build_prompt;
/// use etude::ExerciseRequest;
/// use rand::SeedableRng;
///
/// let mut rng = rand_pcg::Pcg32::seed_from_u64(1);
/// let prompt = build_prompt(&ExerciseRequest::default(), &mut rng).unwrap();
/// assert!(prompt.user.contains("EXACTLY 32 units"));
/// ```
pub fn build_prompt<R: Rng + ?Sized>(
    request: &ExerciseRequest,
    rng: &mut R,
) -> Result<GeneratorPrompt, EtudeError> {
    let instrument = request.instrument.name().to_lowercase();
    let constraint = duration_constraint(request.target_units()?);

    let system = format!(
        "You are an expert music teacher specializing in {}. \
         Create customized exercises using INTEGER durations representing 8th notes.",
        instrument
    );

    let user = match request.custom_prompt.as_deref().map(str::trim) {
        Some(custom) if !custom.is_empty() => {
            format!("{} {} {}", custom, constraint, OUTPUT_SHAPE)
        }
        _ => {
            let style = styles(request.level).choose(rng).copied().unwrap_or("simple");
            let technique = techniques(request.level)
                .choose(rng)
                .copied()
                .unwrap_or("with slurs");
            format!(
                "Create a {} {} exercise in {} with {} time signature {} for a {} player. {} {} \
                 Use standard note names (e.g., \"Bb4\", \"F#5\"). Monophonic only. \
                 Durations: 1=8th, 2=quarter, 4=half, 8=whole. \
                 Sum must be exactly as specified. ONLY output the JSON array. No prose.",
                style,
                instrument,
                request.key,
                request.time_signature,
                technique,
                request.level.name().to_lowercase(),
                constraint,
                OUTPUT_SHAPE,
            )
        }
    };

    Ok(GeneratorPrompt {
        system,
        user,
        temperature: temperature(request.level),
        top_p: 0.95,
        max_tokens: DEFAULT_MAX_TOKENS,
    })
}
