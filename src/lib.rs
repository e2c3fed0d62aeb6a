pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod fallback;
pub mod midi;
pub mod normalize;
pub mod pitch;
pub mod prompt;
pub mod quantize;
pub mod render;
pub mod sequencer;
pub mod types;

pub use api::{
    generate_exercise, parse_canonical_json, rebuild_from_json, Exercise, ExerciseSource, Orchestrator,
};
pub use chat::{ChatGenerator, ChatTransport, CommandTransport};
pub use config::Config;
pub use error::*;
pub use normalize::normalize_output;
pub use pitch::Pitch;
pub use prompt::{build_prompt, CannedGenerator, Generator, GeneratorPrompt, NoGenerator};
pub use quantize::quantize;
pub use render::{AudioRenderer, InstrumentPatch, RenderedAudio};
pub use sequencer::{sequence, TimedEvent};
pub use types::*;
