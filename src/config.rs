//! # Configuration
//!
//! Runtime settings loaded from a YAML file with kebab-case keys:
//!
//! ```yaml
//! tempo: 60
//! ticks-per-beat: 480
//! velocity: 60-100
//! seed: 42
//! generator:
//!   endpoint: https://api.mistral.ai/v1/chat/completions
//!   model: mistral-medium
//!   api-key-env: MISTRAL_API_KEY
//!   max-tokens: 1000
//!   command: [chat-proxy, --json]
//! soundfonts:
//!   Trumpet: soundfonts/Trumpet.sf2
//! ```
//!
//! Every key is optional. Credentials never appear in the file itself: the
//! generator section names the environment variable holding the API key, and
//! `command` names the program that carries requests to the endpoint (see
//! `chat`). Without a command no generator is contacted.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::EtudeError;
use crate::prompt::DEFAULT_MAX_TOKENS;
use crate::sequencer::{DEFAULT_VELOCITY_HIGH, DEFAULT_VELOCITY_LOW, TICKS_PER_BEAT};
use crate::types::Instrument;

/// Raw configuration for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawConfig {
    pub tempo: Option<u16>,
    pub ticks_per_beat: Option<u16>,
    pub velocity: Option<RawVelocity>,
    pub seed: Option<u64>,
    pub generator: Option<RawGeneratorConfig>,
    #[serde(default)]
    pub soundfonts: BTreeMap<String, PathBuf>,
}

/// Velocity as written: a single value (`80`) or an inclusive range (`60-100`)
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RawVelocity {
    Single(u8),
    Range(String),
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawGeneratorConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub max_tokens: Option<u32>,
    pub command: Option<Vec<String>>,
}

/// External generator connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub max_tokens: u32,
    /// Transport program and its arguments; empty when unset
    pub command: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mistral.ai/v1/chat/completions".to_string(),
            model: "mistral-medium".to_string(),
            api_key_env: "MISTRAL_API_KEY".to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            command: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Default quarter-note BPM for requests that do not set one
    pub tempo: u16,
    pub ticks_per_beat: u16,
    pub velocity_low: u8,
    pub velocity_high: u8,
    /// Fixed seed for reproducible output; None draws fresh entropy
    pub seed: Option<u64>,
    pub generator: GeneratorConfig,
    pub soundfonts: HashMap<Instrument, PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tempo: 60,
            ticks_per_beat: TICKS_PER_BEAT,
            velocity_low: DEFAULT_VELOCITY_LOW,
            velocity_high: DEFAULT_VELOCITY_HIGH,
            seed: None,
            generator: GeneratorConfig::default(),
            soundfonts: HashMap::new(),
        }
    }
}

impl Config {
    /// Ticks in one eighth-note unit.
    pub fn ticks_per_unit(&self) -> u32 {
        self.ticks_per_beat as u32 / 2
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, EtudeError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| EtudeError::Config(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Load configuration from a file. Relative soundfont paths are resolved
    /// against the file's directory.
    pub fn from_path(path: &Path) -> Result<Self, EtudeError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        if let Some(dir) = path.parent() {
            for soundfont in config.soundfonts.values_mut() {
                if soundfont.is_relative() {
                    *soundfont = dir.join(&*soundfont);
                }
            }
        }
        Ok(config)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, EtudeError> {
        let defaults = Self::default();

        let tempo = raw.tempo.unwrap_or(defaults.tempo);
        if tempo == 0 {
            return Err(EtudeError::Config("tempo must be positive".to_string()));
        }

        let ticks_per_beat = raw.ticks_per_beat.unwrap_or(defaults.ticks_per_beat);
        if ticks_per_beat == 0 || ticks_per_beat % 2 != 0 || ticks_per_beat > 0x7FFF {
            return Err(EtudeError::Config(format!(
                "ticks-per-beat must be even and between 2 and 32766, got {}",
                ticks_per_beat
            )));
        }

        let (velocity_low, velocity_high) = match &raw.velocity {
            Some(RawVelocity::Single(value)) => parse_velocity_range(&value.to_string())?,
            Some(RawVelocity::Range(text)) => parse_velocity_range(text)?,
            None => (defaults.velocity_low, defaults.velocity_high),
        };

        let generator = match raw.generator {
            Some(g) => GeneratorConfig {
                endpoint: g.endpoint.unwrap_or(defaults.generator.endpoint),
                model: g.model.unwrap_or(defaults.generator.model),
                api_key_env: g.api_key_env.unwrap_or(defaults.generator.api_key_env),
                max_tokens: g.max_tokens.unwrap_or(defaults.generator.max_tokens),
                command: g.command.unwrap_or_default(),
            },
            None => defaults.generator,
        };

        let mut soundfonts = HashMap::new();
        for (name, path) in raw.soundfonts {
            let instrument = Instrument::from_str(&name)
                .ok_or_else(|| EtudeError::Config(format!("Unknown instrument in soundfonts: {}", name)))?;
            soundfonts.insert(instrument, path);
        }

        Ok(Config {
            tempo,
            ticks_per_beat,
            velocity_low,
            velocity_high,
            seed: raw.seed,
            generator,
            soundfonts,
        })
    }
}

/// Parse "LOW-HIGH" or a single value into an inclusive velocity range.
fn parse_velocity_range(text: &str) -> Result<(u8, u8), EtudeError> {
    let invalid = || EtudeError::Config(format!("Invalid velocity range: {}", text));
    let parse = |s: &str| -> Result<u8, EtudeError> {
        let value: u8 = s.trim().parse().map_err(|_| invalid())?;
        if (1..=127).contains(&value) {
            Ok(value)
        } else {
            Err(invalid())
        }
    };

    let (low, high) = match text.split_once('-') {
        Some((low, high)) => (parse(low)?, parse(high)?),
        None => {
            let value = parse(text)?;
            (value, value)
        }
    };
    if low > high {
        return Err(invalid());
    }
    Ok((low, high))
}
