use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use etude::{
    CannedGenerator, ChatGenerator, CommandTransport, Config, EtudeError, ExerciseRequest, Generator,
    Instrument, Level, NoGenerator, Orchestrator, TimeSignature,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "etude", version, about = "Generate duration-exact practice exercises as MIDI")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline and print the canonical note list
    ///
    /// Notes come from --generator-output when given, otherwise from the
    /// configured generator command. Without either, fallback exercises are used.
    Generate {
        #[command(flatten)]
        request: RequestArgs,

        /// Recorded generator output to use ("-" reads stdin)
        #[arg(long)]
        generator_output: Option<String>,

        /// Seed for every random choice (overrides the config seed)
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        json_out: Option<PathBuf>,

        #[arg(long)]
        midi_out: Option<PathBuf>,
    },
    /// Print the chat request that would be sent to the generator
    Prompt {
        #[command(flatten)]
        request: RequestArgs,

        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Rebuild the MIDI file from an edited note list
    Rebuild {
        /// JSON note list ("-" reads stdin)
        #[arg(long)]
        input: String,

        #[arg(long, default_value = "4/4")]
        time_signature: String,

        #[arg(long, default_value = "Trumpet")]
        instrument: String,

        #[arg(long)]
        tempo: Option<u16>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        midi_out: PathBuf,
    },
}

#[derive(Args)]
struct RequestArgs {
    #[arg(long, default_value = "Trumpet")]
    instrument: String,

    #[arg(long, default_value = "Intermediate")]
    level: String,

    #[arg(long, default_value = "C Major")]
    key: String,

    #[arg(long, default_value = "4/4")]
    time_signature: String,

    #[arg(long, default_value_t = 4)]
    measures: u32,

    /// Quarter-note BPM (defaults to the configured tempo)
    #[arg(long)]
    tempo: Option<u16>,

    /// Free-form instruction replacing the parameter-driven prompt
    #[arg(long)]
    prompt: Option<String>,
}

impl RequestArgs {
    fn to_request(&self, config: &Config) -> Result<ExerciseRequest, EtudeError> {
        let level = Level::from_str(&self.level)
            .ok_or_else(|| EtudeError::InvalidRequest(format!("Unknown level: {}", self.level)))?;
        Ok(ExerciseRequest {
            instrument: parse_instrument(&self.instrument),
            level,
            key: self.key.clone(),
            time_signature: TimeSignature::parse(&self.time_signature)?,
            measures: self.measures,
            tempo: self.tempo.unwrap_or(config.tempo),
            custom_prompt: self.prompt.clone(),
        })
    }
}

fn parse_instrument(name: &str) -> Instrument {
    Instrument::from_str(name).unwrap_or_else(|| {
        tracing::warn!(instrument = name, "unknown instrument, using the default program");
        Instrument::default()
    })
}

fn read_input(source: &str) -> Result<String, EtudeError> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(fs::read_to_string(source)?)
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, EtudeError> {
    match path {
        Some(path) => Config::from_path(path),
        None => Ok(Config::default()),
    }
}

/// The generator described by the config, or [`NoGenerator`] when no command is
/// configured or the API key is missing.
fn configured_generator(config: &Config) -> Box<dyn Generator> {
    let Some(transport) = CommandTransport::from_command(&config.generator.command) else {
        return Box::new(NoGenerator);
    };
    match ChatGenerator::from_config(&config.generator, transport) {
        Ok(generator) => Box::new(generator),
        Err(e) => {
            tracing::warn!(error = %e, "generator unavailable, using fallback exercises");
            Box::new(NoGenerator)
        }
    }
}

fn run(cli: Cli) -> Result<(), EtudeError> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Generate {
            request,
            generator_output,
            seed,
            json_out,
            midi_out,
        } => {
            if seed.is_some() {
                config.seed = seed;
            }
            let request = request.to_request(&config)?;
            let generator: Box<dyn Generator> = match generator_output {
                Some(source) => Box::new(CannedGenerator::new(read_input(&source)?)),
                None => configured_generator(&config),
            };
            let exercise = Orchestrator::new(config, generator).generate(&request)?;

            let json = exercise.to_json()?;
            if let Some(path) = &json_out {
                exercise.write_json(path)?;
            }
            if let Some(path) = &midi_out {
                exercise.write_midi(path)?;
            }
            eprintln!(
                "{} notes, {} units, {:.1}s ({:?})",
                exercise.notes.len(),
                exercise.target_units,
                exercise.duration_seconds(),
                exercise.source
            );
            println!("{}", json);
        }
        Command::Prompt { request, seed } => {
            let request = request.to_request(&config)?;
            let orchestrator = Orchestrator::new(config, NoGenerator);
            let prompt = orchestrator.prompt(&request, seed)?;
            let generator = &orchestrator.config().generator;
            let request = json!({
                "endpoint": generator.endpoint,
                "body": prompt.chat_request(&generator.model),
            });
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        Command::Rebuild {
            input,
            time_signature,
            instrument,
            tempo,
            seed,
            midi_out,
        } => {
            if seed.is_some() {
                config.seed = seed;
            }
            let text = read_input(&input)?;
            let tempo = tempo.unwrap_or(config.tempo);
            let time_signature = TimeSignature::parse(&time_signature)?;
            let exercise = Orchestrator::new(config, NoGenerator).rebuild(
                &text,
                time_signature,
                parse_instrument(&instrument),
                tempo,
            )?;
            exercise.write_midi(&midi_out)?;
            eprintln!(
                "Rebuilt {} notes ({} measures, {:.1}s) to {}",
                exercise.notes.len(),
                exercise.measures,
                exercise.duration_seconds(),
                midi_out.display()
            );
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
