//! Integration tests for the exercise pipeline
//!
//! Tests full generation from generator text (or its absence) through the
//! canonical note list, the event stream and the written MIDI file.

use etude::midi::inspect_smf;
use etude::sequencer::total_ticks;
use etude::{
    generate_exercise, parse_canonical_json, rebuild_from_json, CannedGenerator, Config, EtudeError,
    ExerciseRequest, ExerciseSource, Generator, GeneratorPrompt, Instrument, Level, NoGenerator,
    Orchestrator, TimeSignature,
};
use pretty_assertions::assert_eq;

fn config() -> Config {
    Config {
        seed: Some(2024),
        ..Config::default()
    }
}

fn request(time_signature: &str, measures: u32) -> ExerciseRequest {
    ExerciseRequest {
        time_signature: TimeSignature::parse(time_signature).unwrap(),
        measures,
        ..ExerciseRequest::default()
    }
}

/// Fails the first call, then replays text. Records every prompt it saw.
struct FlakyGenerator {
    calls: usize,
    prompts: Vec<GeneratorPrompt>,
}

impl Generator for FlakyGenerator {
    fn generate(&mut self, prompt: &GeneratorPrompt) -> Result<String, EtudeError> {
        self.calls += 1;
        self.prompts.push(prompt.clone());
        if self.calls == 1 {
            Err(EtudeError::GeneratorUnavailable("timeout".to_string()))
        } else {
            Ok(r#"[{"note": "A4", "duration": 4}]"#.to_string())
        }
    }
}

#[test]
fn test_four_four_four_measures_is_thirty_two_units() {
    let text = r#"Here is your exercise:
[{"note": "C4", "duration": 2, "cumulative_duration": 2},
 {"note": "E4", "duration": 2, "cumulative_duration": 4},
 {"note": "G4", "duration": 4, "cumulative_duration": 8},
 {"note": "Rest", "duration": 2, "cumulative_duration": 10},
 {"note": "C5", "duration": 6, "cumulative_duration": 16}]
Enjoy!"#;
    let exercise = generate_exercise(&request("4/4", 4), CannedGenerator::new(text), config()).unwrap();

    assert_eq!(exercise.source, ExerciseSource::Generator);
    assert_eq!(exercise.notes.last().unwrap().cumulative_duration, 32);
    let durations: Vec<u32> = exercise.notes.iter().map(|n| n.duration).collect();
    assert_eq!(durations, vec![4, 4, 8, 4, 12]);

    let summary = inspect_smf(&exercise.midi).unwrap();
    assert_eq!(summary.total_ticks, 32 * 240);
    assert_eq!(summary.total_ticks, total_ticks(&exercise.events));
    assert_eq!(summary.note_count, 4);
    assert_eq!(summary.program, Some(56));
    assert_eq!(summary.time_signature, Some((4, 4)));
}

#[test]
fn test_every_time_signature_fills_its_measures() {
    for (ts, measures, units) in [("4/4", 8, 64), ("3/4", 4, 24), ("6/8", 4, 24), ("2/2", 2, 16), ("5/4", 1, 10)] {
        let exercise = generate_exercise(&request(ts, measures), NoGenerator, config()).unwrap();
        assert_eq!(exercise.notes.last().unwrap().cumulative_duration, units, "{}", ts);
        assert_eq!(inspect_smf(&exercise.midi).unwrap().total_ticks, units as u64 * 240, "{}", ts);
    }
}

#[test]
fn test_fallback_chain_levels() {
    let from_text = generate_exercise(
        &request("4/4", 4),
        CannedGenerator::new("[{note: D4, duration: 8}]"),
        config(),
    )
    .unwrap();
    assert_eq!(from_text.source, ExerciseSource::Generator);

    let unparseable = generate_exercise(&request("4/4", 4), CannedGenerator::new("{}"), config()).unwrap();
    assert_eq!(unparseable.source, ExerciseSource::Synthetic);

    let unavailable = generate_exercise(&request("4/4", 4), NoGenerator, config()).unwrap();
    assert_eq!(unavailable.source, ExerciseSource::Synthetic);
}

#[test]
fn test_generator_error_is_not_fatal() {
    let generator = FlakyGenerator { calls: 0, prompts: Vec::new() };
    let mut orchestrator = Orchestrator::new(config(), generator);

    let first = orchestrator.generate(&request("4/4", 4)).unwrap();
    assert_eq!(first.source, ExerciseSource::Synthetic);

    let second = orchestrator.generate(&request("4/4", 4)).unwrap();
    assert_eq!(second.source, ExerciseSource::Generator);
    assert_eq!(second.notes.len(), 1);
    assert_eq!(second.notes[0].duration, 32);
}

#[test]
fn test_prompt_carries_request() {
    let generator = FlakyGenerator { calls: 0, prompts: Vec::new() };
    let mut orchestrator = Orchestrator::new(config(), generator);
    let request = ExerciseRequest {
        instrument: Instrument::Violin,
        level: Level::Advanced,
        key: "E Minor".to_string(),
        ..request("3/4", 8)
    };
    let prompt = orchestrator.prompt(&request, 5).unwrap();
    assert!(prompt.user.contains("EXACTLY 48 units"));
    assert!(prompt.user.contains("violin exercise in E Minor"));
    assert_eq!(prompt.temperature, 0.7);

    orchestrator.generate(&request).unwrap();
}

#[test]
fn test_synthetic_fallback_uses_key_pool() {
    let request = ExerciseRequest {
        key: "Bb Major".to_string(),
        ..request("4/4", 4)
    };
    let exercise = generate_exercise(&request, NoGenerator, config()).unwrap();
    let pool = etude::fallback::key_notes("Bb Major");
    assert!(exercise.notes.iter().all(|n| pool.contains(&n.note.as_str())));
}

#[test]
fn test_json_file_round_trip_and_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("exercise.json");
    let midi_path = dir.path().join("exercise.mid");

    let exercise = generate_exercise(&request("3/4", 4), NoGenerator, config()).unwrap();
    exercise.write_json(&json_path).unwrap();
    exercise.write_midi(&midi_path).unwrap();

    let text = std::fs::read_to_string(&json_path).unwrap();
    assert_eq!(parse_canonical_json(&text).unwrap(), exercise.notes);

    let rebuilt = rebuild_from_json(
        &text,
        exercise.time_signature,
        exercise.instrument,
        exercise.tempo,
        config(),
    )
    .unwrap();
    assert_eq!(rebuilt.source, ExerciseSource::Imported);
    assert_eq!(rebuilt.notes, exercise.notes);
    assert_eq!(rebuilt.measures, 4);
    assert_eq!(rebuilt.midi, std::fs::read(&midi_path).unwrap());
}

#[test]
fn test_rebuild_of_hand_edited_pairs() {
    let text = r#"[["C4", 2], ["D4", 2], ["rest", 4], ["E4", 8]]"#;
    let exercise = rebuild_from_json(text, TimeSignature::default(), Instrument::Piano, 60, config()).unwrap();
    assert_eq!(exercise.target_units, 16);
    assert_eq!(exercise.measures, 2);
    assert_eq!(inspect_smf(&exercise.midi).unwrap().program, Some(0));
}

#[test]
fn test_configured_resolution_is_used() {
    let config = Config {
        ticks_per_beat: 960,
        ..config()
    };
    let exercise = generate_exercise(&request("4/4", 1), NoGenerator, config).unwrap();
    let summary = inspect_smf(&exercise.midi).unwrap();
    assert_eq!(summary.ticks_per_beat, Some(960));
    assert_eq!(summary.total_ticks, 8 * 480);
}

#[test]
fn test_oversized_requests_are_rejected() {
    let result = generate_exercise(&request("8/1", 600_000_000), NoGenerator, config());
    assert!(matches!(result, Err(EtudeError::InvalidRequest(_))));

    let orchestrator = Orchestrator::new(config(), NoGenerator);
    assert!(matches!(
        orchestrator.prompt(&request("8/1", 600_000_000), 0),
        Err(EtudeError::InvalidRequest(_))
    ));
}

#[test]
fn test_oversized_imports_are_rejected() {
    let text = r#"[{"note": "C4", "duration": 4000000000}, {"note": "D4", "duration": 4000000000}]"#;
    assert!(matches!(
        rebuild_from_json(text, TimeSignature::default(), Instrument::Piano, 60, config()),
        Err(EtudeError::InvalidSequence { .. })
    ));

    let canonical = r#"[{"note": "C4", "duration": 4000000000, "cumulative_duration": 4000000000},
                        {"note": "D4", "duration": 4000000000, "cumulative_duration": 3705032704}]"#;
    assert!(matches!(parse_canonical_json(canonical), Err(EtudeError::InvalidSequence { .. })));
}
