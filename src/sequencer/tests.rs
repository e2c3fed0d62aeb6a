use super::*;
use crate::error::EtudeError;
use crate::types::accumulate;
use rand::SeedableRng;
use rand_pcg::Pcg32;

fn notes(pairs: &[(&str, u32)]) -> Vec<crate::types::CanonicalNoteEvent> {
    accumulate(pairs.iter().map(|(n, d)| (n.to_string(), *d)).collect()).unwrap()
}

#[test]
fn test_sequence_basic_notes() {
    let input = notes(&[("C4", 2), ("E4", 1), ("G4", 1)]);
    let events = sequence(&input, TICKS_PER_UNIT, &mut FixedVelocity(80)).unwrap();

    assert_eq!(events.len(), 6);
    assert_eq!(events[0], TimedEvent::NoteOn { pitch: 60, velocity: 80, delta: 0 });
    assert_eq!(events[1], TimedEvent::NoteOff { pitch: 60, velocity: 80, delta: 480 });
    assert_eq!(events[2], TimedEvent::NoteOn { pitch: 64, velocity: 80, delta: 0 });
    assert_eq!(events[3], TimedEvent::NoteOff { pitch: 64, velocity: 80, delta: 240 });
    assert_eq!(events[5], TimedEvent::NoteOff { pitch: 67, velocity: 80, delta: 240 });
}

#[test]
fn test_consecutive_rests_coalesce() {
    let input = notes(&[("Rest", 2), ("r", 3), ("C4", 4)]);
    let events = sequence(&input, TICKS_PER_UNIT, &mut FixedVelocity(64)).unwrap();

    assert_eq!(
        events,
        vec![
            TimedEvent::RestAdvance { delta: 5 * 240 },
            TimedEvent::NoteOn { pitch: 60, velocity: 64, delta: 0 },
            TimedEvent::NoteOff { pitch: 60, velocity: 64, delta: 4 * 240 },
        ]
    );
}

#[test]
fn test_trailing_rest_is_emitted() {
    let input = notes(&[("C4", 2), ("Rest", 1), ("pause", 1)]);
    let events = sequence(&input, TICKS_PER_UNIT, &mut FixedVelocity(64)).unwrap();

    assert_eq!(events.len(), 3);
    assert_eq!(events[2], TimedEvent::RestAdvance { delta: 480 });
}

#[test]
fn test_all_rests() {
    let input = notes(&[("Rest", 4), ("Rest", 4)]);
    let events = sequence(&input, TICKS_PER_UNIT, &mut FixedVelocity(64)).unwrap();
    assert_eq!(events, vec![TimedEvent::RestAdvance { delta: 1920 }]);
}

#[test]
fn test_rests_between_notes_split_at_pitched_notes() {
    let input = notes(&[("C4", 1), ("Rest", 1), ("D4", 1), ("Rest", 2), ("Rest", 1), ("E4", 1)]);
    let events = sequence(&input, TICKS_PER_UNIT, &mut FixedVelocity(64)).unwrap();

    let rests: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            TimedEvent::RestAdvance { delta } => Some(*delta),
            _ => None,
        })
        .collect();
    assert_eq!(rests, vec![240, 720]);
}

#[test]
fn test_delta_sum_matches_durations() {
    let input = notes(&[("Rest", 1), ("C4", 3), ("D4", 2), ("Rest", 2), ("E4", 6), ("Rest", 2)]);
    let events = sequence(&input, TICKS_PER_UNIT, &mut FixedVelocity(64)).unwrap();

    let expected: u64 = input.iter().map(|n| n.duration as u64 * TICKS_PER_UNIT as u64).sum();
    assert_eq!(total_ticks(&events), expected);
    assert_eq!(total_ticks(&events), 16 * 240);
}

#[test]
fn test_note_on_always_has_zero_delta() {
    let input = notes(&[("Rest", 3), ("C4", 1), ("Rest", 1), ("D4", 1)]);
    let events = sequence(&input, TICKS_PER_UNIT, &mut FixedVelocity(64)).unwrap();
    for event in &events {
        if let TimedEvent::NoteOn { delta, .. } = event {
            assert_eq!(*delta, 0);
        }
    }
}

#[test]
fn test_minimum_one_tick() {
    let input = notes(&[("C4", 2)]);
    let events = sequence(&input, 0, &mut FixedVelocity(64)).unwrap();
    assert_eq!(events[1].delta(), 1);
}

#[test]
fn test_invalid_pitch_propagates() {
    let input = notes(&[("C4", 2), ("H2", 2)]);
    let result = sequence(&input, TICKS_PER_UNIT, &mut FixedVelocity(64));
    assert!(matches!(result, Err(EtudeError::InvalidPitch(p)) if p == "H2"));
}

#[test]
fn test_random_velocity_in_default_range() {
    let input = notes(&[("C4", 1); 64]);
    let mut velocity = RandomVelocity::new(Pcg32::seed_from_u64(11));
    let events = sequence(&input, TICKS_PER_UNIT, &mut velocity).unwrap();

    for event in &events {
        if let TimedEvent::NoteOn { velocity, .. } = event {
            assert!((DEFAULT_VELOCITY_LOW..=DEFAULT_VELOCITY_HIGH).contains(velocity));
        }
    }
}

#[test]
fn test_note_off_repeats_note_on_velocity() {
    let input = notes(&[("C4", 1), ("D4", 1), ("E4", 1)]);
    let mut velocity = RandomVelocity::new(Pcg32::seed_from_u64(5));
    let events = sequence(&input, TICKS_PER_UNIT, &mut velocity).unwrap();

    for pair in events.chunks(2) {
        match (pair[0], pair[1]) {
            (TimedEvent::NoteOn { velocity: on, .. }, TimedEvent::NoteOff { velocity: off, .. }) => {
                assert_eq!(on, off)
            }
            other => panic!("unexpected pair {:?}", other),
        }
    }
}

#[test]
fn test_seeded_velocity_is_reproducible() {
    let input = notes(&[("C4", 1), ("D4", 1), ("E4", 1), ("F4", 1)]);
    let a = sequence(&input, TICKS_PER_UNIT, &mut RandomVelocity::new(Pcg32::seed_from_u64(9))).unwrap();
    let b = sequence(&input, TICKS_PER_UNIT, &mut RandomVelocity::new(Pcg32::seed_from_u64(9))).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_velocity_range_is_ordered_and_clamped() {
    let mut velocity = RandomVelocity::with_range(Pcg32::seed_from_u64(1), 200, 90);
    for _ in 0..32 {
        let v = velocity.next_velocity();
        assert!((90..=127).contains(&v));
    }
}

#[test]
fn test_events_serialize_tagged() {
    let json = serde_json::to_string(&TimedEvent::RestAdvance { delta: 240 }).unwrap();
    assert_eq!(json, r#"{"type":"rest_advance","delta":240}"#);
}

#[test]
fn test_note_longer_than_tick_range_is_an_error() {
    let input = notes(&[("C4", 2), ("D4", u32::MAX / 2)]);
    let result = sequence(&input, TICKS_PER_UNIT, &mut FixedVelocity(64));
    assert!(matches!(result, Err(EtudeError::InvalidSequence { index: 1, .. })));
}

#[test]
fn test_rest_run_longer_than_tick_range_is_an_error() {
    // each rest fits on its own, the coalesced run does not
    let input = notes(&[("Rest", 10_000_000), ("Rest", 10_000_000), ("C4", 1)]);
    let result = sequence(&input, TICKS_PER_UNIT, &mut FixedVelocity(64));
    assert!(matches!(result, Err(EtudeError::InvalidSequence { index: 1, .. })));
}
