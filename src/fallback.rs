//! # Fallback Exercises
//!
//! Deterministic note sources used when the external generator's output cannot be
//! recovered. Both always produce a non-empty list. The synthetic exercise sums
//! exactly to any positive target; the scale does so for targets of eight units or
//! more and otherwise leaves the final fit to the quantizer.
//!
//! - [`synthetic_exercise`] - random walk over the key's note pool with a
//!   time-signature motif, driven by a seeded RNG
//! - [`scale_exercise`] - a fixed C major scale, the last resort

use rand::seq::SliceRandom;
use rand::Rng;

use crate::types::{ExerciseRequest, RawNoteEvent, TimeSignature};

/// Notes of the minimal fixed scale pattern.
pub const SCALE_NOTES: [&str; 8] = ["C4", "D4", "E4", "F4", "G4", "A4", "B4", "C5"];

const TRIPLE_MOTIF: [u32; 5] = [2, 1, 2, 1, 2];
const DUPLE_MOTIF: [u32; 6] = [2, 2, 1, 1, 2, 2];

/// Note pool for a key. Unknown keys use the C Major pool.
pub fn key_notes(key: &str) -> &'static [&'static str] {
    match key.trim() {
        "G Major" => &["G4", "A4", "B4", "D5"],
        "D Major" => &["D4", "E4", "F#4", "A4"],
        "F Major" => &["F4", "G4", "A4", "C5"],
        "Bb Major" => &["Bb3", "C4", "D4", "F4"],
        "A Minor" => &["A3", "B3", "C4", "D4", "E4", "G4"],
        "E Minor" => &["E3", "F#3", "G3", "A3", "B3", "D4"],
        _ => &["C4", "D4", "E4", "G4"],
    }
}

/// Rhythm motif (in units) for a time signature: waltz-like for three beats,
/// straight for everything else.
pub fn rhythm_motif(time_signature: &TimeSignature) -> &'static [u32] {
    if time_signature.numerator == 3 {
        &TRIPLE_MOTIF
    } else {
        &DUPLE_MOTIF
    }
}

/// Generate a synthetic exercise of `target` units for `request`.
///
/// Notes and durations are drawn from the key pool and the rhythm motif until the
/// target is reached; the final duration is clipped so the total is exact.
pub fn synthetic_exercise<R: Rng + ?Sized>(
    request: &ExerciseRequest,
    target: u32,
    rng: &mut R,
) -> Vec<RawNoteEvent> {
    let pool = key_notes(&request.key);
    let motif = rhythm_motif(&request.time_signature);

    let mut notes = Vec::new();
    let mut total = 0;
    while total < target {
        let note = pool.choose(rng).copied().unwrap_or(SCALE_NOTES[0]);
        let mut duration = motif.choose(rng).copied().unwrap_or(2);
        if total + duration > target {
            duration = target - total;
        }
        total += duration;
        notes.push(RawNoteEvent::new(note, duration));
    }
    notes
}

/// The minimal fixed scale pattern: eight notes of `max(1, target / 8)` units,
/// the last one stretched or shortened to hit the target.
pub fn scale_exercise(target_units: u32) -> Vec<RawNoteEvent> {
    let each = (target_units / SCALE_NOTES.len() as u32).max(1);
    let mut notes: Vec<RawNoteEvent> = SCALE_NOTES
        .iter()
        .map(|note| RawNoteEvent::new(*note, each))
        .collect();

    let total = each * SCALE_NOTES.len() as u32;
    if let Some(last) = notes.last_mut() {
        if total < target_units {
            last.duration += target_units - total;
        } else {
            last.duration = last.duration.saturating_sub(total - target_units);
        }
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Level;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn request(time_signature: &str, measures: u32, key: &str) -> ExerciseRequest {
        ExerciseRequest {
            time_signature: TimeSignature::parse(time_signature).unwrap(),
            measures,
            key: key.to_string(),
            level: Level::Beginner,
            ..ExerciseRequest::default()
        }
    }

    fn total(notes: &[RawNoteEvent]) -> u32 {
        notes.iter().map(|n| n.duration).sum()
    }

    #[test]
    fn test_synthetic_hits_target() {
        let mut rng = Pcg32::seed_from_u64(7);
        for (ts, measures) in [("4/4", 4), ("4/4", 8), ("3/4", 4), ("6/8", 3), ("2/2", 1)] {
            let req = request(ts, measures, "C Major");
            let target = req.target_units().unwrap();
            let notes = synthetic_exercise(&req, target, &mut rng);
            assert!(!notes.is_empty());
            assert_eq!(total(&notes), target, "{} x {}", ts, measures);
            assert!(notes.iter().all(|n| n.duration >= 1));
        }
    }

    #[test]
    fn test_synthetic_is_deterministic_for_seed() {
        let req = request("4/4", 4, "G Major");
        let a = synthetic_exercise(&req, 32, &mut Pcg32::seed_from_u64(42));
        let b = synthetic_exercise(&req, 32, &mut Pcg32::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_synthetic_uses_key_pool_and_motif() {
        let req = request("3/4", 4, "D Major");
        let notes = synthetic_exercise(&req, 24, &mut Pcg32::seed_from_u64(3));
        let pool = key_notes("D Major");
        assert!(notes.iter().all(|n| pool.contains(&n.note.as_str())));
        // every duration but the clipped last one comes from the motif
        let body = &notes[..notes.len() - 1];
        assert!(body.iter().all(|n| TRIPLE_MOTIF.contains(&n.duration)));
    }

    #[test]
    fn test_unknown_key_uses_c_major() {
        assert_eq!(key_notes("H Phrygian"), key_notes("C Major"));
    }

    #[test]
    fn test_scale_even_split() {
        let notes = scale_exercise(32);
        assert_eq!(notes.len(), 8);
        assert!(notes.iter().all(|n| n.duration == 4));
    }

    #[test]
    fn test_scale_last_note_absorbs_rest() {
        let notes = scale_exercise(30);
        assert_eq!(notes[0].duration, 3);
        assert_eq!(notes[7].duration, 9);
        assert_eq!(total(&notes), 30);
    }

    #[test]
    fn test_scale_short_target() {
        // one unit each would be 8; the last note gives back what it can
        let notes = scale_exercise(5);
        assert_eq!(notes[7].duration, 0);
        assert_eq!(total(&notes), 7);
    }
}
