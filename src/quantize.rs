//! # Duration Quantizer
//!
//! Rescales raw note durations so that they sum to an exact number of units.
//!
//! ## Algorithm
//! 1. Every entry except the last gets `round(raw * target / raw_total)` units,
//!    floored at 1. Rounding is exact integer round-half-to-even.
//! 2. The last entry absorbs whatever remains of the target, floored at 1.
//! 3. If the floors pushed the total past the target (many short notes, few
//!    units), units are taken back one at a time from the longest entry, ties
//!    going to the later entry, until the total is exact.
//!
//! Step 2 is what makes output reproducible: identical input always yields
//! identical allocation, and a list that already sums to the target is returned
//! unchanged.
//!
//! ## Failure Cases
//! - Empty input or all-zero durations: [`EtudeError::DegenerateInput`]
//! - More entries than target units: [`EtudeError::InfeasibleTarget`]

use std::cmp::Ordering;

use tracing::debug;

use crate::error::EtudeError;

/// Quantize `(label, raw_duration)` pairs to sum exactly to `target_units`.
///
/// # Examples
/// ```
/// use etude::quantize;
///
/// let raw = vec![("C4", 2), ("D4", 2), ("E4", 1), ("F4", 1), ("G4", 2), ("A4", 2)];
/// let scaled = quantize(raw, 32).unwrap();
/// let durations: Vec<u32> = scaled.iter().map(|(_, d)| *d).collect();
/// assert_eq!(durations, vec![6, 6, 3, 3, 6, 8]);
/// assert_eq!(durations.iter().sum::<u32>(), 32);
/// ```
pub fn quantize<L>(entries: Vec<(L, u32)>, target_units: u32) -> Result<Vec<(L, u32)>, EtudeError> {
    let raw_total: u64 = entries.iter().map(|(_, d)| *d as u64).sum();
    if entries.is_empty() || raw_total == 0 {
        return Err(EtudeError::DegenerateInput);
    }
    if entries.len() as u64 > target_units as u64 {
        return Err(EtudeError::InfeasibleTarget {
            notes: entries.len(),
            target: target_units,
        });
    }

    let last = entries.len() - 1;
    let target = target_units as u64;
    let mut remainder = target_units as i64;
    let mut scaled = Vec::with_capacity(entries.len());

    for (i, (label, raw)) in entries.into_iter().enumerate() {
        let units = if i < last {
            let portion = round_half_even(raw as u64 * target, raw_total).max(1) as i64;
            remainder -= portion;
            portion
        } else {
            remainder.max(1)
        };
        scaled.push((label, units as u32));
    }

    let total: u64 = scaled.iter().map(|(_, d)| *d as u64).sum();
    if total > target {
        debug!(total, target, "quantized durations overshoot, rebalancing");
        rebalance(&mut scaled, total - target);
    }

    Ok(scaled)
}

/// Take `excess` units back, one at a time, from the longest entry.
fn rebalance<L>(scaled: &mut [(L, u32)], mut excess: u64) {
    while excess > 0 {
        let longest = scaled
            .iter()
            .enumerate()
            .filter(|(_, (_, d))| *d > 1)
            .max_by_key(|(i, (_, d))| (*d, *i))
            .map(|(i, _)| i);
        match longest {
            Some(i) => {
                scaled[i].1 -= 1;
                excess -= 1;
            }
            // every entry is already at the floor
            None => break,
        }
    }
}

/// `numerator / denominator` rounded to the nearest integer, halves to even.
pub(crate) fn round_half_even(numerator: u64, denominator: u64) -> u64 {
    let quotient = numerator / denominator;
    let rest = numerator % denominator;
    match (rest * 2).cmp(&denominator) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + 1,
        Ordering::Equal if quotient % 2 == 0 => quotient,
        Ordering::Equal => quotient + 1,
    }
}
