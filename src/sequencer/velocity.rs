//! Velocity sources for note-on events
//!
//! Velocity is the only non-deterministic part of sequencing, so it is always
//! injected: a seeded [`RandomVelocity`] for real output, [`FixedVelocity`] for
//! tests and reproducible renders.

use rand::Rng;

/// Lower bound of the default velocity range.
pub const DEFAULT_VELOCITY_LOW: u8 = 60;

/// Upper bound (inclusive) of the default velocity range.
pub const DEFAULT_VELOCITY_HIGH: u8 = 100;

/// Supplies one velocity per pitched note.
pub trait VelocitySource {
    fn next_velocity(&mut self) -> u8;
}

impl<V: VelocitySource + ?Sized> VelocitySource for &mut V {
    fn next_velocity(&mut self) -> u8 {
        (**self).next_velocity()
    }
}

/// Uniform velocities in an inclusive range, drawn from any `Rng`.
#[derive(Debug, Clone)]
pub struct RandomVelocity<R> {
    rng: R,
    low: u8,
    high: u8,
}

impl<R: Rng> RandomVelocity<R> {
    /// Velocities in the default comfortable range 60..=100.
    pub fn new(rng: R) -> Self {
        Self::with_range(rng, DEFAULT_VELOCITY_LOW, DEFAULT_VELOCITY_HIGH)
    }

    /// Velocities in `low..=high`, clamped to the MIDI range 1..=127.
    pub fn with_range(rng: R, low: u8, high: u8) -> Self {
        let (low, high) = (low.min(high).clamp(1, 127), high.max(low).clamp(1, 127));
        Self { rng, low, high }
    }
}

impl<R: Rng> VelocitySource for RandomVelocity<R> {
    fn next_velocity(&mut self) -> u8 {
        self.rng.gen_range(self.low..=self.high)
    }
}

/// The same velocity for every note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedVelocity(pub u8);

impl VelocitySource for FixedVelocity {
    fn next_velocity(&mut self) -> u8 {
        self.0
    }
}
