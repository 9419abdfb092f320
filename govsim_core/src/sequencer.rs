//! Deterministic generation ordering across runs.

use crate::profile::Generation;

/// Maps 1-based run indices onto the fixed generation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSequencer {
    generation_count: usize,
}

impl RunSequencer {
    /// Cycles through all three generations.
    pub fn new() -> Self {
        Self {
            generation_count: Generation::ALL.len(),
        }
    }

    /// Cycles through the first `generation_count` generations (1..=3).
    pub fn with_generation_count(generation_count: usize) -> Self {
        Self {
            generation_count: generation_count.clamp(1, Generation::ALL.len()),
        }
    }

    /// Generation of run `run_index` (1-based): `(run_index - 1) mod count`.
    ///
    /// Run index 0 is treated like run 1.
    pub fn label_for(&self, run_index: u64) -> Generation {
        let slot = run_index.saturating_sub(1) % self.generation_count as u64;
        Generation::ALL[slot as usize]
    }

    /// First `total_runs` generations of the cycle.
    pub fn sequence(&self, total_runs: u64) -> impl Iterator<Item = Generation> + '_ {
        (1..=total_runs).map(move |i| self.label_for(i))
    }
}

impl Default for RunSequencer {
    fn default() -> Self {
        Self::new()
    }
}
