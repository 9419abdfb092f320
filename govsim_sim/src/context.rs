//! Simulation context: virtual clock and deterministic identities.

use govsim_env::{keccak256, Address};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Simulation context backed by a virtual clock and a master seed.
///
/// This provides:
/// - A virtual clock that only moves when the simulated ledger mines a block
/// - Deterministic account addresses derived from the seed
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<Mutex<u64>>,

    /// Epoch offset (virtual time 0 maps to this wall-clock time)
    epoch: SystemTime,
}

impl SimContext {
    /// Creates a new SimContext with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            virtual_time_ns: Arc::new(Mutex::new(0)),
            epoch: UNIX_EPOCH + Duration::from_secs(1704067200), // 2024-01-01 00:00:00 UTC
        }
    }

    fn clock(&self) -> MutexGuard<'_, u64> {
        self.virtual_time_ns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        *self.clock() += duration.as_nanos() as u64;
    }

    /// Returns virtual time since simulation start.
    pub fn now(&self) -> Duration {
        Duration::from_nanos(*self.clock())
    }

    /// Returns the virtual wall-clock time.
    pub fn system_time(&self) -> SystemTime {
        self.epoch + self.now()
    }

    /// Returns the virtual wall-clock time in whole seconds since the Unix epoch.
    pub fn unix_timestamp(&self) -> u64 {
        self.system_time()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Derives a deterministic account address.
    ///
    /// The same seed and extension always give the same address, and
    /// deriving more accounts never changes earlier ones.
    pub fn derive_address(&self, seed_extension: u64) -> Address {
        let combined_seed = self.seed.wrapping_mul(0x517cc1b727220a95) ^ seed_extension;
        let mut rng = ChaCha8Rng::seed_from_u64(combined_seed);
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        Address::from_slice(&keccak256(key)[12..])
    }

    /// Returns the master seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            epoch: self.epoch,
        }
    }
}

impl std::fmt::Debug for SimContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimContext")
            .field("seed", &self.seed)
            .field("now", &self.now())
            .finish()
    }
}
