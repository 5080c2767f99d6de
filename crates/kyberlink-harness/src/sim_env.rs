//! Seeded environment for deterministic tests.
//!
//! Randomness comes from a `ChaCha20Rng` seeded by the test, and the wall
//! clock only moves when the test moves it. Clones share both, so a client
//! and a gateway built from the same `SimEnv` see one clock.
//!
//! KEM operations still draw from the OS RNG; only request nonces, session
//! ids and envelope salts/IVs are reproducible.

#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use kyberlink_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Clock value a fresh `SimEnv` starts at (2023-11-14T22:13:20Z).
pub const SIM_EPOCH_SECS: u64 = 1_700_000_000;

/// Simulated environment with a seeded RNG and a manual clock.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha20Rng>>,
    clock: Arc<AtomicU64>,
}

impl SimEnv {
    /// Environment seeded with `seed`, clock at [`SIM_EPOCH_SECS`].
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
            clock: Arc::new(AtomicU64::new(SIM_EPOCH_SECS)),
        }
    }

    /// Set the wall clock.
    pub fn set_clock(&self, secs: u64) {
        self.clock.store(secs, Ordering::SeqCst);
    }

    /// Move the wall clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.fetch_add(by.as_secs(), Ordering::SeqCst);
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl std::fmt::Debug for SimEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimEnv")
            .field("clock", &self.clock.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Environment for SimEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().expect("SimEnv rng mutex poisoned").fill_bytes(buffer);
    }

    fn wall_clock_secs(&self) -> u64 {
        self.clock.load(Ordering::SeqCst)
    }
}
