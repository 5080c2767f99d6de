//! Request replay protection for the responder.
//!
//! Every request payload carries a creation timestamp and a unique nonce. A
//! responder accepts a payload only if its timestamp lies within the window
//! around the local clock and its nonce has not been seen inside that
//! window. Nonces older than the window are pruned; a replay of such a
//! request fails the timestamp check instead.

use std::{collections::HashMap, time::Duration};

use thiserror::Error;

/// Default acceptance window either side of the responder's clock.
pub const DEFAULT_REPLAY_WINDOW: Duration = Duration::from_secs(60);

/// Replay guard configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Maximum clock distance between payload timestamp and responder clock
    pub window: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { window: DEFAULT_REPLAY_WINDOW }
    }
}

/// Reasons a payload is refused as a replay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// Timestamp is older than the window
    #[error("request timestamp {timestamp} is older than {window_secs}s (now {now})")]
    Stale {
        /// Payload timestamp
        timestamp: i64,
        /// Responder clock
        now: u64,
        /// Window in seconds
        window_secs: u64,
    },

    /// Timestamp is further in the future than the window
    #[error("request timestamp {timestamp} is more than {window_secs}s ahead (now {now})")]
    Future {
        /// Payload timestamp
        timestamp: i64,
        /// Responder clock
        now: u64,
        /// Window in seconds
        window_secs: u64,
    },

    /// Nonce already accepted inside the window
    #[error("duplicate request nonce")]
    DuplicateNonce,
}

/// Tracks accepted nonces inside the replay window.
///
/// Not synchronized; responders share it behind a lock.
#[derive(Debug, Clone, Default)]
pub struct ReplayGuard {
    config: ReplayConfig,
    /// nonce -> responder clock at acceptance
    seen: HashMap<String, u64>,
}

impl ReplayGuard {
    /// Create an empty guard.
    pub fn new(config: ReplayConfig) -> Self {
        Self { config, seen: HashMap::new() }
    }

    /// Active configuration
    pub fn config(&self) -> ReplayConfig {
        self.config
    }

    /// Accept or refuse a payload, remembering its nonce on acceptance.
    ///
    /// # Errors
    ///
    /// - `Stale` / `Future`: timestamp outside the window
    /// - `DuplicateNonce`: nonce already accepted inside the window
    pub fn check(&mut self, nonce: &str, timestamp: i64, now_secs: u64) -> Result<(), ReplayError> {
        let window_secs = self.config.window.as_secs();
        let now = i128::from(now_secs);
        let timestamp_wide = i128::from(timestamp);
        let window = i128::from(window_secs);

        if timestamp_wide < now - window {
            return Err(ReplayError::Stale { timestamp, now: now_secs, window_secs });
        }
        if timestamp_wide > now + window {
            return Err(ReplayError::Future { timestamp, now: now_secs, window_secs });
        }

        self.prune(now_secs);

        if self.seen.contains_key(nonce) {
            return Err(ReplayError::DuplicateNonce);
        }
        self.seen.insert(nonce.to_string(), now_secs);
        Ok(())
    }

    /// Forget nonces accepted more than two windows ago.
    ///
    /// A payload accepted at `t` carries a timestamp of at least `t - window`,
    /// so it is stale for any clock past `t + 2 * window`.
    pub fn prune(&mut self, now_secs: u64) {
        let horizon = now_secs.saturating_sub(self.config.window.as_secs().saturating_mul(2));
        self.seen.retain(|_, accepted_at| *accepted_at >= horizon);
    }

    /// Number of remembered nonces
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no nonces are remembered
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
