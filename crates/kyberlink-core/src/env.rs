//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from system resources (wall clock, randomness).
//! Production uses [`crate::system_env::SystemEnv`]; tests use a seeded
//! environment so request nonces, timestamps and envelope nonces are
//! reproducible.

use kyberlink_crypto::SealNonces;

/// Abstract environment providing wall-clock time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Seconds since the Unix epoch.
    fn wall_clock_secs(&self) -> u64;

    /// Fresh per-request identifier (UUID v4 text).
    fn request_nonce(&self) -> String {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
    }

    /// Fresh salt and IVs for one envelope.
    fn seal_nonces(&self) -> SealNonces {
        let mut bytes = [0u8; SealNonces::LEN];
        self.random_bytes(&mut bytes);
        SealNonces::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    };

    use super::*;

    // Counter-based environment: every call yields different bytes
    #[derive(Clone, Default)]
    struct CountingEnv {
        counter: Arc<AtomicU8>,
    }

    impl Environment for CountingEnv {
        fn random_bytes(&self, buffer: &mut [u8]) {
            let value = self.counter.fetch_add(1, Ordering::Relaxed);
            buffer.fill(value);
        }

        fn wall_clock_secs(&self) -> u64 {
            1_700_000_000
        }
    }

    #[test]
    fn request_nonce_is_uuid_v4() {
        let env = CountingEnv::default();
        let nonce = env.request_nonce();

        assert_eq!(nonce.len(), 36);
        assert_eq!(nonce.as_bytes()[14], b'4', "version nibble must be 4");
        assert_eq!(nonce.matches('-').count(), 4);
    }

    #[test]
    fn request_nonces_differ() {
        let env = CountingEnv::default();
        assert_ne!(env.request_nonce(), env.request_nonce());
    }

    #[test]
    fn seal_nonces_consume_fresh_bytes() {
        let env = CountingEnv::default();
        let a = env.seal_nonces();
        let b = env.seal_nonces();

        assert_ne!(a, b);
        assert_eq!(a.salt, [0u8; 16]);
        assert_eq!(b.iv, [1u8; 12]);
    }
}
