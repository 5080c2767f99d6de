//! Error types for envelope and KEM operations

use thiserror::Error;

/// Errors from key derivation, envelope and KEM operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Shared secret is not exactly 32 bytes.
    ///
    /// Indicates a mismatch between the KEM implementation and this crate.
    #[error("invalid shared secret length: expected 32, got {actual}")]
    KeyDerivation {
        /// Actual secret length
        actual: usize,
    },

    /// HKDF could not expand the data key
    #[error("data key expansion failed")]
    KeyExpansion,

    /// AEAD encryption failed
    #[error("envelope encryption failed")]
    Encryption,

    /// Envelope framing is malformed
    #[error("malformed envelope: {reason}")]
    Format {
        /// What was wrong with the framing
        reason: String,
    },

    /// AEAD tag verification failed (tampering, corruption or wrong key)
    #[error("authentication failed")]
    Authentication,

    /// KEM ciphertext has the wrong length for the parameter set
    #[error("invalid KEM ciphertext length: expected {expected}, got {actual}")]
    InvalidCiphertext {
        /// Required ciphertext length
        expected: usize,
        /// Actual ciphertext length
        actual: usize,
    },

    /// KEM key material has the wrong length or encoding
    #[error("invalid KEM key: expected {expected} bytes, got {actual}")]
    InvalidKey {
        /// Required key length
        expected: usize,
        /// Actual key length
        actual: usize,
    },

    /// The KEM primitive itself reported a failure
    #[error("KEM operation failed: {0}")]
    Kem(String),
}

impl CryptoError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Self::Format { reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_helper_keeps_reason() {
        assert_eq!(
            CryptoError::format("short"),
            CryptoError::Format { reason: "short".to_string() }
        );
    }

    #[test]
    fn error_display() {
        let err = CryptoError::InvalidCiphertext { expected: 1568, actual: 12 };
        assert_eq!(err.to_string(), "invalid KEM ciphertext length: expected 1568, got 12");

        let err = CryptoError::KeyDerivation { actual: 16 };
        assert_eq!(err.to_string(), "invalid shared secret length: expected 32, got 16");

        assert_eq!(CryptoError::KeyExpansion.to_string(), "data key expansion failed");
        assert_eq!(CryptoError::Encryption.to_string(), "envelope encryption failed");
    }
}
