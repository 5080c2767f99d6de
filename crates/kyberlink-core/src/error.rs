//! Error types for KyberLink exchanges.
//!
//! Strongly-typed errors for the two failure domains: the transport
//! collaborator (unreachable peer, non-success status, timeout) and the
//! exchange itself (ciphertext, derivation, framing and authentication
//! failures).
//!
//! Every failure aborts the current exchange. The detailed kind is kept for
//! logs and tests; [`ExchangeError::public_reason`] collapses the
//! cryptographic kinds so a responder never tells a peer which step failed.

use kyberlink_crypto::CryptoError;
use kyberlink_proto::ProtocolError;
use thiserror::Error;

use crate::{replay::ReplayError, state::ExchangeState};

/// Errors reported by the transport collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Remote could not be reached
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    /// Remote answered with a non-success status
    #[error("gateway returned status {status}: {body}")]
    Status {
        /// HTTP-style status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// Request did not complete within the transport's timeout
    #[error("request timed out")]
    Timeout,

    /// Remote answered with a body that is not a valid message
    #[error("undecodable response: {0}")]
    Decode(String),
}

/// Errors that abort an exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// Transport failure (not retried by the exchange)
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// KEM ciphertext has the wrong length
    #[error("invalid KEM ciphertext: expected {expected} bytes, got {actual}")]
    InvalidCiphertext {
        /// Required ciphertext length
        expected: usize,
        /// Actual ciphertext length
        actual: usize,
    },

    /// Shared secret is malformed (KEM/library mismatch)
    #[error("key derivation failed: shared secret is {actual} bytes")]
    KeyDerivation {
        /// Actual secret length
        actual: usize,
    },

    /// Envelope or message framing is malformed
    #[error("format error: {0}")]
    Format(String),

    /// AEAD verification failed
    #[error("authentication failed")]
    Authentication,

    /// Authenticated request refused by responder policy (replay, target)
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Exchange driven out of order
    #[error("invalid state transition: cannot move from {from:?} to {to:?}")]
    InvalidState {
        /// State the exchange was in
        from: ExchangeState,
        /// State that was requested
        to: ExchangeState,
    },
}

impl ExchangeError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Only timeouts and unreachable gateways qualify. Retrying is the
    /// caller's decision; the exchange itself never retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Timeout | TransportError::Unreachable(_)))
    }

    /// Returns true for failures of the cryptographic pipeline.
    pub fn is_cryptographic(&self) -> bool {
        matches!(
            self,
            Self::InvalidCiphertext { .. }
                | Self::KeyDerivation { .. }
                | Self::Format(_)
                | Self::Authentication
        )
    }

    /// Reason that is safe to show across a trust boundary.
    ///
    /// All cryptographic failures map to the same string.
    pub fn public_reason(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport failure",
            Self::InvalidCiphertext { .. }
            | Self::KeyDerivation { .. }
            | Self::Format(_)
            | Self::Authentication => "exchange rejected",
            Self::Rejected(_) => "request rejected",
            Self::InvalidState { .. } => "internal error",
        }
    }
}

impl From<CryptoError> for ExchangeError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::KeyDerivation { actual } => Self::KeyDerivation { actual },
            CryptoError::Format { reason } => Self::Format(reason),
            CryptoError::Authentication => Self::Authentication,
            CryptoError::InvalidCiphertext { expected, actual } => {
                Self::InvalidCiphertext { expected, actual }
            },
            err @ (CryptoError::InvalidKey { .. }
            | CryptoError::Kem(_)
            | CryptoError::KeyExpansion
            | CryptoError::Encryption) => Self::Format(err.to_string()),
        }
    }
}

impl From<ProtocolError> for ExchangeError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidTarget(_) => Self::Rejected(err.to_string()),
            ProtocolError::Json(_)
            | ProtocolError::Base64 { .. }
            | ProtocolError::UnsupportedVersion(_) => Self::Format(err.to_string()),
        }
    }
}

impl From<ReplayError> for ExchangeError {
    fn from(err: ReplayError) -> Self {
        Self::Rejected(err.to_string())
    }
}
