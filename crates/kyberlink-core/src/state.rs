//! Exchange state machine.
//!
//! One exchange walks a strictly linear pipeline. Any failure jumps to
//! `Failed`; nothing ever moves backwards or skips a step.
//!
//! ```text
//! Idle ─▶ IdentityFetched ─▶ Encapsulated ─▶ RequestEnvelopeBuilt ─▶ RequestSent
//!                                                                        │
//! Completed ◀─ ResponseEnvelopeDecoded ◀─ ResponseDecapsulated ◀─ ResponseReceived
//!
//! any non-terminal state ──error──▶ Failed
//! ```

use crate::error::ExchangeError;

/// Progress of a single exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeState {
    /// Nothing done yet
    Idle,
    /// Remote identity (session id + KEM public key) received
    IdentityFetched,
    /// Request secret encapsulated, ephemeral key pair generated
    Encapsulated,
    /// Request envelope sealed and framed
    RequestEnvelopeBuilt,
    /// Request handed to the transport
    RequestSent,
    /// Response message received and parsed
    ResponseReceived,
    /// Response secret recovered with the ephemeral private key
    ResponseDecapsulated,
    /// Response envelope authenticated and decrypted
    ResponseEnvelopeDecoded,
    /// Exchange finished successfully
    Completed,
    /// Exchange aborted
    Failed,
}

impl ExchangeState {
    /// The state that follows this one on the success path.
    ///
    /// `None` for terminal states.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::IdentityFetched),
            Self::IdentityFetched => Some(Self::Encapsulated),
            Self::Encapsulated => Some(Self::RequestEnvelopeBuilt),
            Self::RequestEnvelopeBuilt => Some(Self::RequestSent),
            Self::RequestSent => Some(Self::ResponseReceived),
            Self::ResponseReceived => Some(Self::ResponseDecapsulated),
            Self::ResponseDecapsulated => Some(Self::ResponseEnvelopeDecoded),
            Self::ResponseEnvelopeDecoded => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `to` is a legal successor of this state.
    pub fn can_transition_to(self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }

    /// Validate and perform a transition.
    ///
    /// # Errors
    ///
    /// - `InvalidState`: `to` is not a legal successor
    pub fn transition(self, to: Self) -> Result<Self, ExchangeError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(ExchangeError::InvalidState { from: self, to })
        }
    }
}

/// Loggable prefix of a session id (at most 8 characters).
pub fn session_tag(session_id: &str) -> &str {
    match session_id.char_indices().nth(8) {
        Some((end, _)) => &session_id[..end],
        None => session_id,
    }
}
