//! Protocol error types.

use thiserror::Error;

/// Result alias for wire message operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors from decoding or validating wire messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// JSON body could not be serialized or deserialized
    #[error("invalid JSON: {0}")]
    Json(String),

    /// A base64 field did not decode
    #[error("invalid base64 in field {field}: {reason}")]
    Base64 {
        /// Wire name of the field
        field: &'static str,
        /// Decoder error
        reason: String,
    },

    /// Message carries a protocol version we do not speak
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u32),

    /// Request target is not a relative API path
    #[error("invalid target path: {0}")]
    InvalidTarget(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
