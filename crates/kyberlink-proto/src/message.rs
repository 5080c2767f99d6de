//! Exchange messages as they appear on the transport.
//!
//! All binary fields are standard base64 strings so the messages travel as
//! plain JSON bodies. Field names match the gateway's JSON schema exactly
//! (`sessionID`, `clientPublicKey`, ...).

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// Protocol version carried in the `v` field
pub const PROTOCOL_VERSION: u32 = 1;

/// Encode bytes as standard padded base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a standard base64 field, naming the field on failure.
pub fn decode_base64(field: &'static str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| ProtocolError::Base64 { field, reason: e.to_string() })
}

/// The gateway's current KEM public key, bound to a session.
///
/// Fetched fresh for every exchange and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIdentity {
    /// Session issued by the gateway
    #[serde(rename = "sessionID")]
    pub session_id: String,
    /// Base64 KEM public key
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

impl RemoteIdentity {
    /// Build from raw key bytes.
    pub fn new(session_id: impl Into<String>, public_key: &[u8]) -> Self {
        Self { session_id: session_id.into(), public_key: encode_base64(public_key) }
    }

    /// Decoded public key
    pub fn public_key_bytes(&self) -> Result<Vec<u8>> {
        decode_base64("publicKey", &self.public_key)
    }
}

/// Client to gateway message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRequest {
    /// Protocol version
    pub v: u32,
    /// Session the envelope is bound to
    #[serde(rename = "sessionID")]
    pub session_id: String,
    /// Base64 ephemeral KEM public key for the response leg
    #[serde(rename = "clientPublicKey")]
    pub client_public_key: String,
    /// Base64 KEM ciphertext encapsulated against the gateway key
    #[serde(rename = "secretCiphertext")]
    pub secret_ciphertext: String,
    /// Base64 envelope wire form
    #[serde(rename = "encryptedData")]
    pub encrypted_data: String,
}

impl ExchangeRequest {
    /// Build a version 1 request from raw parts.
    pub fn new(
        session_id: impl Into<String>,
        client_public_key: &[u8],
        secret_ciphertext: &[u8],
        encrypted_data: String,
    ) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            session_id: session_id.into(),
            client_public_key: encode_base64(client_public_key),
            secret_ciphertext: encode_base64(secret_ciphertext),
            encrypted_data,
        }
    }

    /// Reject versions other than [`PROTOCOL_VERSION`].
    pub fn check_version(&self) -> Result<()> {
        check_version(self.v)
    }

    /// Decoded ephemeral public key
    pub fn client_public_key_bytes(&self) -> Result<Vec<u8>> {
        decode_base64("clientPublicKey", &self.client_public_key)
    }

    /// Decoded KEM ciphertext
    pub fn secret_ciphertext_bytes(&self) -> Result<Vec<u8>> {
        decode_base64("secretCiphertext", &self.secret_ciphertext)
    }

    /// Serialize as a JSON body.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON body.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Gateway to client message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeResponse {
    /// Protocol version
    pub v: u32,
    /// Base64 KEM ciphertext encapsulated against the client's ephemeral key
    #[serde(rename = "secretCiphertext")]
    pub secret_ciphertext: String,
    /// Base64 envelope wire form
    #[serde(rename = "encryptedData")]
    pub encrypted_data: String,
}

impl ExchangeResponse {
    /// Build a version 1 response from raw parts.
    pub fn new(secret_ciphertext: &[u8], encrypted_data: String) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            secret_ciphertext: encode_base64(secret_ciphertext),
            encrypted_data,
        }
    }

    /// Reject versions other than [`PROTOCOL_VERSION`].
    pub fn check_version(&self) -> Result<()> {
        check_version(self.v)
    }

    /// Decoded KEM ciphertext
    pub fn secret_ciphertext_bytes(&self) -> Result<Vec<u8>> {
        decode_base64("secretCiphertext", &self.secret_ciphertext)
    }

    /// Serialize as a JSON body.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON body.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

fn check_version(v: u32) -> Result<()> {
    if v == PROTOCOL_VERSION { Ok(()) } else { Err(ProtocolError::UnsupportedVersion(v)) }
}
