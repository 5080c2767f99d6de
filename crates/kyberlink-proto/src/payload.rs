//! Plaintext carried inside envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Logical request carried inside the request envelope.
///
/// `nonce` is a fresh unpredictable identifier per request and, together
/// with `timestamp`, lets the gateway reject replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRequestPayload {
    /// Relative path of the backend API, e.g. `/users`
    #[serde(rename = "finalApi")]
    pub final_api: String,
    /// HTTP method to use against the backend
    pub method: String,
    /// Arbitrary JSON body for the backend
    pub payload: Value,
    /// Unix seconds at creation
    pub timestamp: i64,
    /// Per-request unique identifier
    pub nonce: String,
}

impl GatewayRequestPayload {
    /// Serialize to the JSON bytes that get sealed.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse authenticated plaintext.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Check that `final_api` is a relative API path.
    ///
    /// Absolute URLs would let a client steer the gateway to arbitrary hosts,
    /// so only paths starting with `/` are accepted.
    pub fn validate_target(&self) -> Result<()> {
        let target = self.final_api.as_str();
        if target.starts_with("http://") || target.starts_with("https://") {
            return Err(ProtocolError::InvalidTarget(format!("absolute URL not allowed: {target}")));
        }
        if !target.starts_with('/') || target.starts_with("//") {
            return Err(ProtocolError::InvalidTarget(format!("not a relative path: {target}")));
        }
        Ok(())
    }
}

/// Decrypted response body.
///
/// Authenticated plaintext is parsed as JSON when possible; anything else is
/// kept verbatim. Only ever built from plaintext whose AEAD tag verified.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Plaintext parsed as JSON
    Structured(Value),
    /// Plaintext that is not JSON
    Raw(Vec<u8>),
}

impl ResponseBody {
    /// Interpret authenticated plaintext.
    pub fn from_plaintext(plaintext: Vec<u8>) -> Self {
        match serde_json::from_slice(&plaintext) {
            Ok(value) => Self::Structured(value),
            Err(_) => Self::Raw(plaintext),
        }
    }

    /// Parsed JSON, if the plaintext was JSON
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// Plaintext as UTF-8 text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Structured(_) => None,
            Self::Raw(bytes) => std::str::from_utf8(bytes).ok(),
        }
    }

    /// Deserialize structured bodies into a typed value.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        match self {
            Self::Structured(value) => Ok(T::deserialize(value)?),
            Self::Raw(bytes) => Ok(serde_json::from_slice(bytes)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(final_api: &str) -> GatewayRequestPayload {
        GatewayRequestPayload {
            final_api: final_api.to_string(),
            method: "POST".to_string(),
            payload: json!({"x": 1}),
            timestamp: 1_700_000_000,
            nonce: "abc".to_string(),
        }
    }

    #[test]
    fn payload_uses_gateway_field_names() {
        let value = serde_json::to_value(payload("/test1")).unwrap();

        assert_eq!(
            value,
            json!({
                "finalApi": "/test1",
                "method": "POST",
                "payload": {"x": 1},
                "timestamp": 1_700_000_000,
                "nonce": "abc",
            })
        );
    }

    #[test]
    fn payload_bytes_roundtrip() {
        let original = payload("/test1");
        let parsed = GatewayRequestPayload::from_bytes(&original.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn relative_targets_are_accepted() {
        assert!(payload("/").validate_target().is_ok());
        assert!(payload("/api/v1/users?id=3").validate_target().is_ok());
    }

    #[test]
    fn absolute_and_bare_targets_are_rejected() {
        let targets =
            ["http://evil.example/", "https://evil.example/", "users", "", "//evil.example"];
        for target in targets {
            assert!(
                matches!(payload(target).validate_target(), Err(ProtocolError::InvalidTarget(_))),
                "{target} must be rejected"
            );
        }
    }

    #[test]
    fn json_plaintext_is_structured() {
        let body = ResponseBody::from_plaintext(br#"{"ok":true}"#.to_vec());
        assert_eq!(body.as_json(), Some(&json!({"ok": true})));
        assert_eq!(body.as_text(), None);
    }

    #[test]
    fn non_json_plaintext_falls_back_to_raw() {
        let body = ResponseBody::from_plaintext(b"plain text reply".to_vec());
        assert_eq!(body, ResponseBody::Raw(b"plain text reply".to_vec()));
        assert_eq!(body.as_text(), Some("plain text reply"));
    }

    #[test]
    fn binary_plaintext_has_no_text() {
        let body = ResponseBody::from_plaintext(vec![0xFF, 0xFE, 0x00]);
        assert_eq!(body.as_text(), None);
    }

    #[test]
    fn structured_body_deserializes() {
        #[derive(Deserialize)]
        struct Reply {
            ok: bool,
        }

        let body = ResponseBody::from_plaintext(br#"{"ok":true}"#.to_vec());
        assert!(body.deserialize::<Reply>().unwrap().ok);
    }
}
