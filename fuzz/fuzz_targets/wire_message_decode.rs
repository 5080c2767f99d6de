//! Fuzz target for exchange message decoding
//!
//! # Strategy
//!
//! - Arbitrary JSON bodies for requests and responses
//! - Arbitrary request payload plaintext
//! - Arbitrary field values pushed through the base64 accessors
//!
//! # Invariants
//!
//! - NEVER panic on malformed input
//! - Decoded messages re-encode and decode to the same value
//! - Target validation never accepts absolute URLs

#![no_main]

use arbitrary::Arbitrary;
use kyberlink_core::{ExchangeError, ReplayGuard};
use kyberlink_proto::{ExchangeRequest, ExchangeResponse, GatewayRequestPayload, ResponseBody};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Input {
    Request(String),
    Response(String),
    Payload { bytes: Vec<u8>, now: u64 },
    Body(Vec<u8>),
}

fuzz_target!(|input: Input| {
    match input {
        Input::Request(body) => {
            if let Ok(request) = ExchangeRequest::from_json(&body) {
                let _ = request.check_version().map_err(ExchangeError::from);
                let _ = request.client_public_key_bytes();
                let _ = request.secret_ciphertext_bytes();
                let reencoded = request.to_json().expect("decoded request must encode");
                assert_eq!(ExchangeRequest::from_json(&reencoded).ok(), Some(request));
            }
        }

        Input::Response(body) => {
            if let Ok(response) = ExchangeResponse::from_json(&body) {
                let _ = response.secret_ciphertext_bytes();
                let reencoded = response.to_json().expect("decoded response must encode");
                assert_eq!(ExchangeResponse::from_json(&reencoded).ok(), Some(response));
            }
        }

        Input::Payload { bytes, now } => {
            if let Ok(payload) = GatewayRequestPayload::from_bytes(&bytes) {
                if payload.validate_target().is_ok() {
                    assert!(payload.final_api.starts_with('/'));
                    assert!(!payload.final_api.starts_with("//"));
                }
                let mut guard = ReplayGuard::default();
                if guard.check(&payload.nonce, payload.timestamp, now).is_ok() {
                    assert!(guard.check(&payload.nonce, payload.timestamp, now).is_err());
                }
            }
        }

        Input::Body(bytes) => {
            let _ = ResponseBody::from_plaintext(bytes);
        }
    }
});
