//! Fuzz target for envelope parsing and opening
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary binary layouts through `Envelope::from_bytes`
//! - Wire text: arbitrary strings through base64 decode and `decrypt`
//! - Claimed lengths: prefixes larger than the remaining input
//!
//! # Invariants
//!
//! - NEVER panic on malformed input
//! - Parsed envelopes re-serialize to the exact input bytes
//! - Opening garbage never succeeds with a secret it was not sealed under

#![no_main]

use arbitrary::Arbitrary;
use kyberlink_crypto::{Envelope, SharedSecret, decrypt, open};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Input {
    Bytes { bytes: Vec<u8>, secret: [u8; 32], session: String },
    Wire { wire: String, secret: [u8; 32], session: String },
    ClaimedLength { claimed: u16, body: Vec<u8> },
}

fuzz_target!(|input: Input| {
    match input {
        Input::Bytes { bytes, secret, session } => {
            if let Ok(envelope) = Envelope::from_bytes(&bytes) {
                assert_eq!(envelope.to_bytes(), bytes, "parse must be lossless");
                let declared = usize::from(envelope.metadata_len());
                assert_eq!(declared, envelope.metadata_ciphertext().len());
                let _ = open(&envelope, &SharedSecret::new(secret), &session);
            }
        }

        Input::Wire { wire, secret, session } => {
            let _ = decrypt(&wire, &SharedSecret::new(secret), &session);
        }

        Input::ClaimedLength { claimed, body } => {
            let mut bytes = claimed.to_be_bytes().to_vec();
            bytes.extend_from_slice(&body);
            let parsed = Envelope::from_bytes(&bytes);
            assert_eq!(parsed.is_ok(), usize::from(claimed) <= body.len());
        }
    }
});
