//! Fuzz target for envelope tamper detection
//!
//! Seals a message, applies arbitrary mutations to the binary envelope and
//! opens it again.
//!
//! # Invariants
//!
//! - Untouched envelopes always open to the original message
//! - Any change to the bytes makes `open` fail (never a different plaintext)
//! - A different session id always fails

#![no_main]

use arbitrary::Arbitrary;
use kyberlink_crypto::{Envelope, SealNonces, SharedSecret, open, seal};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    message: Vec<u8>,
    secret: [u8; 32],
    nonces: [u8; SealNonces::LEN],
    session: String,
    mutations: Vec<(u16, u8)>,
}

fuzz_target!(|input: Input| {
    let secret = SharedSecret::new(input.secret);
    let nonces = SealNonces::from_bytes(input.nonces);
    let envelope =
        seal(&input.message, &secret, &input.session, &nonces).expect("sealing must succeed");

    let opened = open(&envelope, &secret, &input.session).expect("fresh envelope must open");
    assert_eq!(opened, input.message);

    let other_session = format!("{}#", input.session);
    assert!(open(&envelope, &secret, &other_session).is_err());

    let original = envelope.to_bytes();
    let mut bytes = original.clone();
    for (position, mask) in input.mutations {
        let index = usize::from(position) % bytes.len();
        bytes[index] ^= mask;
    }
    if bytes == original {
        return;
    }

    if let Ok(tampered) = Envelope::from_bytes(&bytes) {
        assert!(open(&tampered, &secret, &input.session).is_err(), "tampered envelope opened");
    }
});
