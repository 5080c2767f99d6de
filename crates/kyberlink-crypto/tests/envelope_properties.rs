//! Property-based tests for envelope encryption
//!
//! These tests verify the fundamental invariants of the envelope codec:
//!
//! 1. **Round-trip**: open(seal(m, k, s), k, s) == m for all messages
//! 2. **Session binding**: an envelope sealed under s1 never opens under s2
//! 3. **Tamper detection**: any single bit flip is rejected
//! 4. **Key separation**: mirror is the exact byte reversal of primary
//! 5. **Determinism**: data key derivation depends only on its inputs
//! 6. **Length invariants**: metadata block is always 56 bytes
//! 7. **Freshness**: distinct nonces produce distinct wire forms

use kyberlink_crypto::{
    CryptoError, Envelope, IV_LEN, METADATA_CIPHERTEXT_LEN, METADATA_PLAINTEXT_LEN, SALT_LEN,
    SealNonces, SharedSecret, TAG_LEN, decrypt, derive_data_key, open, seal, split,
};
use proptest::prelude::*;

fn secret_strategy() -> impl Strategy<Value = SharedSecret> {
    prop::array::uniform32(any::<u8>()).prop_map(SharedSecret::new)
}

fn nonces_strategy() -> impl Strategy<Value = SealNonces> {
    prop::collection::vec(any::<u8>(), SealNonces::LEN..=SealNonces::LEN).prop_map(|v| {
        let mut bytes = [0u8; SealNonces::LEN];
        bytes.copy_from_slice(&v);
        SealNonces::from_bytes(bytes)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_seal_open_roundtrip(
        message in prop::collection::vec(any::<u8>(), 0..2048),
        secret in secret_strategy(),
        session_id in "[a-zA-Z0-9-]{0,64}",
        nonces in nonces_strategy(),
    ) {
        let envelope = seal(&message, &secret, &session_id, &nonces).unwrap();
        let wire = envelope.to_wire();

        prop_assert_eq!(decrypt(&wire, &secret, &session_id).unwrap(), message);
    }

    #[test]
    fn prop_session_binding(
        message in prop::collection::vec(any::<u8>(), 0..256),
        secret in secret_strategy(),
        s1 in "[a-z0-9]{1,32}",
        s2 in "[a-z0-9]{1,32}",
        nonces in nonces_strategy(),
    ) {
        prop_assume!(s1 != s2);

        let envelope = seal(&message, &secret, &s1, &nonces).unwrap();
        prop_assert_eq!(open(&envelope, &secret, &s2), Err(CryptoError::Authentication));
    }

    #[test]
    fn prop_length_invariants(
        message in prop::collection::vec(any::<u8>(), 0..1024),
        secret in secret_strategy(),
        nonces in nonces_strategy(),
    ) {
        let envelope = seal(&message, &secret, "sess", &nonces).unwrap();

        prop_assert_eq!(
            envelope.metadata_ciphertext().len(),
            IV_LEN + METADATA_PLAINTEXT_LEN + TAG_LEN
        );
        prop_assert_eq!(envelope.metadata_ciphertext().len(), METADATA_CIPHERTEXT_LEN);
        prop_assert_eq!(usize::from(envelope.metadata_len()), envelope.metadata_ciphertext().len());
        prop_assert_eq!(envelope.payload_ciphertext().len(), message.len() + TAG_LEN);

        let bytes = envelope.to_bytes();
        prop_assert_eq!(u16::from_be_bytes([bytes[0], bytes[1]]), envelope.metadata_len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_single_bit_flip_is_rejected(
        message in prop::collection::vec(any::<u8>(), 1..256),
        secret in secret_strategy(),
        nonces in nonces_strategy(),
        flip_index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let envelope = seal(&message, &secret, "sess", &nonces).unwrap();
        let mut bytes = envelope.to_bytes();

        // Flip a bit anywhere after the length prefix
        let body_len = bytes.len() - 2;
        let position = 2 + flip_index.index(body_len);
        bytes[position] ^= 1 << bit;

        let tampered = Envelope::from_bytes(&bytes).unwrap();
        let result = open(&tampered, &secret, "sess");

        prop_assert!(
            matches!(result, Err(CryptoError::Authentication | CryptoError::Format { .. })),
            "bit flip at {} must be rejected, got {:?}",
            position,
            result
        );
    }

    #[test]
    fn prop_mirror_is_byte_reversal(secret in secret_strategy()) {
        let pair = split(&secret);

        let mut reversed = *secret.as_bytes();
        reversed.reverse();

        prop_assert_eq!(pair.mirror().as_bytes(), &reversed);
        prop_assert_eq!(pair.primary(), &secret);

        if reversed != *secret.as_bytes() {
            prop_assert_ne!(pair.primary(), pair.mirror());
        }
    }

    #[test]
    fn prop_derivation_deterministic(
        secret in secret_strategy(),
        salt in prop::array::uniform16(any::<u8>()),
        session_id in "[a-z0-9]{0,32}",
    ) {
        let a = derive_data_key(&secret, &salt, &session_id).unwrap();
        let b = derive_data_key(&secret, &salt, &session_id).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_derivation_sensitive_to_salt_and_session(
        secret in secret_strategy(),
        salt in prop::array::uniform16(any::<u8>()),
        salt_flip in 0usize..SALT_LEN,
        session_id in "[a-z0-9]{1,32}",
    ) {
        let base = derive_data_key(&secret, &salt, &session_id).unwrap();

        let mut other_salt = salt;
        other_salt[salt_flip] ^= 0xFF;
        prop_assert_ne!(&base, &derive_data_key(&secret, &other_salt, &session_id).unwrap());

        let other_session = format!("{session_id}x");
        prop_assert_ne!(&base, &derive_data_key(&secret, &salt, &other_session).unwrap());
    }

    #[test]
    fn prop_distinct_nonces_are_fresh(
        message in prop::collection::vec(any::<u8>(), 0..256),
        secret in secret_strategy(),
        a in nonces_strategy(),
        b in nonces_strategy(),
    ) {
        prop_assume!(a.salt != b.salt && a.metadata_iv != b.metadata_iv);

        let wire_a = seal(&message, &secret, "sess", &a).unwrap().to_wire();
        let wire_b = seal(&message, &secret, "sess", &b).unwrap().to_wire();

        prop_assert_ne!(&wire_a, &wire_b);
        prop_assert_eq!(
            decrypt(&wire_a, &secret, "sess").unwrap(),
            decrypt(&wire_b, &secret, "sess").unwrap()
        );
    }
}

#[test]
fn identical_plaintext_under_different_sessions_differs() {
    let secret = SharedSecret::new([0x11; 32]);
    let nonces = SealNonces::from_bytes([0x22; SealNonces::LEN]);

    let a = seal(b"same plaintext", &secret, "alpha", &nonces).unwrap();
    let b = seal(b"same plaintext", &secret, "beta", &nonces).unwrap();

    assert_eq!(a.metadata_ciphertext(), b.metadata_ciphertext(), "metadata has no session AAD");
    assert_ne!(a.payload_ciphertext(), b.payload_ciphertext());
}

#[test]
fn known_envelope_vector_is_stable() {
    // Pinned nonces make the whole envelope reproducible
    let secret = SharedSecret::new([0u8; 32]);
    let nonces = SealNonces::from_bytes([0u8; SealNonces::LEN]);

    let first = seal(b"{}", &secret, "kat", &nonces).unwrap().to_bytes();
    let second = seal(b"{}", &secret, "kat", &nonces).unwrap().to_bytes();

    assert_eq!(hex::encode(&first), hex::encode(&second));
    assert_eq!(first.len(), 2 + METADATA_CIPHERTEXT_LEN + 2 + TAG_LEN);
    assert_eq!(&first[..2], &[0x00, 0x38]);
}
