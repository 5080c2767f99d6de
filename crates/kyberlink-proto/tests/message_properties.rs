//! Property-based tests for wire messages
//!
//! Arbitrary binary fields must survive the base64/JSON layer unchanged, and
//! arbitrary input must never panic the decoders.

use kyberlink_proto::{ExchangeRequest, ExchangeResponse, ResponseBody};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_request_fields_survive_json(
        session_id in "[a-f0-9]{64}",
        public_key in prop::collection::vec(any::<u8>(), 0..2048),
        ciphertext in prop::collection::vec(any::<u8>(), 0..2048),
        envelope in "[A-Za-z0-9+/]{0,128}",
    ) {
        let request =
            ExchangeRequest::new(session_id.clone(), &public_key, &ciphertext, envelope.clone());
        let parsed = ExchangeRequest::from_json(&request.to_json().unwrap()).unwrap();

        prop_assert!(parsed.check_version().is_ok());
        prop_assert_eq!(&parsed.session_id, &session_id);
        prop_assert_eq!(parsed.client_public_key_bytes().unwrap(), public_key);
        prop_assert_eq!(parsed.secret_ciphertext_bytes().unwrap(), ciphertext);
        prop_assert_eq!(&parsed.encrypted_data, &envelope);
    }

    #[test]
    fn prop_decoders_never_panic(body in ".{0,512}") {
        let _ = ExchangeRequest::from_json(&body);
        let _ = ExchangeResponse::from_json(&body);
    }

    #[test]
    fn prop_response_body_keeps_raw_bytes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        match ResponseBody::from_plaintext(bytes.clone()) {
            ResponseBody::Raw(raw) => prop_assert_eq!(raw, bytes),
            ResponseBody::Structured(value) => {
                let reparsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
                prop_assert_eq!(value, reparsed);
            },
        }
    }
}
