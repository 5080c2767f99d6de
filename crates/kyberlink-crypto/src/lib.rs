//! KyberLink Cryptographic Primitives
//!
//! Building blocks for the KyberLink hybrid channel: ML-KEM-1024 key
//! encapsulation, key splitting, HKDF derivation and AES-256-GCM envelopes.
//! The envelope core is pure; callers supply randomness through
//! [`SealNonces`] (or use [`encrypt`], which draws from the OS RNG).
//!
//! # Key Lifecycle
//!
//! One KEM shared secret protects one envelope. It is split into two keys
//! that never meet:
//!
//! ```text
//! ML-KEM-1024 Shared Secret (32 bytes)
//!        │
//!        ├── primary ──▶ HKDF-SHA256(salt, "kyberlink:v1|session=<id>") ──▶ Data Key
//!        │                                                                   │
//!        │                                                   AES-256-GCM(payload, aad = context)
//!        │
//!        └── mirror = reverse(primary) ──▶ AES-256-GCM(salt ‖ iv)
//! ```
//!
//! A fresh secret is encapsulated for every exchange and every direction.
//! Nothing is cached, so compromise of one exchange says nothing about another.
//!
//! # Security
//!
//! Session Binding:
//! - The session context is HKDF info and payload AAD
//! - An envelope replayed under another session fails authentication
//!
//! Key Separation:
//! - Metadata and payload keys come from different transforms of the secret
//! - A predictable salt alone does not reveal the payload key
//!
//! Authenticity:
//! - Both AEAD tags must verify; any failure rejects the whole envelope
//! - Decoded plaintext is only interpreted after authentication

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod derivation;
pub mod envelope;
pub mod error;
pub mod kem;

pub use derivation::{
    CONTEXT_PREFIX, DataKey, DerivedKeyPair, SALT_LEN, SHARED_SECRET_LEN, SharedSecret,
    derive_data_key, session_context, split,
};
pub use envelope::{
    Envelope, IV_LEN, METADATA_CIPHERTEXT_LEN, METADATA_PLAINTEXT_LEN, SealNonces, TAG_LEN,
    decrypt, encrypt, open, seal,
};
pub use error::CryptoError;
pub use kem::{
    EphemeralKeyPair, KEM_CIPHERTEXT_LEN, KEM_PRIVATE_KEY_LEN, KEM_PUBLIC_KEY_LEN, Kem,
    MlKemProvider,
};
