//! Key splitting and HKDF data key derivation

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Length of a KEM shared secret in bytes
pub const SHARED_SECRET_LEN: usize = 32;

/// Length of the HKDF salt carried in envelope metadata
pub const SALT_LEN: usize = 16;

/// Length of the derived AES-256 data key
pub const DATA_KEY_LEN: usize = 32;

/// Prefix of the session context string used as HKDF info and AEAD AAD
pub const CONTEXT_PREFIX: &str = "kyberlink:v1|session=";

/// A 32-byte secret produced by KEM encapsulation or decapsulation.
///
/// Zeroized on drop. Never persisted or reused across exchanges.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SHARED_SECRET_LEN]);

impl SharedSecret {
    /// Wrap raw secret bytes.
    pub fn new(bytes: [u8; SHARED_SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy a secret out of a slice.
    ///
    /// # Errors
    ///
    /// - `KeyDerivation`: slice is not exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; SHARED_SECRET_LEN] =
            bytes.try_into().map_err(|_| CryptoError::KeyDerivation { actual: bytes.len() })?;
        Ok(Self(array))
    }

    /// Raw secret bytes
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_LEN] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

/// The two operational keys computed from one [`SharedSecret`].
///
/// `primary` feeds HKDF for the payload key. `mirror` is the byte reversal of
/// `primary` and is used directly as the metadata key. The two paths never
/// share a key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKeyPair {
    primary: SharedSecret,
    mirror: SharedSecret,
}

impl DerivedKeyPair {
    /// HKDF input keying material for the payload key
    pub fn primary(&self) -> &SharedSecret {
        &self.primary
    }

    /// Raw AES-256 key for the salt/IV metadata block
    pub fn mirror(&self) -> &SharedSecret {
        &self.mirror
    }
}

impl fmt::Debug for DerivedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKeyPair([REDACTED])")
    }
}

/// AES-256-GCM key derived for one envelope.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DataKey([u8; DATA_KEY_LEN]);

impl DataKey {
    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; DATA_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DataKey([REDACTED])")
    }
}

/// Split a shared secret into its primary and mirror keys.
///
/// `primary` is the secret itself, `mirror` is its byte-for-byte reversal.
/// Pure and deterministic.
pub fn split(secret: &SharedSecret) -> DerivedKeyPair {
    let mut reversed = *secret.as_bytes();
    reversed.reverse();

    let pair = DerivedKeyPair { primary: secret.clone(), mirror: SharedSecret(reversed) };
    reversed.zeroize();
    pair
}

/// Session context bytes: `kyberlink:v1|session=<session_id>`.
///
/// Used both as HKDF info and as AEAD associated data, binding every envelope
/// to one protocol version and one session.
pub fn session_context(session_id: &str) -> Vec<u8> {
    let mut context = Vec::with_capacity(CONTEXT_PREFIX.len() + session_id.len());
    context.extend_from_slice(CONTEXT_PREFIX.as_bytes());
    context.extend_from_slice(session_id.as_bytes());
    context
}

/// Derive the payload data key with HKDF-SHA-256.
///
/// IKM is `primary`, salt is the per-envelope random salt, info is the
/// session context. Same inputs always produce the same key.
///
/// # Errors
///
/// - `KeyExpansion`: HKDF rejected the output length
pub fn derive_data_key(
    primary: &SharedSecret,
    salt: &[u8; SALT_LEN],
    session_id: &str,
) -> Result<DataKey, CryptoError> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), primary.as_bytes());
    let info = session_context(session_id);

    let mut key = [0u8; DATA_KEY_LEN];
    hkdf.expand(&info, &mut key).map_err(|_| CryptoError::KeyExpansion)?;

    Ok(DataKey(key))
}
