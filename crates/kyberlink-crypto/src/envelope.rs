//! Envelope encryption using AES-256-GCM
//!
//! An envelope carries two AEAD ciphertexts under two independent keys split
//! from one shared secret:
//!
//! ```text
//! ┌────────────┬──────────────────────────────────────┬───────────────────────┐
//! │ len: u16BE │ metadata: iv2 ‖ AEAD(mirror, salt‖iv) │ payload: AEAD(dk, m)  │
//! └────────────┴──────────────────────────────────────┴───────────────────────┘
//!                                      dk = HKDF(primary, salt, context)
//! ```
//!
//! The payload AEAD binds the session context as associated data. The metadata
//! AEAD has no associated data. [`seal`] and [`open`] are pure: randomness is
//! supplied through [`SealNonces`] so tests can pin it.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::{RngCore, rngs::OsRng};

use crate::{
    derivation::{SALT_LEN, SharedSecret, derive_data_key, session_context, split},
    error::CryptoError,
};

/// AES-GCM nonce length
pub const IV_LEN: usize = 12;

/// AES-GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Plaintext length of the metadata block (salt ‖ iv)
pub const METADATA_PLAINTEXT_LEN: usize = SALT_LEN + IV_LEN;

/// Length of the metadata ciphertext produced by [`seal`] (iv2 ‖ ct ‖ tag)
pub const METADATA_CIPHERTEXT_LEN: usize = IV_LEN + METADATA_PLAINTEXT_LEN + TAG_LEN;

/// Size of the big-endian metadata length prefix
const LENGTH_PREFIX_LEN: usize = 2;

/// Randomness consumed by a single [`seal`] call.
///
/// Every envelope MUST use fresh values. Reusing an `iv` under the same data
/// key, or a `metadata_iv` under the same shared secret, breaks AES-GCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealNonces {
    /// HKDF salt for the payload key
    pub salt: [u8; SALT_LEN],
    /// Payload AEAD nonce
    pub iv: [u8; IV_LEN],
    /// Metadata AEAD nonce
    pub metadata_iv: [u8; IV_LEN],
}

impl SealNonces {
    /// Number of random bytes needed to build a `SealNonces`
    pub const LEN: usize = SALT_LEN + IV_LEN + IV_LEN;

    /// Build from `LEN` caller-provided random bytes.
    ///
    /// Layout: salt (16) ‖ iv (12) ‖ `metadata_iv` (12).
    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; IV_LEN];
        let mut metadata_iv = [0u8; IV_LEN];

        salt.copy_from_slice(&bytes[..SALT_LEN]);
        iv.copy_from_slice(&bytes[SALT_LEN..SALT_LEN + IV_LEN]);
        metadata_iv.copy_from_slice(&bytes[SALT_LEN + IV_LEN..]);

        Self { salt, iv, metadata_iv }
    }

    /// Draw fresh nonces from the OS RNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; Self::LEN];
        OsRng.fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }
}

/// Encrypted message: metadata block plus payload ciphertext.
///
/// # Invariants
///
/// - `metadata_ciphertext.len() <= u16::MAX`, so the length prefix is exact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    metadata_ciphertext: Vec<u8>,
    payload_ciphertext: Vec<u8>,
}

impl Envelope {
    /// Assemble an envelope from its two ciphertexts.
    ///
    /// # Errors
    ///
    /// - `Format`: metadata ciphertext does not fit the 2-byte length prefix
    pub fn new(
        metadata_ciphertext: Vec<u8>,
        payload_ciphertext: Vec<u8>,
    ) -> Result<Self, CryptoError> {
        if metadata_ciphertext.len() > usize::from(u16::MAX) {
            return Err(CryptoError::format(format!(
                "metadata length {} exceeds {}",
                metadata_ciphertext.len(),
                u16::MAX
            )));
        }

        Ok(Self { metadata_ciphertext, payload_ciphertext })
    }

    /// Value of the length prefix
    pub fn metadata_len(&self) -> u16 {
        // Bounded by the constructor invariant
        self.metadata_ciphertext.len() as u16
    }

    /// Encrypted salt ‖ iv, prefixed with its own nonce
    pub fn metadata_ciphertext(&self) -> &[u8] {
        &self.metadata_ciphertext
    }

    /// Encrypted message with appended tag
    pub fn payload_ciphertext(&self) -> &[u8] {
        &self.payload_ciphertext
    }

    /// Serialize as `u16BE(metadata_len) ‖ metadata ‖ payload`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            LENGTH_PREFIX_LEN + self.metadata_ciphertext.len() + self.payload_ciphertext.len(),
        );
        out.extend_from_slice(&self.metadata_len().to_be_bytes());
        out.extend_from_slice(&self.metadata_ciphertext);
        out.extend_from_slice(&self.payload_ciphertext);
        out
    }

    /// Parse the binary framing produced by [`Envelope::to_bytes`].
    ///
    /// # Errors
    ///
    /// - `Format`: missing prefix, or fewer bytes than the prefix declares
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let Some((prefix, rest)) = bytes.split_first_chunk::<LENGTH_PREFIX_LEN>() else {
            return Err(CryptoError::format("envelope shorter than length prefix"));
        };

        let metadata_len = usize::from(u16::from_be_bytes(*prefix));
        if rest.len() < metadata_len {
            return Err(CryptoError::format(format!(
                "declared metadata length {metadata_len} exceeds remaining {} bytes",
                rest.len()
            )));
        }

        let (metadata, payload) = rest.split_at(metadata_len);
        Ok(Self { metadata_ciphertext: metadata.to_vec(), payload_ciphertext: payload.to_vec() })
    }

    /// Base64 (standard, padded) wire form
    pub fn to_wire(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Parse the base64 wire form.
    ///
    /// # Errors
    ///
    /// - `Format`: invalid base64 or malformed framing
    pub fn from_wire(wire: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD
            .decode(wire)
            .map_err(|e| CryptoError::format(format!("invalid base64: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

/// Encrypt `message` into an envelope bound to `session_id`.
///
/// # Security
///
/// - Payload key is HKDF-derived from `primary` with a fresh salt
/// - Metadata key is `mirror` used directly, never reused elsewhere
/// - Session context is AAD: replaying under another session fails
/// - Caller MUST provide fresh random nonces in production
///
/// # Errors
///
/// - `KeyExpansion`: data key derivation failed
/// - `Encryption`: AES-GCM refused the message
pub fn seal(
    message: &[u8],
    secret: &SharedSecret,
    session_id: &str,
    nonces: &SealNonces,
) -> Result<Envelope, CryptoError> {
    let keys = split(secret);
    let context = session_context(session_id);

    let data_key = derive_data_key(keys.primary(), &nonces.salt, session_id)?;
    let payload_cipher = Aes256Gcm::new(data_key.as_bytes().into());
    let payload_ciphertext = payload_cipher
        .encrypt(Nonce::from_slice(&nonces.iv), Payload { msg: message, aad: &context })
        .map_err(|_| CryptoError::Encryption)?;

    let mut metadata_plaintext = [0u8; METADATA_PLAINTEXT_LEN];
    metadata_plaintext[..SALT_LEN].copy_from_slice(&nonces.salt);
    metadata_plaintext[SALT_LEN..].copy_from_slice(&nonces.iv);

    let metadata_cipher = Aes256Gcm::new(keys.mirror().as_bytes().into());
    let sealed_metadata = metadata_cipher
        .encrypt(Nonce::from_slice(&nonces.metadata_iv), metadata_plaintext.as_slice())
        .map_err(|_| CryptoError::Encryption)?;

    let mut metadata_ciphertext = Vec::with_capacity(METADATA_CIPHERTEXT_LEN);
    metadata_ciphertext.extend_from_slice(&nonces.metadata_iv);
    metadata_ciphertext.extend_from_slice(&sealed_metadata);

    Ok(Envelope { metadata_ciphertext, payload_ciphertext })
}

/// Decrypt an envelope bound to `session_id`.
///
/// # Errors
///
/// - `Format`: metadata block too short, or decrypted metadata is not 28
///   bytes
/// - `Authentication`: either AEAD tag failed (tamper, wrong key, wrong
///   session)
pub fn open(
    envelope: &Envelope,
    secret: &SharedSecret,
    session_id: &str,
) -> Result<Vec<u8>, CryptoError> {
    let keys = split(secret);

    let Some((metadata_iv, sealed_metadata)) =
        envelope.metadata_ciphertext.split_first_chunk::<IV_LEN>()
    else {
        return Err(CryptoError::format("metadata shorter than its nonce"));
    };

    let metadata_cipher = Aes256Gcm::new(keys.mirror().as_bytes().into());
    let metadata = metadata_cipher
        .decrypt(Nonce::from_slice(metadata_iv), sealed_metadata)
        .map_err(|_| CryptoError::Authentication)?;

    if metadata.len() != METADATA_PLAINTEXT_LEN {
        return Err(CryptoError::format(format!(
            "decrypted metadata is {} bytes, expected {METADATA_PLAINTEXT_LEN}",
            metadata.len()
        )));
    }

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&metadata[..SALT_LEN]);
    let iv = &metadata[SALT_LEN..];

    let context = session_context(session_id);
    let data_key = derive_data_key(keys.primary(), &salt, session_id)?;
    let payload_cipher = Aes256Gcm::new(data_key.as_bytes().into());

    let payload = Payload { msg: &envelope.payload_ciphertext, aad: &context };
    payload_cipher
        .decrypt(Nonce::from_slice(iv), payload)
        .map_err(|_| CryptoError::Authentication)
}

/// Encrypt `message` with fresh OS randomness and return the base64 wire
/// form.
///
/// # Errors
///
/// See [`seal`].
pub fn encrypt(
    message: &[u8],
    secret: &SharedSecret,
    session_id: &str,
) -> Result<String, CryptoError> {
    Ok(seal(message, secret, session_id, &SealNonces::random())?.to_wire())
}

/// Decode a base64 wire form and decrypt it.
///
/// # Errors
///
/// See [`Envelope::from_wire`] and [`open`].
pub fn decrypt(
    wire: &str,
    secret: &SharedSecret,
    session_id: &str,
) -> Result<Vec<u8>, CryptoError> {
    let envelope = Envelope::from_wire(wire)?;
    open(&envelope, secret, session_id)
}
