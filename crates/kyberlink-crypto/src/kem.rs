//! Key encapsulation (ML-KEM-1024)
//!
//! The protocol only needs three KEM operations, so they sit behind the
//! [`Kem`] trait. [`MlKemProvider`] is the production implementation;
//! tests substitute deterministic or counting implementations.

use std::fmt;

use ml_kem::{
    EncodedSizeUser, KemCore, MlKem1024,
    kem::{Decapsulate, Encapsulate},
};
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{derivation::SharedSecret, error::CryptoError};

/// ML-KEM-1024 encapsulation key length
pub const KEM_PUBLIC_KEY_LEN: usize = 1568;

/// ML-KEM-1024 decapsulation key length
pub const KEM_PRIVATE_KEY_LEN: usize = 3168;

/// ML-KEM-1024 ciphertext length
pub const KEM_CIPHERTEXT_LEN: usize = 1568;

type EncapsulationKey = <MlKem1024 as KemCore>::EncapsulationKey;
type DecapsulationKey = <MlKem1024 as KemCore>::DecapsulationKey;

/// A one-time KEM key pair for the return leg of an exchange.
///
/// Both halves are zeroized on drop; the private key never leaves the
/// exchange that generated it.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EphemeralKeyPair {
    public_key: Vec<u8>,
    private_key: Vec<u8>,
}

impl EphemeralKeyPair {
    /// Wrap encoded key material.
    pub fn new(public_key: Vec<u8>, private_key: Vec<u8>) -> Self {
        Self { public_key, private_key }
    }

    /// Encoded public (encapsulation) key
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Encoded private (decapsulation) key
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public_key_len", &self.public_key.len())
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Key encapsulation mechanism used by the handshake.
///
/// Implementations MUST use cryptographically secure randomness for key
/// generation and encapsulation in production.
pub trait Kem: Send + Sync {
    /// Generate a fresh key pair.
    fn generate_key_pair(&self) -> Result<EphemeralKeyPair, CryptoError>;

    /// Encapsulate a fresh shared secret against `public_key`.
    ///
    /// Returns the KEM ciphertext and the shared secret.
    fn encapsulate(&self, public_key: &[u8]) -> Result<(Vec<u8>, SharedSecret), CryptoError>;

    /// Recover the shared secret from `ciphertext` with `private_key`.
    fn decapsulate(
        &self,
        ciphertext: &[u8],
        private_key: &[u8],
    ) -> Result<SharedSecret, CryptoError>;
}

/// ML-KEM-1024 backed by the OS RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct MlKemProvider;

impl MlKemProvider {
    /// Create a provider.
    pub fn new() -> Self {
        Self
    }
}

impl Kem for MlKemProvider {
    fn generate_key_pair(&self) -> Result<EphemeralKeyPair, CryptoError> {
        let (dk, ek) = MlKem1024::generate(&mut OsRng);

        let mut public_key = vec![0u8; KEM_PUBLIC_KEY_LEN];
        let mut private_key = vec![0u8; KEM_PRIVATE_KEY_LEN];
        public_key.copy_from_slice(ek.as_bytes().as_ref());
        private_key.copy_from_slice(dk.as_bytes().as_ref());

        Ok(EphemeralKeyPair::new(public_key, private_key))
    }

    fn encapsulate(&self, public_key: &[u8]) -> Result<(Vec<u8>, SharedSecret), CryptoError> {
        if public_key.len() != KEM_PUBLIC_KEY_LEN {
            return Err(CryptoError::InvalidKey {
                expected: KEM_PUBLIC_KEY_LEN,
                actual: public_key.len(),
            });
        }

        let encoded: ml_kem::Encoded<EncapsulationKey> =
            public_key.try_into().map_err(|_| CryptoError::InvalidKey {
                expected: KEM_PUBLIC_KEY_LEN,
                actual: public_key.len(),
            })?;
        let ek = EncapsulationKey::from_bytes(&encoded);

        let (ct, ss) = ek
            .encapsulate(&mut OsRng)
            .map_err(|_| CryptoError::Kem("encapsulation failed".to_string()))?;

        let mut ciphertext = vec![0u8; KEM_CIPHERTEXT_LEN];
        ciphertext.copy_from_slice(ct.as_ref());
        let secret = SharedSecret::from_slice(ss.as_ref())?;

        Ok((ciphertext, secret))
    }

    fn decapsulate(
        &self,
        ciphertext: &[u8],
        private_key: &[u8],
    ) -> Result<SharedSecret, CryptoError> {
        if ciphertext.len() != KEM_CIPHERTEXT_LEN {
            return Err(CryptoError::InvalidCiphertext {
                expected: KEM_CIPHERTEXT_LEN,
                actual: ciphertext.len(),
            });
        }
        if private_key.len() != KEM_PRIVATE_KEY_LEN {
            return Err(CryptoError::InvalidKey {
                expected: KEM_PRIVATE_KEY_LEN,
                actual: private_key.len(),
            });
        }

        let encoded: ml_kem::Encoded<DecapsulationKey> =
            private_key.try_into().map_err(|_| CryptoError::InvalidKey {
                expected: KEM_PRIVATE_KEY_LEN,
                actual: private_key.len(),
            })?;
        let dk = DecapsulationKey::from_bytes(&encoded);

        let ct: ml_kem::Ciphertext<MlKem1024> =
            ciphertext.try_into().map_err(|_| CryptoError::InvalidCiphertext {
                expected: KEM_CIPHERTEXT_LEN,
                actual: ciphertext.len(),
            })?;

        let ss = dk
            .decapsulate(&ct)
            .map_err(|_| CryptoError::Kem("decapsulation failed".to_string()))?;

        SharedSecret::from_slice(ss.as_ref())
    }
}
