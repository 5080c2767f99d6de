//! KEM handshake for both legs of an exchange.
//!
//! The outbound leg encapsulates against the remote's long-lived session key.
//! The return leg uses a fresh ephemeral key pair generated per exchange:
//! its public half travels with the request, the remote encapsulates against
//! it, and only the holder of the private half can open the response.
//!
//! Ciphertext lengths are checked here, before any decapsulation, so a
//! truncated or padded ciphertext never reaches the KEM.

use kyberlink_crypto::{EphemeralKeyPair, KEM_CIPHERTEXT_LEN, Kem, SharedSecret};

use crate::error::ExchangeError;

/// Ciphertext plus the secret it encapsulates.
#[derive(Debug)]
pub struct Encapsulation {
    /// KEM ciphertext to send to the key holder
    pub ciphertext: Vec<u8>,
    /// Secret shared with the key holder
    pub secret: SharedSecret,
}

/// KEM operations for one side of an exchange.
///
/// Generic over the KEM so tests can count or fake calls.
#[derive(Debug, Clone, Default)]
pub struct ChannelHandshake<K: Kem> {
    kem: K,
}

impl<K: Kem> ChannelHandshake<K> {
    /// Wrap a KEM provider.
    pub fn new(kem: K) -> Self {
        Self { kem }
    }

    /// Underlying KEM provider
    pub fn kem(&self) -> &K {
        &self.kem
    }

    /// Encapsulate a fresh secret against `remote_public_key`.
    ///
    /// Used for the request leg (client, against the session key) and the
    /// return leg (responder, against the client's ephemeral key).
    ///
    /// # Errors
    ///
    /// - `Format`: public key rejected by the KEM
    /// - `InvalidCiphertext`: KEM produced a ciphertext of the wrong length
    pub fn open_outbound(&self, remote_public_key: &[u8]) -> Result<Encapsulation, ExchangeError> {
        let (ciphertext, secret) = self.kem.encapsulate(remote_public_key)?;
        check_ciphertext_len(&ciphertext)?;
        Ok(Encapsulation { ciphertext, secret })
    }

    /// Generate the ephemeral key pair for the return leg.
    ///
    /// # Errors
    ///
    /// - `Format`: KEM key generation failed
    pub fn prepare_return_leg(&self) -> Result<EphemeralKeyPair, ExchangeError> {
        Ok(self.kem.generate_key_pair()?)
    }

    /// Recover the secret from a received ciphertext.
    ///
    /// # Errors
    ///
    /// - `InvalidCiphertext`: length is not exactly [`KEM_CIPHERTEXT_LEN`];
    ///   the KEM is not invoked
    /// - `Format`: private key rejected by the KEM
    pub fn open_inbound(
        &self,
        ciphertext: &[u8],
        private_key: &[u8],
    ) -> Result<SharedSecret, ExchangeError> {
        check_ciphertext_len(ciphertext)?;
        Ok(self.kem.decapsulate(ciphertext, private_key)?)
    }
}

fn check_ciphertext_len(ciphertext: &[u8]) -> Result<(), ExchangeError> {
    if ciphertext.len() == KEM_CIPHERTEXT_LEN {
        Ok(())
    } else {
        Err(ExchangeError::InvalidCiphertext {
            expected: KEM_CIPHERTEXT_LEN,
            actual: ciphertext.len(),
        })
    }
}
