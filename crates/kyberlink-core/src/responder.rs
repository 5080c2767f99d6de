//! Gateway side of an exchange.
//!
//! Opens requests sealed to a session key and seals responses back to the
//! client's ephemeral key. Holds no state: session key storage, replay
//! tracking and backend dispatch belong to whoever drives the responder.
//!
//! # Security
//!
//! Failures are logged with their detailed kind but callers answering a peer
//! should use [`ExchangeError::public_reason`], which does not distinguish
//! a bad ciphertext from a failed tag.

use kyberlink_crypto::{Envelope, Kem, SealNonces, open, seal};
use kyberlink_proto::{ExchangeRequest, ExchangeResponse, GatewayRequestPayload};
use tracing::{debug, warn};

use crate::{error::ExchangeError, handshake::ChannelHandshake, state::session_tag};

/// Authenticated request contents.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedRequest {
    /// Session the request was bound to
    pub session_id: String,
    /// Client's ephemeral public key for the return leg
    pub client_public_key: Vec<u8>,
    /// Decrypted request payload
    pub payload: GatewayRequestPayload,
}

/// Stateless responder protocol operations.
#[derive(Debug, Clone, Default)]
pub struct Responder<K: Kem> {
    handshake: ChannelHandshake<K>,
}

impl<K: Kem> Responder<K> {
    /// Create a responder over a KEM provider.
    pub fn new(kem: K) -> Self {
        Self { handshake: ChannelHandshake::new(kem) }
    }

    /// Decapsulate, decrypt and parse a request.
    ///
    /// `session_private_key` is the private half of the key advertised with
    /// the request's session.
    ///
    /// # Errors
    ///
    /// - `Format`: unsupported version, bad base64, malformed envelope or
    ///   payload JSON
    /// - `InvalidCiphertext`: KEM ciphertext is not 1568 bytes
    /// - `Authentication`: envelope failed to verify
    /// - `Rejected`: `finalApi` is not a relative path
    pub fn open_request(
        &self,
        request: &ExchangeRequest,
        session_private_key: &[u8],
    ) -> Result<OpenedRequest, ExchangeError> {
        let tag = session_tag(&request.session_id);
        self.open_request_inner(request, session_private_key).inspect_err(|err| {
            warn!(session = tag, error = %err, "rejecting request");
        })
    }

    fn open_request_inner(
        &self,
        request: &ExchangeRequest,
        session_private_key: &[u8],
    ) -> Result<OpenedRequest, ExchangeError> {
        request.check_version()?;

        let ciphertext = request.secret_ciphertext_bytes()?;
        let secret = self.handshake.open_inbound(&ciphertext, session_private_key)?;

        let envelope = Envelope::from_wire(&request.encrypted_data)?;
        let plaintext = open(&envelope, &secret, &request.session_id)?;

        let payload = GatewayRequestPayload::from_bytes(&plaintext)?;
        payload.validate_target()?;

        let client_public_key = request.client_public_key_bytes()?;

        debug!(
            session = session_tag(&request.session_id),
            method = %payload.method,
            target = %payload.final_api,
            "request opened"
        );

        Ok(OpenedRequest { session_id: request.session_id.clone(), client_public_key, payload })
    }

    /// Seal `body` for the client that sent `request`.
    ///
    /// Encapsulates a fresh secret against the client's ephemeral key and
    /// binds the envelope to the request's session.
    ///
    /// # Errors
    ///
    /// - `Format`: client public key rejected by the KEM, or body too large
    ///   to frame
    /// - `InvalidCiphertext`: KEM produced a ciphertext of the wrong length
    pub fn seal_response(
        &self,
        request: &OpenedRequest,
        body: &[u8],
        nonces: &SealNonces,
    ) -> Result<ExchangeResponse, ExchangeError> {
        let leg = self.handshake.open_outbound(&request.client_public_key)?;
        let envelope = seal(body, &leg.secret, &request.session_id, nonces)?;

        debug!(session = session_tag(&request.session_id), bytes = body.len(), "response sealed");

        Ok(ExchangeResponse::new(&leg.ciphertext, envelope.to_wire()))
    }
}
