//! Exchange orchestration.
//!
//! Drives one request/response round trip through the states in
//! [`ExchangeState`]. Every step either advances the state or moves the
//! exchange to `Failed` and returns the originating error. There is no
//! retry and no partial result.
//!
//! Key material is scoped to [`Exchange::run`]: the ephemeral key pair and
//! both shared secrets are zeroized when it returns, on every path
//! (including cancellation of the future).

use kyberlink_core::{ChannelHandshake, Environment, ExchangeError, ExchangeState, session_tag};
use kyberlink_crypto::{Envelope, Kem, open, seal};
use kyberlink_proto::{ExchangeRequest, ExchangeResponse, GatewayRequestPayload, ResponseBody};
use tracing::{debug, warn};

use crate::transport::Transport;

/// Decrypted response plus the message it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SecureResponse {
    /// Authenticated response body
    pub data: ResponseBody,
    /// Response message as received
    pub original: ExchangeResponse,
}

/// One in-flight exchange.
///
/// Single use: once `run` returns the exchange is terminal.
pub struct Exchange<'a, T: Transport, K: Kem, E: Environment> {
    transport: &'a T,
    handshake: &'a ChannelHandshake<K>,
    env: &'a E,
    state: ExchangeState,
    session_id: Option<String>,
}

impl<'a, T: Transport, K: Kem, E: Environment> Exchange<'a, T, K, E> {
    /// Prepare an idle exchange.
    pub fn new(transport: &'a T, handshake: &'a ChannelHandshake<K>, env: &'a E) -> Self {
        Self { transport, handshake, env, state: ExchangeState::Idle, session_id: None }
    }

    /// Current state
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Session id issued by the gateway, once fetched
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Run the full round trip for `payload`.
    ///
    /// # Errors
    ///
    /// - `Transport`: identity fetch or delivery failed
    /// - `InvalidCiphertext`: response KEM ciphertext has the wrong length
    /// - `KeyDerivation`: KEM produced a malformed secret
    /// - `Format`: malformed message, key, envelope or unsupported version
    /// - `Authentication`: response envelope failed to verify
    /// - `InvalidState`: exchange already ran
    pub async fn run(
        &mut self,
        payload: &GatewayRequestPayload,
    ) -> Result<SecureResponse, ExchangeError> {
        match self.drive(payload).await {
            Ok(response) => Ok(response),
            Err(err) => {
                self.fail(&err);
                Err(err)
            },
        }
    }

    async fn drive(
        &mut self,
        payload: &GatewayRequestPayload,
    ) -> Result<SecureResponse, ExchangeError> {
        if self.state != ExchangeState::Idle {
            return Err(ExchangeError::InvalidState {
                from: self.state,
                to: ExchangeState::IdentityFetched,
            });
        }

        let identity = self.transport.fetch_remote_identity().await?;
        self.session_id = Some(identity.session_id.clone());
        self.advance(ExchangeState::IdentityFetched)?;
        let session_id = identity.session_id.as_str();

        let remote_public_key = identity.public_key_bytes()?;
        let outbound = self.handshake.open_outbound(&remote_public_key)?;
        let ephemeral = self.handshake.prepare_return_leg()?;
        self.advance(ExchangeState::Encapsulated)?;

        let plaintext = payload.to_bytes()?;
        let envelope = seal(&plaintext, &outbound.secret, session_id, &self.env.seal_nonces())?;
        let request = ExchangeRequest::new(
            session_id,
            ephemeral.public_key(),
            &outbound.ciphertext,
            envelope.to_wire(),
        );
        drop(outbound);
        self.advance(ExchangeState::RequestEnvelopeBuilt)?;

        self.advance(ExchangeState::RequestSent)?;
        let response = self.transport.deliver(&request).await?;
        response.check_version()?;
        self.advance(ExchangeState::ResponseReceived)?;

        let inbound_ciphertext = response.secret_ciphertext_bytes()?;
        let inbound = self.handshake.open_inbound(&inbound_ciphertext, ephemeral.private_key())?;
        drop(ephemeral);
        self.advance(ExchangeState::ResponseDecapsulated)?;

        let envelope = Envelope::from_wire(&response.encrypted_data)?;
        let body = open(&envelope, &inbound, session_id)?;
        self.advance(ExchangeState::ResponseEnvelopeDecoded)?;

        let data = ResponseBody::from_plaintext(body);
        self.advance(ExchangeState::Completed)?;

        Ok(SecureResponse { data, original: response })
    }

    fn advance(&mut self, to: ExchangeState) -> Result<(), ExchangeError> {
        let from = self.state;
        self.state = from.transition(to)?;
        debug!(session = self.tag(), ?from, ?to, "exchange transition");
        Ok(())
    }

    fn fail(&mut self, err: &ExchangeError) {
        let from = self.state;
        if from.can_transition_to(ExchangeState::Failed) {
            self.state = ExchangeState::Failed;
        }
        warn!(
            session = self.tag(),
            ?from,
            cryptographic = err.is_cryptographic(),
            error = %err,
            "exchange failed"
        );
    }

    fn tag(&self) -> &str {
        self.session_id.as_deref().map_or("-", session_tag)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicU8, Ordering},
    };

    use async_trait::async_trait;
    use kyberlink_core::{Responder, TransportError};
    use kyberlink_crypto::{EphemeralKeyPair, MlKemProvider, SealNonces};
    use kyberlink_proto::RemoteIdentity;
    use serde_json::json;

    use super::*;

    #[derive(Clone, Default)]
    struct TestEnv {
        counter: Arc<AtomicU8>,
    }

    impl Environment for TestEnv {
        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(self.counter.fetch_add(1, Ordering::Relaxed));
        }

        fn wall_clock_secs(&self) -> u64 {
            1_700_000_000
        }
    }

    /// In-process gateway that answers with a fixed body, optionally
    /// mangling the response.
    struct EchoTransport {
        session_keys: EphemeralKeyPair,
        responder: Responder<MlKemProvider>,
        mangle: fn(&mut ExchangeResponse),
        seen: Mutex<Vec<ExchangeRequest>>,
    }

    impl EchoTransport {
        fn new(mangle: fn(&mut ExchangeResponse)) -> Self {
            let handshake = ChannelHandshake::new(MlKemProvider::new());
            Self {
                session_keys: handshake.prepare_return_leg().unwrap(),
                responder: Responder::new(MlKemProvider::new()),
                mangle,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for EchoTransport {
        async fn fetch_remote_identity(&self) -> Result<RemoteIdentity, TransportError> {
            Ok(RemoteIdentity::new("sess-123", self.session_keys.public_key()))
        }

        async fn deliver(
            &self,
            request: &ExchangeRequest,
        ) -> Result<ExchangeResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            let opened = self
                .responder
                .open_request(request, self.session_keys.private_key())
                .map_err(|e| TransportError::Status {
                    status: 400,
                    body: e.public_reason().to_string(),
                })?;
            let body = serde_json::to_vec(&json!({"echo": opened.payload.payload})).unwrap();
            let mut response =
                self.responder.seal_response(&opened, &body, &SealNonces::random()).unwrap();
            (self.mangle)(&mut response);
            Ok(response)
        }
    }

    struct DownTransport;

    #[async_trait]
    impl Transport for DownTransport {
        async fn fetch_remote_identity(&self) -> Result<RemoteIdentity, TransportError> {
            Err(TransportError::Unreachable("connection refused".to_string()))
        }

        async fn deliver(
            &self,
            _request: &ExchangeRequest,
        ) -> Result<ExchangeResponse, TransportError> {
            Err(TransportError::Unreachable("connection refused".to_string()))
        }
    }

    fn payload() -> GatewayRequestPayload {
        GatewayRequestPayload {
            final_api: "/test1".to_string(),
            method: "POST".to_string(),
            payload: json!({"x": 1}),
            timestamp: 1_700_000_000,
            nonce: "abc".to_string(),
        }
    }

    #[tokio::test]
    async fn completes_round_trip() {
        let transport = EchoTransport::new(|_| {});
        let handshake = ChannelHandshake::new(MlKemProvider::new());
        let env = TestEnv::default();

        let mut exchange = Exchange::new(&transport, &handshake, &env);
        let response = exchange.run(&payload()).await.unwrap();

        assert_eq!(exchange.state(), ExchangeState::Completed);
        assert_eq!(exchange.session_id(), Some("sess-123"));
        assert_eq!(response.data.as_json(), Some(&json!({"echo": {"x": 1}})));
        assert_eq!(response.original.v, 1);
    }

    #[tokio::test]
    async fn request_carries_exact_kem_ciphertext() {
        let transport = EchoTransport::new(|_| {});
        let handshake = ChannelHandshake::new(MlKemProvider::new());
        let env = TestEnv::default();

        Exchange::new(&transport, &handshake, &env).run(&payload()).await.unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].secret_ciphertext_bytes().unwrap().len(), 1568);
        assert_eq!(seen[0].client_public_key_bytes().unwrap().len(), 1568);
    }

    #[tokio::test]
    async fn transport_failure_fails_exchange() {
        let handshake = ChannelHandshake::new(MlKemProvider::new());
        let env = TestEnv::default();

        let mut exchange = Exchange::new(&DownTransport, &handshake, &env);
        let err = exchange.run(&payload()).await.unwrap_err();

        assert!(err.is_transient());
        assert_eq!(exchange.state(), ExchangeState::Failed);
        assert_eq!(exchange.session_id(), None);
    }

    #[tokio::test]
    async fn truncated_response_ciphertext_is_rejected() {
        let transport = EchoTransport::new(|response| {
            let mut ciphertext = response.secret_ciphertext_bytes().unwrap();
            ciphertext.truncate(32);
            response.secret_ciphertext = kyberlink_proto::encode_base64(&ciphertext);
        });
        let handshake = ChannelHandshake::new(MlKemProvider::new());
        let env = TestEnv::default();

        let mut exchange = Exchange::new(&transport, &handshake, &env);
        let err = exchange.run(&payload()).await.unwrap_err();

        assert_eq!(err, ExchangeError::InvalidCiphertext { expected: 1568, actual: 32 });
        assert_eq!(exchange.state(), ExchangeState::Failed);
    }

    #[tokio::test]
    async fn tampered_response_envelope_fails_authentication() {
        let transport = EchoTransport::new(|response| {
            let mut bytes = Envelope::from_wire(&response.encrypted_data).unwrap().to_bytes();
            let last = bytes.len() - 1;
            bytes[last] ^= 0x01;
            response.encrypted_data = kyberlink_proto::encode_base64(&bytes);
        });
        let handshake = ChannelHandshake::new(MlKemProvider::new());
        let env = TestEnv::default();

        let err = Exchange::new(&transport, &handshake, &env).run(&payload()).await.unwrap_err();
        assert_eq!(err, ExchangeError::Authentication);
    }

    #[tokio::test]
    async fn unsupported_response_version_is_format_error() {
        let transport = EchoTransport::new(|response| response.v = 7);
        let handshake = ChannelHandshake::new(MlKemProvider::new());
        let env = TestEnv::default();

        let err = Exchange::new(&transport, &handshake, &env).run(&payload()).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Format(_)));
    }

    #[tokio::test]
    async fn exchange_is_single_use() {
        let transport = EchoTransport::new(|_| {});
        let handshake = ChannelHandshake::new(MlKemProvider::new());
        let env = TestEnv::default();

        let mut exchange = Exchange::new(&transport, &handshake, &env);
        exchange.run(&payload()).await.unwrap();
        let err = exchange.run(&payload()).await.unwrap_err();

        assert!(matches!(err, ExchangeError::InvalidState { from: ExchangeState::Completed, .. }));
        assert_eq!(exchange.state(), ExchangeState::Completed);
    }
}
