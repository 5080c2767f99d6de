//! In-process gateway.
//!
//! [`LoopbackGateway`] implements the client's [`Transport`] by running the
//! gateway's half of the protocol directly: it issues sessions, opens
//! requests with the [`Responder`], enforces replay protection, calls a
//! backend closure and seals the backend's reply for the client.
//!
//! # Sessions
//!
//! Every identity fetch creates a session with its own ML-KEM-1024 key pair.
//! A session is consumed by the first request that names it, whatever the
//! outcome, and expires after [`SESSION_TTL`] on the environment's clock.
//! Expired sessions are evicted whenever a session is issued or looked up.
//!
//! # Faults
//!
//! Queued [`Fault`]s are applied to subsequent `deliver` calls in FIFO
//! order, one fault per call.

#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use kyberlink_client::Transport;
use kyberlink_core::{
    ChannelHandshake, Environment, ExchangeError, OpenedRequest, ReplayConfig, ReplayGuard,
    Responder, TransportError, session_tag,
};
use kyberlink_crypto::{EphemeralKeyPair, Envelope, MlKemProvider};
use kyberlink_proto::{
    ExchangeRequest, ExchangeResponse, GatewayRequestPayload, RemoteIdentity, encode_base64,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::sim_env::SimEnv;

/// Lifetime of an unused session.
pub const SESSION_TTL: Duration = Duration::from_secs(300);

/// Backend reached by accepted requests.
///
/// Returns the raw reply body, or `None` when the backend is unreachable.
pub type Backend = Arc<dyn Fn(&GatewayRequestPayload) -> Option<Vec<u8>> + Send + Sync>;

/// Fault applied to one `deliver` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Answer with an error status without touching the request
    Status {
        /// Status code
        status: u16,
        /// Body text
        body: String,
    },
    /// Fail as if the gateway could not be reached
    Unreachable,
    /// Wait before processing; combined with a timeout this drops the call
    Delay(Duration),
    /// Cut the response KEM ciphertext to this many bytes
    TruncateCiphertext(usize),
    /// Append the sealed salt/IV block to the response KEM ciphertext
    CombinedCiphertext,
    /// Flip one bit of the response payload ciphertext
    CorruptEnvelope,
    /// Seal the response under a different session id
    WrongSession,
    /// Answer with a protocol version the client does not speak
    WrongVersion(u32),
}

/// Counters for assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Identities handed out
    pub sessions_issued: u64,
    /// Requests that reached the backend
    pub requests_accepted: u64,
    /// Requests refused before the backend
    pub requests_rejected: u64,
}

struct Session {
    keys: EphemeralKeyPair,
    expires_at: u64,
}

struct GatewayState {
    sessions: HashMap<String, Session>,
    replay: ReplayGuard,
    faults: VecDeque<Fault>,
    stats: GatewayStats,
}

impl GatewayState {
    fn evict_expired(&mut self, now: u64) {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| now <= session.expires_at);
        let evicted = before - self.sessions.len();
        if evicted > 0 {
            debug!(evicted, "expired sessions evicted");
        }
    }
}

/// Gateway running in the test process.
///
/// Clone shares sessions, replay state, faults and statistics.
#[derive(Clone)]
pub struct LoopbackGateway<E: Environment = SimEnv> {
    env: E,
    handshake: ChannelHandshake<MlKemProvider>,
    responder: Responder<MlKemProvider>,
    backend: Backend,
    timeout: Option<Duration>,
    state: Arc<Mutex<GatewayState>>,
}

impl<E: Environment> fmt::Debug for LoopbackGateway<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackGateway")
            .field("timeout", &self.timeout)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<E: Environment> LoopbackGateway<E> {
    /// Gateway with the echo backend and the default replay window.
    pub fn new(env: E) -> Self {
        Self::with_backend(env, Arc::new(echo_backend))
    }

    /// Gateway with a custom backend.
    pub fn with_backend(env: E, backend: Backend) -> Self {
        Self {
            env,
            handshake: ChannelHandshake::new(MlKemProvider::new()),
            responder: Responder::new(MlKemProvider::new()),
            backend,
            timeout: None,
            state: Arc::new(Mutex::new(GatewayState {
                sessions: HashMap::new(),
                replay: ReplayGuard::new(ReplayConfig::default()),
                faults: VecDeque::new(),
                stats: GatewayStats::default(),
            })),
        }
    }

    /// Fail `deliver` calls that take longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the replay guard configuration.
    #[must_use]
    pub fn with_replay_config(self, config: ReplayConfig) -> Self {
        self.lock().replay = ReplayGuard::new(config);
        self
    }

    /// Queue a fault for a later `deliver` call.
    pub fn inject(&self, fault: Fault) {
        self.lock().faults.push_back(fault);
    }

    /// Current counters
    pub fn stats(&self) -> GatewayStats {
        self.lock().stats
    }

    /// Sessions issued but not yet consumed
    pub fn open_sessions(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Process a request without the transport's timeout or faults.
    ///
    /// Status errors carry the same body a real gateway would send.
    pub fn handle(&self, request: &ExchangeRequest) -> Result<ExchangeResponse, TransportError> {
        self.handle_with(request, None)
    }

    fn handle_with(
        &self,
        request: &ExchangeRequest,
        fault: Option<&Fault>,
    ) -> Result<ExchangeResponse, TransportError> {
        let tag = session_tag(&request.session_id);
        let now = self.env.wall_clock_secs();

        let Some(session) = self.take_session(&request.session_id, now) else {
            return Err(self.reject(tag, 401, "Invalid or expired session"));
        };

        let opened = match self.responder.open_request(request, session.keys.private_key()) {
            Ok(opened) => opened,
            Err(err) => return Err(self.reject(tag, 400, err.public_reason())),
        };
        drop(session);

        let replay = {
            let mut state = self.lock();
            state.replay.check(&opened.payload.nonce, opened.payload.timestamp, now)
        };
        if let Err(err) = replay {
            warn!(session = tag, error = %err, "replay detected");
            return Err(self.reject(tag, 401, "Replay Detected"));
        }

        let Some(body) = (self.backend)(&opened.payload) else {
            return Err(self.reject(tag, 502, "Backend unreachable"));
        };
        self.lock().stats.requests_accepted += 1;

        let response = self.seal(&opened, &body, fault).map_err(|err| TransportError::Status {
            status: 500,
            body: err.public_reason().to_string(),
        })?;

        debug!(session = tag, bytes = body.len(), "response ready");
        Ok(response)
    }

    fn seal(
        &self,
        opened: &OpenedRequest,
        body: &[u8],
        fault: Option<&Fault>,
    ) -> Result<ExchangeResponse, ExchangeError> {
        let nonces = self.env.seal_nonces();

        let mut response = if fault == Some(&Fault::WrongSession) {
            let mut other = opened.clone();
            other.session_id.push_str("-other");
            self.responder.seal_response(&other, body, &nonces)?
        } else {
            self.responder.seal_response(opened, body, &nonces)?
        };

        match fault {
            Some(Fault::TruncateCiphertext(len)) => {
                let mut ciphertext = response.secret_ciphertext_bytes()?;
                ciphertext.truncate(*len);
                response.secret_ciphertext = encode_base64(&ciphertext);
            },
            Some(Fault::CombinedCiphertext) => {
                let mut ciphertext = response.secret_ciphertext_bytes()?;
                let envelope = Envelope::from_wire(&response.encrypted_data)?;
                ciphertext.extend_from_slice(envelope.metadata_ciphertext());
                response.secret_ciphertext = encode_base64(&ciphertext);
            },
            Some(Fault::CorruptEnvelope) => {
                let mut bytes = Envelope::from_wire(&response.encrypted_data)?.to_bytes();
                if let Some(last) = bytes.last_mut() {
                    *last ^= 0x01;
                }
                response.encrypted_data = encode_base64(&bytes);
            },
            Some(Fault::WrongVersion(v)) => response.v = *v,
            _ => {},
        }

        Ok(response)
    }

    /// Remove and return a live session. Expired sessions never come back.
    fn take_session(&self, session_id: &str, now: u64) -> Option<Session> {
        let mut state = self.lock();
        state.evict_expired(now);
        state.sessions.remove(session_id)
    }

    fn reject(&self, tag: &str, status: u16, body: &str) -> TransportError {
        warn!(session = tag, status, reason = body, "request rejected");
        self.lock().stats.requests_rejected += 1;
        TransportError::Status { status, body: body.to_string() }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GatewayState> {
        self.state.lock().expect("LoopbackGateway mutex poisoned")
    }
}

#[async_trait]
impl<E: Environment> Transport for LoopbackGateway<E> {
    async fn fetch_remote_identity(&self) -> Result<RemoteIdentity, TransportError> {
        let keys = self.handshake.prepare_return_leg().map_err(|err| TransportError::Status {
            status: 500,
            body: err.public_reason().to_string(),
        })?;

        let mut id = [0u8; 32];
        self.env.random_bytes(&mut id);
        let session_id = hex::encode(id);

        let identity = RemoteIdentity::new(session_id.clone(), keys.public_key());
        let now = self.env.wall_clock_secs();
        let expires_at = now.saturating_add(SESSION_TTL.as_secs());

        let mut state = self.lock();
        state.evict_expired(now);
        state.sessions.insert(session_id, Session { keys, expires_at });
        state.stats.sessions_issued += 1;
        drop(state);

        debug!(session = session_tag(&identity.session_id), "session issued");
        Ok(identity)
    }

    async fn deliver(&self, request: &ExchangeRequest) -> Result<ExchangeResponse, TransportError> {
        let fault = self.lock().faults.pop_front();

        let work = async {
            match &fault {
                Some(Fault::Status { status, body }) => {
                    Err(TransportError::Status { status: *status, body: body.clone() })
                },
                Some(Fault::Unreachable) => {
                    Err(TransportError::Unreachable("loopback gateway offline".to_string()))
                },
                Some(Fault::Delay(delay)) => {
                    tokio::time::sleep(*delay).await;
                    self.handle_with(request, None)
                },
                other => self.handle_with(request, other.as_ref()),
            }
        };

        match self.timeout {
            Some(limit) => {
                tokio::time::timeout(limit, work).await.map_err(|_| TransportError::Timeout)?
            },
            None => work.await,
        }
    }
}

/// Backend that reports what it received.
pub fn echo_backend(payload: &GatewayRequestPayload) -> Option<Vec<u8>> {
    serde_json::to_vec(&json!({
        "status": "success",
        "endpoint": payload.final_api,
        "method": payload.method,
        "received": payload.payload,
    }))
    .ok()
}
