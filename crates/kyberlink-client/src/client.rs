//! Client entry point.
//!
//! [`KyberLinkClient`] turns a `(final_api, method, payload)` call into a
//! fresh [`Exchange`]: it stamps the payload with the current time and a
//! random nonce, then runs the round trip. Nothing survives between calls
//! except the transport, so concurrent `send`s never share key material.

use std::sync::Arc;

use kyberlink_core::{ChannelHandshake, Environment, ExchangeError, SystemEnv};
use kyberlink_crypto::{Kem, MlKemProvider};
use kyberlink_proto::GatewayRequestPayload;
use serde_json::Value;

use crate::{
    exchange::{Exchange, SecureResponse},
    transport::Transport,
};

/// Sends requests through a KyberLink gateway.
///
/// Cheap to clone; clones share the transport.
pub struct KyberLinkClient<T: Transport, K: Kem = MlKemProvider, E: Environment = SystemEnv> {
    transport: Arc<T>,
    handshake: ChannelHandshake<K>,
    env: E,
}

impl<T: Transport, K: Kem + Clone, E: Environment> Clone for KyberLinkClient<T, K, E> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            handshake: self.handshake.clone(),
            env: self.env.clone(),
        }
    }
}

impl<T: Transport> KyberLinkClient<T> {
    /// Client with ML-KEM-1024 and OS randomness.
    pub fn new(transport: T) -> Self {
        Self::with_parts(transport, MlKemProvider::new(), SystemEnv::new())
    }
}

impl<T: Transport, K: Kem, E: Environment> KyberLinkClient<T, K, E> {
    /// Client with an explicit KEM and environment.
    pub fn with_parts(transport: T, kem: K, env: E) -> Self {
        Self { transport: Arc::new(transport), handshake: ChannelHandshake::new(kem), env }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Environment used for nonces and timestamps
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Build the payload for one request.
    ///
    /// Timestamp is the environment's wall clock; nonce is a fresh UUID v4.
    pub fn build_payload(
        &self,
        final_api: &str,
        method: &str,
        payload: Value,
    ) -> GatewayRequestPayload {
        let timestamp = i64::try_from(self.env.wall_clock_secs()).unwrap_or(i64::MAX);
        GatewayRequestPayload {
            final_api: final_api.to_string(),
            method: method.to_string(),
            payload,
            timestamp,
            nonce: self.env.request_nonce(),
        }
    }

    /// Send one request and return the decrypted response.
    ///
    /// # Errors
    ///
    /// Any [`ExchangeError`]; see [`Exchange::run`].
    pub async fn send(
        &self,
        final_api: &str,
        method: &str,
        payload: Value,
    ) -> Result<SecureResponse, ExchangeError> {
        let payload = self.build_payload(final_api, method, payload);
        self.send_payload(&payload).await
    }

    /// Send a caller-built payload.
    ///
    /// # Errors
    ///
    /// Any [`ExchangeError`]; see [`Exchange::run`].
    pub async fn send_payload(
        &self,
        payload: &GatewayRequestPayload,
    ) -> Result<SecureResponse, ExchangeError> {
        let mut exchange = Exchange::new(self.transport.as_ref(), &self.handshake, &self.env);
        exchange.run(payload).await
    }
}

#[cfg(feature = "http")]
impl KyberLinkClient<crate::http::HttpTransport> {
    /// Client talking HTTP to the configured gateway.
    pub fn from_config(
        config: &crate::config::ClientConfig,
    ) -> Result<Self, kyberlink_core::TransportError> {
        Ok(Self::new(crate::http::HttpTransport::new(config)?))
    }
}
