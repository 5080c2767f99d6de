//! Transport collaborator.
//!
//! The exchange never touches the network itself. It asks a [`Transport`]
//! for the gateway's current identity and hands it the sealed request.
//! Timeouts, retries of the underlying connection and status handling are
//! the transport's business; every failure surfaces as a
//! [`TransportError`].

use std::sync::Arc;

use async_trait::async_trait;
use kyberlink_core::TransportError;
use kyberlink_proto::{ExchangeRequest, ExchangeResponse, RemoteIdentity};

/// Carries exchange messages to and from a gateway.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a fresh session id and KEM public key.
    async fn fetch_remote_identity(&self) -> Result<RemoteIdentity, TransportError>;

    /// Deliver a request and wait for the matching response.
    async fn deliver(&self, request: &ExchangeRequest) -> Result<ExchangeResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn fetch_remote_identity(&self) -> Result<RemoteIdentity, TransportError> {
        (**self).fetch_remote_identity().await
    }

    async fn deliver(&self, request: &ExchangeRequest) -> Result<ExchangeResponse, TransportError> {
        (**self).deliver(request).await
    }
}
