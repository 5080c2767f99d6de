//! HTTP transport for the client.
//!
//! Talks to a gateway over two endpoints:
//!
//! - `GET {gateway}/kempublic` returns the [`RemoteIdentity`]
//! - `POST {gateway}/gateway` takes an [`ExchangeRequest`] JSON body and
//!   returns an [`ExchangeResponse`]
//!
//! A non-success status becomes [`TransportError::Status`] with the body
//! text. This is a thin layer; all protocol logic stays in the exchange.

use async_trait::async_trait;
use kyberlink_core::TransportError;
use kyberlink_proto::{ExchangeRequest, ExchangeResponse, RemoteIdentity};

use crate::{config::ClientConfig, transport::Transport};

/// Path of the identity endpoint
pub const IDENTITY_PATH: &str = "/kempublic";

/// Path of the exchange endpoint
pub const GATEWAY_PATH: &str = "/gateway";

/// `reqwest` backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport with the configured base URL and timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Unreachable(format!("http client setup failed: {e}")))?;

        Ok(Self { http, base_url: config.base_url().to_string() })
    }

    /// Gateway base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_body(response: reqwest::Response) -> Result<String, TransportError> {
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;

        if status.is_success() {
            Ok(body)
        } else {
            tracing::debug!(status = status.as_u16(), "gateway returned error status");
            Err(TransportError::Status { status: status.as_u16(), body })
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_remote_identity(&self) -> Result<RemoteIdentity, TransportError> {
        let url = format!("{}{IDENTITY_PATH}", self.base_url);
        let response = self.http.get(&url).send().await.map_err(map_reqwest_error)?;
        let body = Self::read_body(response).await?;

        serde_json::from_str(&body).map_err(|e| TransportError::Decode(format!("identity: {e}")))
    }

    async fn deliver(&self, request: &ExchangeRequest) -> Result<ExchangeResponse, TransportError> {
        let url = format!("{}{GATEWAY_PATH}", self.base_url);
        let response = self.http.post(&url).json(request).send().await.map_err(map_reqwest_error)?;
        let body = Self::read_body(response).await?;

        ExchangeResponse::from_json(&body)
            .map_err(|e| TransportError::Decode(format!("response: {e}")))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else {
        TransportError::Unreachable(err.to_string())
    }
}
