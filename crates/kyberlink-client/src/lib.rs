//! Client
//!
//! Sends requests through a KyberLink gateway. Each call runs one exchange:
//! fetch the gateway's session key, encapsulate, seal the request, deliver
//! it, decapsulate the response with a one-time key and open it.
//!
//! # Components
//!
//! - [`KyberLinkClient`]: cloneable entry point, `send` per request
//! - [`Exchange`]: state-tracked orchestration of a single round trip
//! - [`Transport`]: collaborator that moves messages to the gateway
//! - [`ClientConfig`]: gateway URL and timeout
//!
//! # Transport (optional)
//!
//! With the `http` feature enabled, this crate also provides:
//! - [`http::HttpTransport`]: `reqwest` transport for `/kempublic` and
//!   `/gateway`
//! - `KyberLinkClient::from_config`: client over that transport

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
pub mod config;
mod exchange;
pub mod transport;

#[cfg(feature = "http")]
pub mod http;

pub use client::KyberLinkClient;
pub use config::{ClientConfig, ConfigError};
pub use exchange::{Exchange, SecureResponse};
pub use kyberlink_core::{Environment, ExchangeError, ExchangeState, SystemEnv, TransportError};
pub use kyberlink_proto::ResponseBody;
pub use transport::Transport;
