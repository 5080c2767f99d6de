//! Protocol logic for KyberLink exchanges.
//!
//! Sits between the cryptographic primitives (`kyberlink-crypto`) and the
//! wire messages (`kyberlink-proto`). Everything here is synchronous and
//! I/O free: randomness and time come from an [`Environment`], network
//! access lives with the client's transport.
//!
//! # Components
//!
//! - [`ChannelHandshake`]: KEM operations for both legs, with ciphertext
//!   length checks ahead of decapsulation
//! - [`ExchangeState`]: the linear exchange pipeline
//! - [`Responder`]: gateway-side open/seal, used by the loopback harness
//! - [`ReplayGuard`]: timestamp window and nonce dedupe for responders
//! - [`ExchangeError`] / [`TransportError`]: failures shared by every layer
//!   above

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod handshake;
pub mod replay;
pub mod responder;
pub mod state;
pub mod system_env;

pub use env::Environment;
pub use error::{ExchangeError, TransportError};
pub use handshake::{ChannelHandshake, Encapsulation};
pub use replay::{DEFAULT_REPLAY_WINDOW, ReplayConfig, ReplayError, ReplayGuard};
pub use responder::{OpenedRequest, Responder};
pub use state::{ExchangeState, session_tag};
pub use system_env::SystemEnv;
