//! Deterministic test harness for KyberLink.
//!
//! In-process implementations of the client's collaborators so exchanges can
//! be tested end to end without a network:
//!
//! - [`SimEnv`]: seeded randomness and a manually driven wall clock
//! - [`LoopbackGateway`]: a [`kyberlink_client::Transport`] that runs the
//!   gateway's half of the protocol, with one-shot sessions, replay
//!   protection, a pluggable backend and fault injection

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod loopback;
pub mod sim_env;

pub use loopback::{Backend, Fault, GatewayStats, LoopbackGateway, SESSION_TTL, echo_backend};
pub use sim_env::{SIM_EPOCH_SECS, SimEnv};
