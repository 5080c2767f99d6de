//! Wire format for the KyberLink protocol.
//!
//! Every exchange is one JSON request and one JSON response over a plain
//! HTTP-style transport. Binary material (KEM keys, KEM ciphertexts and
//! envelopes) travels as standard base64 strings; the envelope contents are
//! opaque at this layer.
//!
//! ```text
//! GET  /kempublic  ──▶ RemoteIdentity   { sessionID, publicKey }
//! POST /gateway    ──▶ ExchangeRequest  { v, sessionID, clientPublicKey,
//!                                         secretCiphertext, encryptedData }
//!                  ◀── ExchangeResponse { v, secretCiphertext, encryptedData }
//! ```
//!
//! The request envelope carries a [`GatewayRequestPayload`]; the response
//! envelope carries whatever the backend returned, decoded as a
//! [`ResponseBody`].
//!
//! # Security
//!
//! Nothing at this layer is trusted. Decoding only checks shape and version;
//! authenticity comes from the envelope AEAD, and [`ResponseBody`] must only
//! be built from authenticated plaintext.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod message;
pub mod payload;

pub use errors::{ProtocolError, Result};
pub use message::{
    ExchangeRequest, ExchangeResponse, PROTOCOL_VERSION, RemoteIdentity, decode_base64,
    encode_base64,
};
pub use payload::{GatewayRequestPayload, ResponseBody};
