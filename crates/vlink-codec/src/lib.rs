//! Envelope builder/parser (C4): assembles the outer payload, drives
//! the inner encryption and signing, and parses responses back into
//! `(code, message, respondData)`.

pub mod envelope;
pub mod parse;
pub mod request;

pub use envelope::{DEVICE_TYPE, NETWORK_TYPE, OS_TYPE, PROTOCOL_VERSION};
pub use parse::{parse_response, ParsedResponse};
pub use request::{build_request, BuildRequestInput};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Crypto(#[from] vlink_crypto::CryptoError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed envelope: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
