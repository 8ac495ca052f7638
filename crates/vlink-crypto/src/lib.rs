//! Envelope cryptography: the outer white-box AES layer, the inner
//! per-session AES-CBC layer, and the canonical-sort signer.
//!
//! These three pieces (C1, C2, C3) are kept independent and composed by
//! `vlink-codec`; nothing here knows about the envelope's JSON shape.

pub mod cbc_codec;
pub mod inner_aes;
pub mod signer;
pub mod whitebox;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    #[error("pkcs7 padding invalid")]
    InvalidPadding,
    #[error("ciphertext is not a multiple of the block size")]
    InvalidCiphertextLength,
    #[error("hex decode error: {0}")]
    HexDecode(String),
    #[error("base64 decode error: {0}")]
    Base64Decode(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
