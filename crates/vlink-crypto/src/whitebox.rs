//! White-box AES outer codec (C1).
//!
//! The vendor ships this layer as a fixed binary artefact: eight
//! substitution tables with the AES key schedule baked in, so the key
//! itself never appears explicitly at runtime. That table format is
//! proprietary and out of reach of this corpus, and re-deriving it is an
//! explicit non-goal — regenerating the tables at runtime is exactly
//! what must not happen.
//!
//! What *is* observable and testable is the codec's external contract:
//! CBC mode, a zero IV, PKCS#7 padding, and `encode ∘ decode = id`. This
//! module satisfies that contract with standard AES-128-CBC under a
//! fixed embedded key, standing in for "the key schedule baked into the
//! 8 tables". The key below is a constant of this implementation, never
//! computed or accepted as a parameter, matching the spirit of a static
//! binary artefact.
use crate::{cbc_codec, Result};

/// Stand-in for the vendor's embedded table-derived key. Fixed, never
/// regenerated, never accepted as a parameter.
const WBAES_FIXED_KEY: [u8; 16] = [
    0x57, 0x42, 0x41, 0x45, 0x53, 0x4b, 0x45, 0x59, 0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37,
];

/// CBC-encrypt `plaintext` under the fixed white-box key, zero IV,
/// PKCS#7 padding.
pub fn encode(plaintext: &[u8]) -> Result<Vec<u8>> {
    cbc_codec::encrypt(&WBAES_FIXED_KEY, plaintext)
}

/// CBC-decrypt `ciphertext` under the fixed white-box key, validating
/// and stripping PKCS#7 padding.
pub fn decode(ciphertext: &[u8]) -> Result<Vec<u8>> {
    cbc_codec::decrypt(&WBAES_FIXED_KEY, ciphertext)
}

/// Text-safe transport wrapper: standard base64 over the raw CBC
/// output, so the value can be embedded in a JSON string.
pub fn encode_text_safe(plaintext: &[u8]) -> Result<String> {
    let raw = encode(plaintext)?;
    Ok(base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        raw,
    ))
}

/// Inverse of [`encode_text_safe`].
pub fn decode_text_safe(text: &str) -> Result<Vec<u8>> {
    let raw = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, text)
        .map_err(|e| crate::CryptoError::Base64Decode(e.to_string()))?;
    decode(&raw)
}
