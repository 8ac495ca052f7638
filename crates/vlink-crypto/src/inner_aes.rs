//! Inner AES-CBC layer (C2): AES-128-CBC, zero IV, PKCS#7, keyed per
//! session. Ciphertext crosses the wire as uppercase hex in
//! `encryData`/`respondData`.

use crate::{cbc_codec, CryptoError, Result};

/// Derive the login-call inner key: MD5(password).
pub fn login_key(password: &str) -> [u8; 16] {
    md5::compute(password.as_bytes()).0
}

/// Derive the authenticated-call inner key: MD5(encryToken). Stored on
/// the session as `contentKey` already in this form; this helper exists
/// for callers deriving it fresh from a login response.
pub fn content_key(encry_token: &str) -> [u8; 16] {
    md5::compute(encry_token.as_bytes()).0
}

/// Encrypt `plaintext` under `key`, returning uppercase hex.
pub fn encrypt_hex(key: &[u8], plaintext: &[u8]) -> Result<String> {
    let ciphertext = cbc_codec::encrypt(key, plaintext)?;
    Ok(hex::encode_upper(ciphertext))
}

/// Decrypt uppercase (or lowercase) hex `ciphertext_hex` under `key`.
pub fn decrypt_hex(key: &[u8], ciphertext_hex: &str) -> Result<Vec<u8>> {
    let raw = hex::decode(ciphertext_hex).map_err(|e| CryptoError::HexDecode(e.to_string()))?;
    cbc_codec::decrypt(key, &raw)
}
