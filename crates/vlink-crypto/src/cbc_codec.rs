//! Shared AES-128-CBC/zero-IV/PKCS#7 primitive used by both the
//! white-box stand-in ([`crate::whitebox`]) and the inner per-session
//! layer ([`crate::inner_aes`]). Both layers use identical block-cipher
//! parameters; only the key differs.

use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::{CryptoError, Result};

const ZERO_IV: [u8; 16] = [0u8; 16];
pub const KEY_SIZE: usize = 16;

type Enc = cbc::Encryptor<Aes128>;
type Dec = cbc::Decryptor<Aes128>;

/// Encrypt `plaintext` under `key` with a zero IV and PKCS#7 padding.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let key = require_key(key)?;
    Ok(Enc::new(key.into(), &ZERO_IV.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypt `ciphertext` under `key`, validating and stripping PKCS#7
/// padding.
pub fn decrypt(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let key = require_key(key)?;
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(CryptoError::InvalidCiphertextLength);
    }
    Dec::new(key.into(), &ZERO_IV.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::InvalidPadding)
}

fn require_key(key: &[u8]) -> Result<&[u8; KEY_SIZE]> {
    key.try_into()
        .map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: key.len(),
        })
}
