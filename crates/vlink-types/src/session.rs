use serde::{Deserialize, Serialize};

/// The authenticated session tuple. Immutable once created; a re-auth
/// produces a wholly new `Session`, it never mutates an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    /// Upper-hex MD5(signToken), used as the signer's `key=` suffix for
    /// authenticated calls.
    pub sign_key: String,
    /// Raw signToken as returned by the server, kept for reference.
    pub sign_token: String,
    /// Upper-hex MD5(encryToken), the inner AES key for authenticated
    /// calls.
    pub content_key: String,
    pub created_at: u64,
    pub ttl_seconds: u64,
}

impl Session {
    /// Builds a session from the server's login response fields:
    /// `userId`, `signToken`, and `encryToken`. `signKey` and
    /// `contentKey` are derived here, not accepted pre-computed, so
    /// there is exactly one place in the codebase that performs this
    /// derivation.
    pub fn new(
        user_id: impl Into<String>,
        sign_token: impl Into<String>,
        encry_token: &str,
        created_at: u64,
        ttl_seconds: u64,
    ) -> Self {
        let sign_token = sign_token.into();
        let sign_key = format!("{:X}", md5::compute(sign_token.as_bytes()));
        let content_key = format!("{:X}", md5::compute(encry_token.as_bytes()));
        Self {
            user_id: user_id.into(),
            sign_key,
            sign_token,
            content_key,
            created_at,
            ttl_seconds,
        }
    }

    pub fn is_expired(&self, now_epoch_secs: u64) -> bool {
        now_epoch_secs >= self.created_at.saturating_add(self.ttl_seconds)
    }

    /// The raw 16 bytes backing `contentKey`, for use as the inner
    /// AES-CBC key.
    pub fn content_key_bytes(&self) -> Vec<u8> {
        hex::decode(&self.content_key).unwrap_or_default()
    }
}
