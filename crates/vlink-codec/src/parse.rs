use serde::Deserialize;
use serde_json::Value;

use vlink_crypto::{inner_aes, whitebox};

use crate::{CodecError, Result};

#[derive(Debug, Deserialize)]
struct ResponseBody {
    code: i64,
    message: String,
    #[serde(rename = "respondData", default)]
    respond_data: String,
}

/// A parsed, decrypted server response.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

/// Extract `response`, white-box decode it, JSON-parse the result, and
/// (if `respondData` is non-empty) inner-AES-decrypt it with `inner_key`.
pub fn parse_response(wire: &str, inner_key: &[u8]) -> Result<ParsedResponse> {
    let wrapper: Value = serde_json::from_str(wire)?;
    let encoded = wrapper
        .get("response")
        .and_then(Value::as_str)
        .ok_or_else(|| CodecError::Malformed("missing `response` field".to_string()))?;

    let decoded = whitebox::decode_text_safe(encoded)?;
    let body: ResponseBody = serde_json::from_slice(&decoded)?;

    let data = if body.respond_data.is_empty() {
        None
    } else {
        let plaintext = inner_aes::decrypt_hex(inner_key, &body.respond_data)?;
        Some(serde_json::from_slice(&plaintext)?)
    };

    Ok(ParsedResponse {
        code: body.code,
        message: body.message,
        data,
    })
}
