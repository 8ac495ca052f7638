use std::collections::HashMap;

use rand::RngCore;
use serde_json::{Map, Value};

use vlink_crypto::{inner_aes, signer, whitebox};
use vlink_types::{now_epoch_ms, DeviceIdentity};

use crate::envelope::{raw_string_value, OuterEnvelope, DEVICE_TYPE, NETWORK_TYPE, OS_TYPE, PROTOCOL_VERSION};
use crate::Result;

/// Everything `build_request` needs that is not derivable from the
/// inner extras alone.
pub struct BuildRequestInput<'a> {
    pub country_code: &'a str,
    pub identifier: &'a str,
    pub language: &'a str,
    pub device: &'a DeviceIdentity,
    /// Endpoint-specific additions to the inner payload (e.g. `vin`,
    /// `requestSerial`, `instructionCode`, `controlParamsMap`).
    pub inner_extras: Map<String, Value>,
    /// MD5(password) for login, or the session's contentKey for
    /// authenticated calls.
    pub inner_key: &'a [u8],
    /// MD5(signToken) for authenticated calls, or MD5(password) for
    /// login.
    pub sign_key: &'a str,
}

/// Build the full wire request body: `{"request": "<wb-encoded outer
/// JSON>"}`.
pub fn build_request(input: BuildRequestInput) -> Result<String> {
    let imei_md5 = input.device.imei_md5();
    let req_timestamp = now_epoch_ms();
    let service_time = req_timestamp;
    let random = random_hex32();

    let mut inner = Map::new();
    inner.insert("deviceType".to_string(), Value::from(DEVICE_TYPE));
    inner.insert("imeiMD5".to_string(), Value::from(imei_md5.clone()));
    inner.insert("networkType".to_string(), Value::from(NETWORK_TYPE));
    inner.insert("random".to_string(), Value::from(random));
    inner.insert("timeStamp".to_string(), Value::from(req_timestamp));
    inner.insert("version".to_string(), Value::from(PROTOCOL_VERSION));
    for (k, v) in input.inner_extras {
        inner.insert(k, v);
    }

    let inner_json = Value::Object(inner.clone());
    let encry_data = inner_aes::encrypt_hex(input.inner_key, inner_json.to_string().as_bytes())?;

    let inner_raw: HashMap<String, String> = inner
        .iter()
        .map(|(k, v)| (k.clone(), raw_string_value(v)))
        .collect();

    let outer = signer::OuterIdentifiers {
        country_code: input.country_code,
        identifier: input.identifier,
        imei_md5: &imei_md5,
        language: input.language,
        req_timestamp: &req_timestamp.to_string(),
    };
    let sign = signer::sign(&inner_raw, &outer, input.sign_key);
    let checkcode = signer::checkcode(
        input.identifier,
        &imei_md5,
        &req_timestamp.to_string(),
        &service_time.to_string(),
        input.sign_key,
    );

    let device_fields = OuterEnvelope::from_device(input.device);
    let envelope = OuterEnvelope {
        country_code: input.country_code.to_string(),
        identifier: input.identifier.to_string(),
        imei_md5,
        language: input.language.to_string(),
        req_timestamp,
        ostype: device_fields.ostype,
        imei: device_fields.imei,
        mac: device_fields.mac,
        model: device_fields.model,
        sdk: device_fields.sdk,
        modification: device_fields.modification,
        service_time,
        sign,
        checkcode,
        encry_data,
    };

    let outer_json = serde_json::to_string(&envelope)?;
    let wb_encoded = whitebox::encode_text_safe(outer_json.as_bytes())?;

    let mut wire = Map::new();
    wire.insert("request".to_string(), Value::from(wb_encoded));
    Ok(Value::Object(wire).to_string())
}

fn random_hex32() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
