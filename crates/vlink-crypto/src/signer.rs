//! Request signer (C3): canonical field ordering plus MD5/SHA-1 digests.

use std::collections::{BTreeMap, HashMap};

use sha1::{Digest, Sha1};

/// The five outer identifiers folded into the signed field union
/// alongside the inner-field map.
pub struct OuterIdentifiers<'a> {
    pub country_code: &'a str,
    pub identifier: &'a str,
    pub imei_md5: &'a str,
    pub language: &'a str,
    pub req_timestamp: &'a str,
}

/// Compute `sign`: union the inner fields with the five outer
/// identifiers, sort lexicographically by key, concatenate as
/// `k1=v1&k2=v2&...` with raw (non-URL-encoded) values, append
/// `&key=<sign_key>`, and take the upper-hex SHA-1 of the UTF-8 bytes.
pub fn sign(inner_fields: &HashMap<String, String>, outer: &OuterIdentifiers, sign_key: &str) -> String {
    let mut union: BTreeMap<&str, &str> = BTreeMap::new();
    for (k, v) in inner_fields {
        union.insert(k.as_str(), v.as_str());
    }
    union.insert("countryCode", outer.country_code);
    union.insert("identifier", outer.identifier);
    union.insert("imeiMD5", outer.imei_md5);
    union.insert("language", outer.language);
    union.insert("reqTimestamp", outer.req_timestamp);

    let mut body = union
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    body.push_str("&key=");
    body.push_str(sign_key);

    let digest = Sha1::digest(body.as_bytes());
    hex::encode_upper(digest)
}

/// Compute `checkcode`: upper-hex MD5 of the fixed concatenation
/// `identifier || imeiMD5 || reqTimestamp || serviceTime || signKey`.
pub fn checkcode(identifier: &str, imei_md5: &str, req_timestamp: &str, service_time: &str, sign_key: &str) -> String {
    let concatenated = format!("{identifier}{imei_md5}{req_timestamp}{service_time}{sign_key}");
    format!("{:X}", md5::compute(concatenated.as_bytes()))
}
