//! Known-answer test vector generator for the envelope crypto layer.
//!
//! Generates `test_vectors.json` covering the inner AES-CBC codec, the
//! white-box outer codec's external contract, and the canonical-sort
//! signer. This binary is the ground truth other implementations of the
//! wire protocol can check themselves against.
//!
//! Usage:
//!   vlink-testvec              # generate tests/fixtures/test_vectors.json
//!   vlink-testvec --verify     # verify the vectors on disk still match

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use vlink_crypto::signer::{self, OuterIdentifiers};
use vlink_crypto::{inner_aes, whitebox};

#[derive(Serialize, Deserialize)]
struct TestVectors {
    version: String,
    generated_by: String,
    vectors: BTreeMap<String, TestVector>,
}

#[derive(Serialize, Deserialize)]
struct TestVector {
    description: String,
    inputs: BTreeMap<String, String>,
    outputs: BTreeMap<String, String>,
}

fn generate_inner_aes_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();

    let login_key = inner_aes::login_key("correct-horse-battery-staple");
    vectors.insert(
        "inner_aes_login_key".to_string(),
        TestVector {
            description: "login key = MD5(password)".to_string(),
            inputs: BTreeMap::from([(
                "password".to_string(),
                "correct-horse-battery-staple".to_string(),
            )]),
            outputs: BTreeMap::from([("key".to_string(), hex::encode_upper(login_key))]),
        },
    );

    let content_key = inner_aes::content_key("encry-token-abc123");
    vectors.insert(
        "inner_aes_content_key".to_string(),
        TestVector {
            description: "content key = MD5(encryToken)".to_string(),
            inputs: BTreeMap::from([(
                "encry_token".to_string(),
                "encry-token-abc123".to_string(),
            )]),
            outputs: BTreeMap::from([("key".to_string(), hex::encode_upper(content_key))]),
        },
    );

    let plaintext = br#"{"vin":"LVSHFFAE0KE000001","requestSerial":"S1"}"#;
    let ciphertext_hex = inner_aes::encrypt_hex(&content_key, plaintext).expect("encrypt");
    vectors.insert(
        "inner_aes_roundtrip".to_string(),
        TestVector {
            description: "AES-128-CBC, zero IV, PKCS#7, keyed by content_key(\"encry-token-abc123\")"
                .to_string(),
            inputs: BTreeMap::from([
                ("key".to_string(), hex::encode_upper(content_key)),
                (
                    "plaintext".to_string(),
                    String::from_utf8(plaintext.to_vec()).expect("utf8"),
                ),
            ]),
            outputs: BTreeMap::from([("ciphertext_hex".to_string(), ciphertext_hex)]),
        },
    );

    vectors
}

fn generate_whitebox_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();

    let plaintext = br#"{"code":0,"message":"ok","respondData":""}"#;
    let encoded = whitebox::encode_text_safe(plaintext).expect("encode");
    vectors.insert(
        "whitebox_encode_text_safe".to_string(),
        TestVector {
            description: "outer white-box codec: CBC/zero-IV/PKCS#7 under the fixed embedded key, base64-wrapped".to_string(),
            inputs: BTreeMap::from([(
                "plaintext".to_string(),
                String::from_utf8(plaintext.to_vec()).expect("utf8"),
            )]),
            outputs: BTreeMap::from([("encoded".to_string(), encoded)]),
        },
    );

    vectors
}

fn generate_signer_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();

    let mut inner = HashMap::new();
    inner.insert("vin".to_string(), "LVSHFFAE0KE000001".to_string());
    inner.insert("requestSerial".to_string(), "S1".to_string());
    let outer = OuterIdentifiers {
        country_code: "US",
        identifier: "1434",
        imei_md5: "ABCDEF0123456789ABCDEF0123456789",
        language: "en",
        req_timestamp: "1770817900000",
    };
    let sign = signer::sign(&inner, &outer, "signkey");
    vectors.insert(
        "signer_sign".to_string(),
        TestVector {
            description: "sign = SHA1(sorted inner-field union with outer identifiers, &key=signKey)".to_string(),
            inputs: BTreeMap::from([
                ("vin".to_string(), "LVSHFFAE0KE000001".to_string()),
                ("requestSerial".to_string(), "S1".to_string()),
                ("countryCode".to_string(), outer.country_code.to_string()),
                ("identifier".to_string(), outer.identifier.to_string()),
                ("imeiMD5".to_string(), outer.imei_md5.to_string()),
                ("language".to_string(), outer.language.to_string()),
                ("reqTimestamp".to_string(), outer.req_timestamp.to_string()),
                ("sign_key".to_string(), "signkey".to_string()),
            ]),
            outputs: BTreeMap::from([("sign".to_string(), sign)]),
        },
    );

    let checkcode = signer::checkcode(
        "1434",
        "ABCDEF0123456789ABCDEF0123456789",
        "1770817900000",
        "1770817900000",
        "signkey",
    );
    vectors.insert(
        "signer_checkcode".to_string(),
        TestVector {
            description: "checkcode = MD5(identifier || imeiMD5 || reqTimestamp || serviceTime || signKey)".to_string(),
            inputs: BTreeMap::from([
                ("identifier".to_string(), "1434".to_string()),
                ("imei_md5".to_string(), "ABCDEF0123456789ABCDEF0123456789".to_string()),
                ("req_timestamp".to_string(), "1770817900000".to_string()),
                ("service_time".to_string(), "1770817900000".to_string()),
                ("sign_key".to_string(), "signkey".to_string()),
            ]),
            outputs: BTreeMap::from([("checkcode".to_string(), checkcode)]),
        },
    );

    vectors
}

fn generate_all_vectors() -> TestVectors {
    let mut all_vectors = BTreeMap::new();

    all_vectors.extend(generate_inner_aes_vectors());
    all_vectors.extend(generate_whitebox_vectors());
    all_vectors.extend(generate_signer_vectors());

    TestVectors {
        version: "1.0".to_string(),
        generated_by: "vlink-testvec".to_string(),
        vectors: all_vectors,
    }
}

fn verify_vectors(vectors: &TestVectors) -> bool {
    let regenerated = generate_all_vectors();
    let mut all_pass = true;

    for (name, expected) in &vectors.vectors {
        if let Some(actual) = regenerated.vectors.get(name) {
            if actual.outputs != expected.outputs {
                eprintln!("FAIL: {name}");
                eprintln!("  expected: {:?}", expected.outputs);
                eprintln!("  actual:   {:?}", actual.outputs);
                all_pass = false;
            } else {
                eprintln!("PASS: {name}");
            }
        } else {
            eprintln!("MISSING: {name}");
            all_pass = false;
        }
    }

    all_pass
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let path = "tests/fixtures/test_vectors.json";

    if args.iter().any(|a| a == "--verify") {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let vectors: TestVectors = serde_json::from_str(&content).expect("valid JSON");
                if verify_vectors(&vectors) {
                    eprintln!("All test vectors verified successfully.");
                } else {
                    eprintln!("Test vector verification FAILED.");
                    std::process::exit(1);
                }
            }
            Err(_) => {
                eprintln!("No existing test vectors found at {path}. Generating...");
                let vectors = generate_all_vectors();
                let json = serde_json::to_string_pretty(&vectors).expect("serialize");
                if let Some(parent) = std::path::Path::new(path).parent() {
                    std::fs::create_dir_all(parent).expect("create dirs");
                }
                std::fs::write(path, &json).expect("write file");
                eprintln!("Generated test vectors to {path}");
            }
        }
    } else {
        let vectors = generate_all_vectors();
        let json = serde_json::to_string_pretty(&vectors).expect("serialize");

        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent).expect("create dirs");
        }

        std::fs::write(path, &json).expect("write file");
        eprintln!("Generated {} test vectors to {path}", vectors.vectors.len());

        if verify_vectors(&vectors) {
            eprintln!("Self-verification passed.");
        } else {
            eprintln!("Self-verification FAILED.");
            std::process::exit(1);
        }
    }
}
