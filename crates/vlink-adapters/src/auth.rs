//! `account/login` (C10 over C6). Not part of `AdapterContext` — the
//! caller doesn't have a session yet, and installing the returned one is
//! the caller's decision, not this function's.

use serde_json::Map;

use vlink_crypto::inner_aes;
use vlink_transport::{KeyMaterial, SecureTransport};
use vlink_types::{now_epoch_secs, Config, CoreError, Session};

use crate::Result;

const LOGIN_ENDPOINT: &str = "account/login";

/// Authenticates with `config`'s credentials and returns the freshly
/// minted session. Does not touch any session holder.
pub async fn login(transport: &SecureTransport, config: &Config) -> Result<Session> {
    let password_md5 = inner_aes::login_key(&config.password);

    let mut inner = Map::new();
    inner.insert("account".to_string(), config.username.clone().into());
    inner.insert("password".to_string(), config.password.clone().into());

    let parsed = transport
        .post_secure(
            LOGIN_ENDPOINT,
            inner,
            KeyMaterial::Login {
                password_md5,
            },
            false,
        )
        .await?;

    let data = parsed
        .data
        .ok_or_else(|| CoreError::ProtocolError("login response missing respondData".to_string()))?;
    let token = data
        .get("token")
        .ok_or_else(|| CoreError::ProtocolError("login response missing token".to_string()))?;
    let user_id = token
        .get("userId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CoreError::ProtocolError("login token missing userId".to_string()))?;
    let sign_token = token
        .get("signToken")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CoreError::ProtocolError("login token missing signToken".to_string()))?;
    let encry_token = token
        .get("encryToken")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CoreError::ProtocolError("login token missing encryToken".to_string()))?;

    Ok(Session::new(
        user_id,
        sign_token,
        encry_token,
        now_epoch_secs(),
        config.session_ttl_seconds,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vlink_crypto::whitebox;
    use vlink_session::SessionHolder;
    use vlink_types::DeviceIdentity;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> Config {
        Config {
            base_url,
            username: "u@x".to_string(),
            password: "p".to_string(),
            control_pin: "1234".to_string(),
            country_code: "US".to_string(),
            language: "en".to_string(),
            mqtt_enabled: true,
            mqtt_keepalive_secs: 60,
            mqtt_timeout_secs: 10,
            session_ttl_seconds: 43_200,
            poll_attempts: 10,
            poll_interval_ms: 1_500,
            http_timeout_secs: 5,
            user_agent: "okhttp/4.12.0".to_string(),
            device_identity: DeviceIdentity {
                imei: "123456789012345".to_string(),
                mac: "AA:BB:CC:DD:EE:FF".to_string(),
                model: "X1".to_string(),
                sdk: "30".to_string(),
                modification: "std".to_string(),
            },
        }
    }

    fn fake_response_body(code: i64, data: &serde_json::Value, inner_key: &[u8]) -> String {
        let respond_data = inner_aes::encrypt_hex(inner_key, data.to_string().as_bytes()).expect("encrypt");
        let body = json!({ "code": code, "message": "ok", "respondData": respond_data });
        let encoded = whitebox::encode_text_safe(body.to_string().as_bytes()).expect("encode");
        json!({ "response": encoded }).to_string()
    }

    #[tokio::test]
    async fn login_derives_the_session_tuple_from_the_token() {
        let server = MockServer::start().await;
        let inner_key = inner_aes::login_key("p");
        let data = json!({"token": {"userId": "1434", "signToken": "S", "encryToken": "E"}});
        let body = fake_response_body(0, &data, &inner_key);

        Mock::given(method("POST"))
            .and(path("/account/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let transport = SecureTransport::new(config(server.uri()), SessionHolder::new()).expect("build transport");
        let session = login(&transport, &config(server.uri())).await.expect("login");
        assert_eq!(session.user_id, "1434");
        assert_eq!(session.sign_key, format!("{:X}", md5::compute(b"S")));
        assert_eq!(session.content_key, format!("{:X}", md5::compute(b"E")));
    }

    #[tokio::test]
    async fn missing_token_is_a_protocol_error() {
        let server = MockServer::start().await;
        let inner_key = inner_aes::login_key("p");
        let body = fake_response_body(0, &json!({}), &inner_key);

        Mock::given(method("POST"))
            .and(path("/account/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let transport = SecureTransport::new(config(server.uri()), SessionHolder::new()).expect("build transport");
        let err = login(&transport, &config(server.uri())).await.expect_err("missing token");
        assert!(matches!(err, crate::AdapterError::Core(CoreError::ProtocolError(_))));
    }
}
