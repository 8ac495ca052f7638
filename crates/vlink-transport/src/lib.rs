//! Secure transport (C6): the HTTP POST wrapper around the envelope
//! codec — envelope in, envelope out, server error codes mapped to
//! [`vlink_types::CoreError`].

pub mod backoff;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;

use vlink_codec::{build_request, parse_response, BuildRequestInput, ParsedResponse};
use vlink_session::SessionHolder;
use vlink_types::{Config, CoreError};

/// Server response code meaning the session is stale. Not enumerated in
/// the wire protocol's published code list; treated as a fixed constant
/// pending a confirmed value from a live server.
pub const SESSION_EXPIRED_CODE: i64 = 1002;
pub const CONTROL_PASSWORD_WRONG_CODE: i64 = 5005;
pub const CONTROL_PASSWORD_LOCKED_CODE: i64 = 5006;
pub const RATE_LIMITED_CODE: i64 = 6024;
pub const ENDPOINT_NOT_SUPPORTED_CODE: i64 = 1001;
pub const SUCCESS_CODE: i64 = 0;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Codec(#[from] vlink_codec::CodecError),
    #[error("http error: {0}")]
    Http(String),
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Which key material to sign/encrypt with for a given call.
pub enum KeyMaterial {
    /// Login call: MD5(password) for both the inner key and the signer's
    /// signKey.
    Login { password_md5: [u8; 16] },
    /// Authenticated call: the session's contentKey/signKey.
    Session {
        content_key: Vec<u8>,
        sign_key: String,
    },
}

/// One long-lived HTTP client and cookie jar per core instance, shared
/// across every call — never rebuilt per-request, or the "single cookie
/// jar per core instance" invariant silently breaks.
pub struct SecureTransport {
    client: reqwest::Client,
    base_url: String,
    config: Config,
    session: SessionHolder,
}

impl SecureTransport {
    pub fn new(config: Config, session: SessionHolder) -> Result<Self> {
        let jar = Arc::new(reqwest::cookie::Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(jar)
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let base_url = config.base_url.clone();
        Ok(Self {
            client,
            base_url,
            config,
            session,
        })
    }

    /// `postSecure`: fetch the session (if the endpoint requires one),
    /// build the request, POST with retry on network error, parse the
    /// response, and map the server code into a `CoreError`.
    pub async fn post_secure(
        &self,
        endpoint: &str,
        inner_extras: Map<String, Value>,
        key_material: KeyMaterial,
        requires_auth: bool,
    ) -> Result<ParsedResponse> {
        let identifier = if requires_auth {
            let session = self.session.current().await;
            match session {
                Some(session) => session.user_id,
                None => return Err(CoreError::SessionRequired.into()),
            }
        } else {
            self.config.username.clone()
        };

        let (inner_key, sign_key) = match &key_material {
            KeyMaterial::Login { password_md5 } => {
                (password_md5.to_vec(), hex::encode_upper(password_md5))
            }
            KeyMaterial::Session {
                content_key,
                sign_key,
            } => (content_key.clone(), sign_key.clone()),
        };

        let input = BuildRequestInput {
            country_code: &self.config.country_code,
            identifier: &identifier,
            language: &self.config.language,
            device: &self.config.device_identity,
            inner_extras,
            inner_key: &inner_key,
            sign_key: &sign_key,
        };
        let wire = build_request(input)?;

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint);
        let body_text = self.post_with_retry(&url, wire).await?;

        let parsed = parse_response(&body_text, &inner_key)?;
        self.classify(endpoint, &parsed).await?;
        Ok(parsed)
    }

    async fn post_with_retry(&self, url: &str, body: String) -> Result<String> {
        const MAX_ATTEMPTS: u32 = 3;
        let mut attempt = 0;
        loop {
            let outcome = self
                .client
                .post(url)
                .header("Content-Type", "application/json; charset=UTF-8")
                .header("Accept-Encoding", "identity")
                .body(body.clone())
                .send()
                .await;

            match outcome {
                Ok(resp) => {
                    return resp
                        .text()
                        .await
                        .map_err(|e| TransportError::Http(e.to_string()));
                }
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS - 1 {
                        tracing::warn!(url, attempt, error = %e, "post_secure exhausted retries");
                        return Err(TransportError::Http(e.to_string()));
                    }
                    let delay = backoff::delay_for_attempt(attempt);
                    tracing::debug!(url, attempt, ?delay, error = %e, "post_secure retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Maps a parsed server code into a `CoreError`, invalidating the
    /// session as a side effect of a detected `SessionExpired`.
    async fn classify(&self, endpoint: &str, parsed: &ParsedResponse) -> Result<()> {
        match parsed.code {
            SUCCESS_CODE => Ok(()),
            SESSION_EXPIRED_CODE => {
                self.session.invalidate().await;
                Err(CoreError::SessionExpired.into())
            }
            CONTROL_PASSWORD_WRONG_CODE => Err(CoreError::ControlPasswordWrong.into()),
            CONTROL_PASSWORD_LOCKED_CODE => Err(CoreError::ControlPasswordLocked.into()),
            RATE_LIMITED_CODE => Err(CoreError::RateLimited.into()),
            ENDPOINT_NOT_SUPPORTED_CODE => Err(CoreError::EndpointNotSupported.into()),
            code => Err(CoreError::ApiError {
                code,
                endpoint: endpoint.to_string(),
                message: parsed.message.clone(),
            }
            .into()),
        }
    }

    /// Minimal timeout override, used by callers that need a shorter
    /// wall clock than the configured default (none currently do; kept
    /// for parity with the config surface).
    pub fn http_timeout(&self) -> Duration {
        self.config.http_timeout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vlink_crypto::{inner_aes, whitebox};
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
            mqtt_enabled: false,
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

    fn fake_response_body(code: i64, message: &str, data: Option<&Value>, inner_key: &[u8]) -> String {
        let respond_data = match data {
            Some(v) => inner_aes::encrypt_hex(inner_key, v.to_string().as_bytes()).expect("encrypt"),
            None => String::new(),
        };
        let body = json!({ "code": code, "message": message, "respondData": respond_data });
        let encoded = whitebox::encode_text_safe(body.to_string().as_bytes()).expect("encode");
        json!({ "response": encoded }).to_string()
    }

    #[tokio::test]
    async fn login_round_trip_succeeds() {
        let server = MockServer::start().await;
        let inner_key = inner_aes::login_key("p");
        let data = json!({"token": {"userId": "1434", "signToken": "S", "encryToken": "E"}});
        let body = fake_response_body(0, "ok", Some(&data), &inner_key);

        Mock::given(method("POST"))
            .and(path("/account/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let transport = SecureTransport::new(config(server.uri()), SessionHolder::new()).expect("build");
        let parsed = transport
            .post_secure(
                "account/login",
                Map::new(),
                KeyMaterial::Login {
                    password_md5: inner_key,
                },
                false,
            )
            .await
            .expect("post_secure");
        assert_eq!(parsed.code, 0);
        assert_eq!(parsed.data, Some(data));
    }

    #[tokio::test]
    async fn session_required_without_a_held_session() {
        let transport = SecureTransport::new(config("http://127.0.0.1:0".to_string()), SessionHolder::new()).expect("build");
        let err = transport
            .post_secure(
                "control/getStatusNow",
                Map::new(),
                KeyMaterial::Session {
                    content_key: vec![0u8; 16],
                    sign_key: "X".to_string(),
                },
                true,
            )
            .await
            .expect_err("session required");
        assert!(matches!(err, TransportError::Core(CoreError::SessionRequired)));
    }

    #[tokio::test]
    async fn wrong_control_password_maps_to_core_error() {
        let server = MockServer::start().await;
        let inner_key = vec![0x11u8; 16];
        let body = fake_response_body(5005, "wrong password", None, &inner_key);

        Mock::given(method("POST"))
            .and(path("/control/remoteControl"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let session = SessionHolder::new();
        session
            .replace(vlink_types::Session::new("1434", "S", "E", vlink_types::now_epoch_secs(), 3600))
            .await;
        let transport = SecureTransport::new(config(server.uri()), session).expect("build");
        let err = transport
            .post_secure(
                "control/remoteControl",
                Map::new(),
                KeyMaterial::Session {
                    content_key: inner_key,
                    sign_key: "X".to_string(),
                },
                true,
            )
            .await
            .expect_err("wrong password");
        assert!(matches!(
            err,
            TransportError::Core(CoreError::ControlPasswordWrong)
        ));
    }

    #[tokio::test]
    async fn session_expired_invalidates_the_session() {
        let server = MockServer::start().await;
        let inner_key = vec![0x11u8; 16];
        let body = fake_response_body(SESSION_EXPIRED_CODE, "expired", None, &inner_key);

        Mock::given(method("POST"))
            .and(path("/control/getStatusNow"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let session_holder = SessionHolder::new();
        session_holder
            .replace(vlink_types::Session::new("1434", "S", "E", vlink_types::now_epoch_secs(), 3600))
            .await;
        let transport = SecureTransport::new(config(server.uri()), session_holder.clone()).expect("build");
        let err = transport
            .post_secure(
                "control/getStatusNow",
                Map::new(),
                KeyMaterial::Session {
                    content_key: inner_key,
                    sign_key: "X".to_string(),
                },
                true,
            )
            .await
            .expect_err("expired");
        assert!(matches!(err, TransportError::Core(CoreError::SessionExpired)));
        assert!(session_holder.current().await.is_none());
    }
}
