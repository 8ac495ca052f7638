//! Endpoint adapters (C10): one stateless function per endpoint. Each
//! builds the inner payload, calls the transport, normalizes the
//! response into a typed section, and applies it to the state store.
//! Adapters never retry — per spec, all retry policy lives in C6/C9.

pub mod auth;
pub mod broker;
pub mod charging;
pub mod energy;
pub mod gps;
pub mod password;
pub mod realtime;
pub mod vehicles;

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use vlink_session::SessionHolder;
use vlink_state::StateStore;
use vlink_transport::{KeyMaterial, SecureTransport, TransportError};
use vlink_types::{now_epoch_ms, CoreError, FieldOrigin, Section, SectionEvent, Vin};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, AdapterError>;

/// Bundles the collaborators every adapter needs: the transport (to call
/// the endpoint), the session holder (to fetch the current key material),
/// and the state store (to apply the parsed result). Built once by the
/// assembling core and handed to each adapter call by reference.
pub struct AdapterContext {
    pub transport: Arc<SecureTransport>,
    pub session: SessionHolder,
    pub state: Arc<StateStore>,
}

impl AdapterContext {
    pub fn new(transport: Arc<SecureTransport>, session: SessionHolder, state: Arc<StateStore>) -> Self {
        Self {
            transport,
            session,
            state,
        }
    }

    /// Calls `endpoint` with the current session's key material. Fails
    /// with `SessionRequired` if no session is held.
    async fn call_authenticated(&self, endpoint: &str, inner: Map<String, Value>) -> Result<Value> {
        let session = self
            .session
            .current()
            .await
            .ok_or(CoreError::SessionRequired)?;
        let key_material = KeyMaterial::Session {
            content_key: session.content_key_bytes(),
            sign_key: session.sign_key.clone(),
        };
        let parsed = self
            .transport
            .post_secure(endpoint, inner, key_material, true)
            .await?;
        Ok(parsed.data.unwrap_or(Value::Null))
    }
}

/// Keys present in raw endpoint payloads that describe control flow
/// (polling readiness, correlation ids) rather than vehicle telemetry —
/// never stored as section fields.
const META_FIELDS: &[&str] = &["onlineState", "requestSerial", "code", "res"];

/// Builds and applies a [`SectionEvent`] from every field of `payload`
/// except the bookkeeping keys in [`META_FIELDS`]. `observed_at` is taken
/// from `payload["time"]` (epoch seconds, per the wire payloads) when
/// present, else the current wall clock.
async fn apply_payload_section(state: &StateStore, vin: &Vin, section: Section, origin: FieldOrigin, payload: &Map<String, Value>) {
    let observed_at = payload
        .get("time")
        .and_then(Value::as_u64)
        .map(|secs| secs * 1000)
        .unwrap_or_else(now_epoch_ms);

    let fields = payload
        .iter()
        .filter(|(k, _)| !META_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    state
        .apply(SectionEvent {
            vin: vin.clone(),
            section,
            origin,
            observed_at,
            fields,
        })
        .await;
}

/// True if `payload`'s `onlineState` field (when present) reports fresh
/// data (`1`); absent/non-numeric is treated as not-yet-ready.
fn is_online(payload: &Value) -> bool {
    payload.get("onlineState").and_then(Value::as_i64) == Some(1)
}

fn as_object(value: &Value) -> Result<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| CoreError::ProtocolError("expected a JSON object response".to_string()).into())
}
