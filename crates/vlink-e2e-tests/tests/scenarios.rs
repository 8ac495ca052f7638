//! End-to-end scenarios exercising the full `vlink-client` assembly
//! against a mocked server, grounded on the wiremock integration tests
//! already present in vlink-transport/vlink-adapters/vlink-command —
//! composed here at the `Core` level, where more than one crate's
//! wiring is actually in play. Per-crate fixtures already cover the
//! realtime poll-exhaustion and repeated-wrong-PIN boundary cases in
//! isolation; this file focuses on what only `Core` itself can wire up:
//! the permission registry populated from `vehicles()`, and the
//! caller-driven re-login after a session expires mid-call.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use vlink_adapters::AdapterError;
use vlink_client::{ClientError, Core};
use vlink_command::CommandOrchestrator;
use vlink_crypto::{inner_aes, whitebox};
use vlink_push::waiters::WaiterRegistry;
use vlink_session::SessionHolder;
use vlink_state::StateStore;
use vlink_transport::{SecureTransport, TransportError};
use vlink_types::{
    now_epoch_secs, CommandCode, CommandOutcome, Config, CoreError, DeviceIdentity, Section, Session, Vin,
};
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
        mqtt_timeout_secs: 1,
        session_ttl_seconds: 43_200,
        poll_attempts: 3,
        poll_interval_ms: 5,
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

/// The fixed session tuple every scenario here authenticates into:
/// `userId=1434`, derived from `signToken="S"`/`encryToken="E"`.
fn derived_content_key() -> Vec<u8> {
    Session::new("1434", "S", "E", 0, 1).content_key_bytes()
}

fn fake_response_body(code: i64, data: Option<&Value>, inner_key: &[u8]) -> String {
    let respond_data = match data {
        Some(v) => inner_aes::encrypt_hex(inner_key, v.to_string().as_bytes()).expect("encrypt"),
        None => String::new(),
    };
    let body = json!({ "code": code, "message": "", "respondData": respond_data });
    let encoded = whitebox::encode_text_safe(body.to_string().as_bytes()).expect("encode");
    json!({ "response": encoded }).to_string()
}

async fn mount_login(server: &MockServer) {
    let login_key = inner_aes::login_key("p");
    let login_data = json!({"token": {"userId": "1434", "signToken": "S", "encryToken": "E"}});
    let login_body = fake_response_body(0, Some(&login_data), &login_key);
    Mock::given(method("POST"))
        .and(path("/account/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_body))
        .mount(server)
        .await;
}

async fn logged_in_core(server: &MockServer) -> Core {
    mount_login(server).await;
    let core = Core::new(config(server.uri())).expect("build core");
    core.login().await.expect("login");
    core
}

/// Scenario 1: login derives `(userId, signKey=MD5(signToken),
/// contentKey=MD5(encryToken))`, and a subsequent authenticated call
/// only decrypts correctly if the transport is actually signing and
/// decrypting with that derived session.
#[tokio::test]
async fn login_round_trip_then_an_authenticated_call_uses_the_derived_session() {
    let server = MockServer::start().await;
    let content_key = derived_content_key();
    let vehicles_body = fake_response_body(
        0,
        Some(&json!([{"vin": "VIN1", "model": "X1"}])),
        &content_key,
    );
    Mock::given(method("POST"))
        .and(path("/account/getAllListByUserId"))
        .respond_with(ResponseTemplate::new(200).set_body_string(vehicles_body))
        .mount(&server)
        .await;

    let core = logged_in_core(&server).await;
    let vehicles = core.vehicles().await.expect("vehicles");
    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0].vin, Vin::new("VIN1"));
}

/// Scenario 2: realtime trigger+poll. Poll 1 is still stale, poll 2
/// reports ready with a cabin-temperature sentinel that must not survive
/// into the stored section.
#[tokio::test]
async fn realtime_trigger_and_poll_converges_on_the_final_telemetry() {
    let server = MockServer::start().await;
    let inner_key = derived_content_key();

    let trigger_body = fake_response_body(0, Some(&json!({"onlineState": 0, "requestSerial": "ABC"})), &inner_key);
    Mock::given(method("POST"))
        .and(path("/vehicleRealTimeRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_string(trigger_body))
        .mount(&server)
        .await;

    let poll_pending = fake_response_body(0, Some(&json!({"onlineState": 0})), &inner_key);
    let poll_ready = fake_response_body(
        0,
        Some(&json!({"onlineState": 1, "elecPercent": 70, "tempInCar": -129, "time": 1_770_817_900u64})),
        &inner_key,
    );
    Mock::given(method("POST"))
        .and(path("/vehicleRealTimeResult"))
        .respond_with(ResponseTemplate::new(200).set_body_string(poll_pending))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vehicleRealTimeResult"))
        .respond_with(ResponseTemplate::new(200).set_body_string(poll_ready))
        .mount(&server)
        .await;

    let core = logged_in_core(&server).await;
    let vin = Vin::new("VIN1");
    core.refresh_realtime(&vin).await.expect("refresh");

    let snapshot = core.get_section(&vin, Section::Realtime).await;
    assert_eq!(snapshot.get("elecPercent"), Some(&json!(70)));
    assert!(snapshot.get("tempInCar").is_none());
    assert_eq!(
        snapshot.fields.get("elecPercent").map(|f| f.observed_at),
        Some(1_770_817_900_000)
    );
}

/// Scenario 3: the push listener resolves the command waiter before the
/// poll fallback would ever fire. Built against `CommandOrchestrator`
/// directly rather than `Core::connect_push` — there is no live broker
/// in this environment, so the test plays the push listener's part
/// itself by calling `WaiterRegistry::resolve` the way
/// `PushListener::run` would on a matching `remoteControl` publish.
#[tokio::test]
async fn mqtt_fast_path_resolves_before_the_poll_fallback_and_applies_the_lock_overlay() {
    let server = MockServer::start().await;
    let inner_key = derived_content_key();

    let trigger_body = fake_response_body(0, Some(&json!({"controlState": 0, "requestSerial": "X1"})), &inner_key);
    Mock::given(method("POST"))
        .and(path("/control/remoteControl"))
        .respond_with(ResponseTemplate::new(200).set_body_string(trigger_body))
        .mount(&server)
        .await;
    // No /control/remoteControlResult mock: if the orchestrator ever
    // fell through to polling, wiremock would panic on the unmatched
    // request when the server is dropped.

    let session = SessionHolder::new();
    session.replace(Session::new("1434", "S", "E", now_epoch_secs(), 3600)).await;
    let cfg = config(server.uri());
    let transport = Arc::new(SecureTransport::new(cfg.clone(), session.clone()).expect("build transport"));
    let waiters = WaiterRegistry::new();
    let state = Arc::new(StateStore::new());
    let orchestrator = CommandOrchestrator::new(transport, session, waiters.clone(), state.clone(), cfg);

    let push = tokio::spawn({
        let waiters = waiters.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            waiters
                .resolve("X1", Some(1), json!({"requestSerial": "X1", "controlState": 1}))
                .await
        }
    });

    let vin = Vin::new("VIN1");
    let outcome = orchestrator.execute(vin.clone(), CommandCode::Lock, None).await.expect("execute");
    assert_eq!(outcome, CommandOutcome::Success);
    assert!(push.await.expect("push task"));

    let snapshot = state.get_section(&vin, Section::Realtime).await;
    assert_eq!(snapshot.get("doorLockFl"), Some(&json!("locked")));
    assert_eq!(snapshot.get("doorLockRr"), Some(&json!("locked")));
}

/// Scenario 4 (poll fallback), exercised through `Core::execute_command`
/// instead of the orchestrator directly — this is the path a real
/// caller takes, and it is the only place `Config::mqtt_timeout` and the
/// orchestrator's retained permission registry are both in play.
#[tokio::test]
async fn poll_fallback_resolves_success_when_no_push_ever_arrives() {
    let server = MockServer::start().await;
    let inner_key = derived_content_key();

    let trigger_body = fake_response_body(0, Some(&json!({"controlState": 0, "requestSerial": "Y1"})), &inner_key);
    Mock::given(method("POST"))
        .and(path("/control/remoteControl"))
        .respond_with(ResponseTemplate::new(200).set_body_string(trigger_body))
        .mount(&server)
        .await;

    let poll_pending = fake_response_body(0, Some(&json!({"controlState": 0})), &inner_key);
    let poll_success = fake_response_body(0, Some(&json!({"controlState": 1})), &inner_key);
    Mock::given(method("POST"))
        .and(path("/control/remoteControlResult"))
        .respond_with(ResponseTemplate::new(200).set_body_string(poll_pending))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/control/remoteControlResult"))
        .respond_with(ResponseTemplate::new(200).set_body_string(poll_success))
        .mount(&server)
        .await;

    let core = logged_in_core(&server).await;
    let outcome = core
        .execute_command(Vin::new("VIN1"), CommandCode::Unlock, None)
        .await
        .expect("execute");
    assert_eq!(outcome, CommandOutcome::Success);
}

/// Scenario 5's permission-gate half: `Core::vehicles()` records each
/// vehicle's observed permission profile with the orchestrator, and a
/// Basic-only vehicle rejects `BATTERY_HEAT` locally without ever
/// reaching the network.
#[tokio::test]
async fn basic_control_vehicle_rejects_battery_heat_without_a_network_call() {
    let server = MockServer::start().await;
    let content_key = derived_content_key();
    let vehicles_body = fake_response_body(
        0,
        Some(&json!([{"vin": "VIN1", "model": "X1", "controlPermission": "Basic"}])),
        &content_key,
    );
    Mock::given(method("POST"))
        .and(path("/account/getAllListByUserId"))
        .respond_with(ResponseTemplate::new(200).set_body_string(vehicles_body))
        .mount(&server)
        .await;
    // No /control/remoteControl mock: a command that reached the
    // network here would panic wiremock on an unmatched request.

    let core = logged_in_core(&server).await;
    core.vehicles().await.expect("vehicles");

    let err = core
        .execute_command(Vin::new("VIN1"), CommandCode::BatteryHeat, None)
        .await
        .expect_err("rejected locally");
    assert!(matches!(err, ClientError::Command(vlink_command::CommandError::Core(CoreError::EndpointNotSupported))));
}

/// Scenario 6: a mid-call session expiry invalidates the held session;
/// `Core` does not auto-retry — the caller observes `SessionExpired`,
/// calls `login()` again, and retries. Exactly one realtime field ever
/// lands in the state store, from the successful retry only.
#[tokio::test]
async fn session_expiry_mid_call_then_caller_relogin_retries_successfully() {
    let server = MockServer::start().await;
    let content_key = derived_content_key();

    let expired_body = fake_response_body(1002, None, &content_key);
    Mock::given(method("POST"))
        .and(path("/control/getStatusNow"))
        .respond_with(ResponseTemplate::new(200).set_body_string(expired_body))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let ready_body = fake_response_body(0, Some(&json!({"onlineState": 1, "elecPercent": 61})), &content_key);
    Mock::given(method("POST"))
        .and(path("/control/getStatusNow"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ready_body))
        .mount(&server)
        .await;

    let core = logged_in_core(&server).await;
    let vin = Vin::new("VIN1");

    let first = core.get_status_now(&vin).await;
    assert!(matches!(
        first,
        Err(ClientError::Adapter(AdapterError::Transport(TransportError::Core(
            CoreError::SessionExpired
        ))))
    ));

    core.login().await.expect("relogin");
    core.get_status_now(&vin).await.expect("retry succeeds");

    let snapshot = core.get_section(&vin, Section::Realtime).await;
    assert_eq!(snapshot.get("elecPercent"), Some(&json!(61)));
    assert_eq!(snapshot.fields.len(), 1);
}
