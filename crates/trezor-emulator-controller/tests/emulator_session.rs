//! Exercises the controller against an in-process emulator control server.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use trezor_emulator_controller::{
    ControllerError, EmulatorSetup, SwipeDirection, TrezorControllerConfig,
    TrezorEmulatorController, DEFAULT_TEST_MNEMONIC,
};

type Requests = Arc<Mutex<Vec<Value>>>;

async fn serve_client(stream: TcpStream, requests: Requests) {
    let mut ws = accept_async(stream).await.unwrap();
    let hello = json!({ "type": "client", "id": 0, "firmwares": { "2": ["2.6.0"] } });
    ws.send(Message::Text(hello.to_string())).await.unwrap();

    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let request: Value = serde_json::from_str(&text).unwrap();
        requests.lock().await.push(request.clone());
        let id = request["tempId"].clone();

        match request["type"].as_str().unwrap_or_default() {
            "ping" => {
                let reply = json!({ "id": id, "success": true, "response": "pong" });
                ws.send(Message::Text(reply.to_string())).await.unwrap();
            }
            "emulator-start" => {
                let status = json!({ "background_check": true, "emulatorRunning": false });
                ws.send(Message::Text(status.to_string())).await.unwrap();
                let stale = json!({ "id": 999, "success": true });
                ws.send(Message::Text(stale.to_string())).await.unwrap();
                let reply = json!({
                    "id": id,
                    "success": true,
                    "response": { "version": request["version"] }
                });
                ws.send(Message::Text(reply.to_string())).await.unwrap();
            }
            "emulator-wipe" => {
                let reply = json!({ "id": id, "success": false, "error": "emulator not running" });
                ws.send(Message::Text(reply.to_string())).await.unwrap();
            }
            "emulator-swipe" => {
                let reply = json!({ "id": id, "success": true });
                ws.send(Message::Binary(reply.to_string().into_bytes()))
                    .await
                    .unwrap();
            }
            "emulator-input" if request["value"] == "garbage" => {
                ws.send(Message::Text("input accepted".into())).await.unwrap();
            }
            "background-check" => {
                let status = json!({ "background_check": true, "emulatorRunning": true });
                ws.send(Message::Text(status.to_string())).await.unwrap();
                let reply = json!({
                    "id": id,
                    "success": true,
                    "background_check": true,
                    "response": { "emulatorRunning": true }
                });
                ws.send(Message::Text(reply.to_string())).await.unwrap();
            }
            "emulator-read-and-confirm-mnemonic" => {}
            "bridge-stop" | "exit" => {
                let _ = ws.close(None).await;
            }
            _ => {
                let reply = json!({ "tempId": id, "success": true });
                ws.send(Message::Text(reply.to_string())).await.unwrap();
            }
        }
    }
}

async fn spawn_fake_emulator() -> (String, Requests) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    let shared = requests.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_client(stream, shared.clone()));
        }
    });
    (format!("ws://{addr}/"), requests)
}

fn config_for(url: &str) -> TrezorControllerConfig {
    TrezorControllerConfig {
        url: url.to_string(),
        connect_timeout_ms: 2_000,
        response_timeout_ms: 2_000,
        ..TrezorControllerConfig::default()
    }
}

#[tokio::test]
async fn replies_are_matched_by_correlation_id() {
    let (url, requests) = spawn_fake_emulator().await;
    let mut controller = TrezorEmulatorController::new(TrezorControllerConfig {
        firmware_version: Some("2.6.0".into()),
        ..config_for(&url)
    });
    controller.connect().await.unwrap();
    assert!(controller.is_connected());

    let pong = controller.ping().await.unwrap();
    assert_eq!(pong.payload()["response"], "pong");
    assert_eq!(pong.correlation_id(), Some(1));
    assert_eq!(controller.client_info().unwrap()["firmwares"]["2"][0], "2.6.0");

    let started = controller.emulator_start(None).await.unwrap();
    assert_eq!(started.correlation_id(), Some(2));
    assert_eq!(started.payload()["response"]["version"], "2.6.0");

    let setup = controller
        .emulator_setup(EmulatorSetup::default())
        .await
        .unwrap()
        .ensure_success()
        .unwrap();
    assert_eq!(setup.correlation_id(), Some(3));
    assert_eq!(controller.last_temp_id(), Some(3));

    let sent = requests.lock().await.clone();
    let ids: Vec<_> = sent.iter().map(|r| r["tempId"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(sent[1]["type"], "emulator-start");
    assert_eq!(sent[2]["mnemonic"], DEFAULT_TEST_MNEMONIC);
}

#[tokio::test]
async fn device_interaction_commands_reach_the_server() {
    let (url, requests) = spawn_fake_emulator().await;
    let mut controller = TrezorEmulatorController::new(config_for(&url));
    controller.connect().await.unwrap();

    controller.bridge_start(Some("2.0.33")).await.unwrap();
    controller.emulator_press_yes().await.unwrap();
    controller.emulator_press_no().await.unwrap();
    controller.emulator_allow_unsafe_paths().await.unwrap();
    let swiped = controller.emulator_swipe(SwipeDirection::Left).await.unwrap();
    assert_eq!(swiped.success(), Some(true));
    controller.emulator_input("abandon").await.unwrap();
    controller.emulator_reset_device().await.unwrap();
    controller.emulator_stop().await.unwrap();

    let sent = requests.lock().await.clone();
    let types: Vec<_> = sent.iter().map(|r| r["type"].as_str().unwrap()).collect();
    assert_eq!(
        types,
        vec![
            "bridge-start",
            "emulator-press-yes",
            "emulator-press-no",
            "emulator-allow-unsafe-paths",
            "emulator-swipe",
            "emulator-input",
            "emulator-reset-device",
            "emulator-stop",
        ]
    );
    assert_eq!(sent[0]["version"], "2.0.33");
    assert_eq!(sent[4]["direction"], "left");
    assert_eq!(sent[5]["value"], "abandon");
}

#[tokio::test]
async fn failed_replies_surface_as_rejections() {
    let (url, _requests) = spawn_fake_emulator().await;
    let mut controller = TrezorEmulatorController::new(config_for(&url));
    controller.connect().await.unwrap();

    let reply = controller.emulator_wipe().await.unwrap();
    assert_eq!(reply.success(), Some(false));
    match reply.ensure_success() {
        Err(ControllerError::Rejected { message }) => {
            assert_eq!(message, "emulator not running")
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn non_json_reply_is_malformed() {
    let (url, _requests) = spawn_fake_emulator().await;
    let mut controller = TrezorEmulatorController::new(config_for(&url));
    controller.connect().await.unwrap();

    match controller.emulator_input("garbage").await {
        Err(ControllerError::MalformedMessage { payload, .. }) => {
            assert_eq!(payload, "input accepted")
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn silent_server_times_out() {
    let (url, _requests) = spawn_fake_emulator().await;
    let mut controller = TrezorEmulatorController::new(TrezorControllerConfig {
        response_timeout_ms: 150,
        ..config_for(&url)
    });
    controller.connect().await.unwrap();

    match controller.emulator_read_and_confirm_mnemonic().await {
        Err(ControllerError::Timeout {
            command,
            timeout_ms,
        }) => {
            assert_eq!(command, "emulator-read-and-confirm-mnemonic");
            assert_eq!(timeout_ms, 150);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn server_close_before_reply_is_reported() {
    let (url, _requests) = spawn_fake_emulator().await;
    let mut controller = TrezorEmulatorController::new(config_for(&url));
    controller.connect().await.unwrap();

    let err = controller.bridge_stop().await.unwrap_err();
    assert!(matches!(err, ControllerError::ConnectionClosed), "{err:?}");
}

#[tokio::test]
async fn exit_waits_for_the_server_to_close() {
    let (url, requests) = spawn_fake_emulator().await;
    let mut controller = TrezorEmulatorController::new(config_for(&url));
    controller.connect().await.unwrap();
    controller.ping().await.unwrap();

    controller.exit().await.unwrap();
    assert!(!controller.is_connected());
    assert_eq!(requests.lock().await.last().unwrap()["type"], "exit");

    let err = controller.ping().await.unwrap_err();
    assert!(matches!(err, ControllerError::NotConnected));
}

#[tokio::test]
async fn requests_before_connect_fail() {
    let mut controller = TrezorEmulatorController::with_url("ws://127.0.0.1:9/");
    let err = controller.background_check().await.unwrap_err();
    assert!(matches!(err, ControllerError::NotConnected));
    assert_eq!(controller.last_temp_id(), None);
    controller.disconnect().await.unwrap();
}

#[tokio::test]
async fn refused_connection_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut controller = TrezorEmulatorController::new(config_for(&format!("ws://{addr}/")));
    match controller.connect().await {
        Err(ControllerError::Connect { url, .. }) => assert!(url.contains(&addr.to_string())),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!controller.is_connected());
}

#[tokio::test]
async fn background_check_resolves_with_its_own_reply() {
    let (url, requests) = spawn_fake_emulator().await;
    let mut controller = TrezorEmulatorController::new(config_for(&url));
    controller.connect().await.unwrap();

    let status = controller.background_check().await.unwrap();
    assert_eq!(status.correlation_id(), Some(1));
    assert!(status.background_check());
    assert_eq!(status.payload()["response"]["emulatorRunning"], true);

    let pong = controller.ping().await.unwrap();
    assert_eq!(pong.correlation_id(), Some(2));
    assert_eq!(requests.lock().await[0]["type"], "background-check");
}
