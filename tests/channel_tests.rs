//! # Method Channel Tests
//!
//! Every method of the channel, driven through `Bridge::handle` against the
//! in-memory rig.

mod common;

use common::{PRINTER, Rig};
use pretty_assertions::assert_eq;
use printbridge::permission::StaticGate;
use printbridge::{Bridge, MethodCall, MethodResponse};
use serde_json::{Value, json};

fn bridge(rig: &Rig) -> Bridge {
    Bridge::new(rig.manager.clone())
}

async fn call(bridge: &Bridge, method: &str, arguments: Value) -> MethodResponse {
    bridge.handle(MethodCall::new(method, arguments)).await
}

#[tokio::test]
async fn test_get_paired_devices() {
    let rig = Rig::new();
    let response = call(&bridge(&rig), "GET_PAIRED_DEVICES", Value::Null).await;

    assert_eq!(
        response,
        MethodResponse::success(json!([
            "TSP650II#00:11:62:AA:BB:CC",
            "Unknown Device#12:34:56:78:9A:BC"
        ]))
    );
}

#[tokio::test]
async fn test_get_paired_devices_permission_denied() {
    let rig = Rig::with_gate(StaticGate::deny_all());
    let response = call(&bridge(&rig), "GET_PAIRED_DEVICES", Value::Null).await;

    assert_eq!(response.code(), Some("PERMISSION_DENIED"));
    assert_eq!(rig.adapter.calls(), 0);
}

#[tokio::test]
async fn test_get_paired_devices_without_adapter() {
    let rig = Rig::without_adapter();
    let response = call(&bridge(&rig), "GET_PAIRED_DEVICES", Value::Null).await;
    assert_eq!(response.code(), Some("BLUETOOTH_NOT_AVAILABLE"));
}

#[tokio::test]
async fn test_connect_requires_address() {
    let rig = Rig::new();
    let bridge = bridge(&rig);

    for arguments in [Value::Null, json!({}), json!({"address": 42})] {
        let response = call(&bridge, "CONNECT_BLUETOOTH", arguments).await;
        assert_eq!(response.code(), Some("INVALID_ADDRESS"));
    }
    assert!(rig.connector.opened().is_empty());
}

#[tokio::test]
async fn test_connect_unreachable() {
    let rig = Rig::new();
    let response = call(
        &bridge(&rig),
        "CONNECT_BLUETOOTH",
        json!({"address": "DE:AD:BE:EF:00:01"}),
    )
    .await;

    match response {
        MethodResponse::Error { code, message, .. } => {
            assert_eq!(code, "CONNECTION_ERROR");
            assert!(message.unwrap().contains("Host is down"));
        }
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_status_follows_connect_and_disconnect() {
    let rig = Rig::new();
    let bridge = bridge(&rig);

    let status = call(&bridge, "CONNECTION_STATUS", Value::Null).await;
    assert_eq!(status, MethodResponse::success(false));

    let connected = call(&bridge, "CONNECT_BLUETOOTH", json!({"address": PRINTER})).await;
    assert_eq!(connected, MethodResponse::success(true));

    let status = call(&bridge, "CONNECTION_STATUS", Value::Null).await;
    assert_eq!(status, MethodResponse::success(true));

    let disconnected = call(&bridge, "DISCONNECT_BLUETOOTH", Value::Null).await;
    assert_eq!(disconnected, MethodResponse::success(true));

    let status = call(&bridge, "CONNECTION_STATUS", Value::Null).await;
    assert_eq!(status, MethodResponse::success(false));
}

#[tokio::test]
async fn test_print_sends_newline_prefixed_bytes() {
    let rig = Rig::new();
    let bridge = bridge(&rig);
    call(&bridge, "CONNECT_BLUETOOTH", json!({"address": PRINTER})).await;

    let response = call(&bridge, "PRINT", json!({"bytes": [1, 2, 3]})).await;
    assert_eq!(response, MethodResponse::success(true));
    assert_eq!(rig.wire().bytes(), b"\n\x01\x02\x03".to_vec());
}

#[tokio::test]
async fn test_print_before_connect_is_false() {
    let rig = Rig::new();
    let response = call(&bridge(&rig), "PRINT", json!({"bytes": [1, 2, 3]})).await;
    assert_eq!(response, MethodResponse::success(false));
}

#[tokio::test]
async fn test_print_invalid_bytes() {
    let rig = Rig::new();
    let bridge = bridge(&rig);
    call(&bridge, "CONNECT_BLUETOOTH", json!({"address": PRINTER})).await;

    for arguments in [json!({}), json!({"bytes": "hello"}), json!({"bytes": [1, 300]})] {
        match call(&bridge, "PRINT", arguments).await {
            MethodResponse::Error { code, details, .. } => {
                assert_eq!(code, "INVALID_BYTES");
                assert_eq!(details, Value::Bool(false));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }
    assert!(rig.wire().bytes().is_empty());
}

#[tokio::test]
async fn test_broken_pipe_reads_as_disconnected() {
    let rig = Rig::new();
    let bridge = bridge(&rig);
    call(&bridge, "CONNECT_BLUETOOTH", json!({"address": PRINTER})).await;
    rig.wire().break_pipe();

    let printed = call(&bridge, "PRINT", json!({"bytes": [27, 64]})).await;
    assert_eq!(printed, MethodResponse::success(false));

    let status = call(&bridge, "CONNECTION_STATUS", Value::Null).await;
    assert_eq!(status, MethodResponse::success(false));
}

#[tokio::test]
async fn test_disconnect_twice() {
    let rig = Rig::new();
    let bridge = bridge(&rig);
    call(&bridge, "CONNECT_BLUETOOTH", json!({"address": PRINTER})).await;

    for _ in 0..2 {
        let response = call(&bridge, "DISCONNECT_BLUETOOTH", Value::Null).await;
        assert_eq!(response, MethodResponse::success(true));
    }
}

#[tokio::test]
async fn test_disconnect_error_code() {
    let rig = Rig::new();
    let bridge = bridge(&rig);
    call(&bridge, "CONNECT_BLUETOOTH", json!({"address": PRINTER})).await;
    rig.wire().fail_close();

    let response = call(&bridge, "DISCONNECT_BLUETOOTH", Value::Null).await;
    assert_eq!(response.code(), Some("DISCONNECT_ERROR"));
    assert!(!bridge.is_connected().await);
}

#[tokio::test]
async fn test_platform_version() {
    let rig = Rig::new();
    let response = call(&bridge(&rig), "GET_PLATFORM_VERSION", Value::Null).await;

    let version = response.result().and_then(Value::as_str).unwrap().to_string();
    assert!(version.starts_with("Linux "), "got {}", version);
}

#[tokio::test]
async fn test_unknown_method_is_not_implemented() {
    let rig = Rig::new();
    let response = call(&bridge(&rig), "GET_BATTERY_LEVEL", Value::Null).await;
    assert_eq!(response, MethodResponse::NotImplemented);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_prints_are_serialized() {
    let rig = Rig::new();
    let bridge = bridge(&rig);
    call(&bridge, "CONNECT_BLUETOOTH", json!({"address": PRINTER})).await;

    let tasks: Vec<_> = (0..16u8)
        .map(|i| {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                call(&bridge, "PRINT", json!({"bytes": vec![i; 32]})).await
            })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap(), MethodResponse::success(true));
    }

    let bytes = rig.wire().bytes();
    assert_eq!(bytes.len(), 16 * 33);
    for frame in bytes.chunks(33) {
        assert_eq!(frame[0], b'\n');
        assert!(frame[1..].iter().all(|b| *b == frame[1]));
    }
}

#[tokio::test]
async fn test_shutdown_disconnects() {
    let rig = Rig::new();
    let bridge = bridge(&rig);
    call(&bridge, "CONNECT_BLUETOOTH", json!({"address": PRINTER})).await;

    bridge.shutdown().await;
    assert!(!bridge.is_connected().await);
    assert_eq!(rig.wire().socket_closes(), 1);
}
