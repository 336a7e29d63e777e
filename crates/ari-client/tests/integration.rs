//! Integration tests driven against a small mock ARI server: a real `axum`
//! listener serving the REST endpoints this suite exercises, plus a
//! websocket route that lets a test push canned event frames to whichever
//! client is currently connected. Mirrors the workspace's own convention of
//! spinning up a real listener on `127.0.0.1:0` and driving it with a real
//! client rather than mocking at the transport layer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ari_client::{AnyEntity, AriClient, EntityKind, EventType};
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::mpsc;

#[derive(Clone, Default)]
struct MockState {
    event_filter_calls: Arc<Mutex<Vec<Value>>>,
    ws_tx: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
}

async fn create_channel(Path(id): Path<String>, State(_state): State<MockState>) -> impl IntoResponse {
    Json(channel_payload(&id, "Ring"))
}

async fn event_filter(State(state): State<MockState>, Json(body): Json<Value>) -> impl IntoResponse {
    state.event_filter_calls.lock().expect("lock poisoned").push(body);
    axum::http::StatusCode::NO_CONTENT
}

async fn ws_events(ws: WebSocketUpgrade, State(state): State<MockState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: MockState) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    *state.ws_tx.lock().expect("lock poisoned") = Some(tx);
    loop {
        tokio::select! {
            frame = rx.recv() => {
                match frame {
                    Some(text) => {
                        if socket.send(WsMessage::Text(text)).await.is_err() {
                            return;
                        }
                    }
                    None => return,
                }
            }
            incoming = socket.recv() => {
                if incoming.is_none() {
                    return;
                }
            }
        }
    }
}

fn channel_payload(id: &str, state: &str) -> Value {
    json!({
        "id": id,
        "name": "PJSIP/100-00000001",
        "state": state,
        "caller": {"name": "", "number": "100"},
        "connected": {"name": "", "number": ""},
        "creationtime": "2024-01-01T00:00:00.000Z",
        "language": "en",
        "dialplan": {},
        "accountcode": "",
    })
}

struct TestServer {
    state: MockState,
    base_url: String,
}

async fn spawn_mock_server() -> TestServer {
    let state = MockState::default();
    let app = Router::new()
        .route("/ari/channels/:id", post(create_channel))
        .route("/ari/applications/:app/eventFilter", put(event_filter))
        .route("/ari/events", get(ws_events))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server error");
    });

    TestServer { state, base_url: format!("127.0.0.1:{}", addr.port()) }
}

async fn wait_for_ws_connection(state: &MockState) {
    for _ in 0..100 {
        if state.ws_tx.lock().expect("lock poisoned").is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("client never connected to mock ari websocket");
}

fn push_frame(state: &MockState, frame: Value) {
    let tx = state.ws_tx.lock().expect("lock poisoned");
    let tx = tx.as_ref().expect("websocket not connected yet");
    tx.send(frame.to_string()).expect("push frame");
}

#[tokio::test]
async fn event_filter_is_negotiated_on_connect_with_required_types() {
    let server = spawn_mock_server().await;
    let (host, port_str) = server.base_url.split_once(':').unwrap();
    let client = AriClient::connect(host, port_str.parse().unwrap(), "user", "pass", "calls");

    wait_for_ws_connection(&server.state).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let calls = server.state.event_filter_calls.lock().expect("lock poisoned");
    assert!(!calls.is_empty(), "expected at least one eventFilter PUT");
    let allowed = calls[0]["allowed"].as_array().expect("allowed array");
    let types: Vec<&str> = allowed.iter().filter_map(|v| v["type"].as_str()).collect();
    for required in ["StasisStart", "StasisEnd", "PlaybackFinished", "ChannelDestroyed"] {
        assert!(types.contains(&required), "missing required allowed type {required}");
    }

    client.close().await;
}

#[tokio::test]
async fn rest_created_channel_and_later_event_share_identity() {
    let server = spawn_mock_server().await;
    let (host, port_str) = server.base_url.split_once(':').unwrap();
    let client = AriClient::connect(host, port_str.parse().unwrap(), "user", "pass", "calls");
    wait_for_ws_connection(&server.state).await;

    let rest_channel = client.create_channel("ch1", "PJSIP/100@trunk", "caller", 30).await.expect("create_channel");

    let (tx, mut rx) = tokio::sync::oneshot::channel();
    let tx = Arc::new(std::sync::Mutex::new(Some(tx)));
    let cb: ari_client::EntityCallback = Arc::new(move |_client, _event, entity| {
        if let AnyEntity::Channel(c) = entity {
            if let Some(sender) = tx.lock().expect("lock poisoned").take() {
                let _ = sender.send(c.clone());
            }
        }
    });
    client.register_entity_callback(EventType::new("StasisStart"), EntityKind::Channel, "ch1", "tok", cb);

    push_frame(
        &server.state,
        json!({
            "type": "StasisStart",
            "application": "calls",
            "timestamp": "t",
            "args": [],
            "channel": channel_payload("ch1", "Ring"),
        }),
    );

    let event_channel = tokio::time::timeout(Duration::from_secs(2), &mut rx)
        .await
        .expect("callback should fire")
        .expect("channel sent");

    assert!(Arc::ptr_eq(&rest_channel, &event_channel));

    client.close().await;
}

#[tokio::test]
async fn finish_event_evicts_entity_and_its_callbacks() {
    let server = spawn_mock_server().await;
    let (host, port_str) = server.base_url.split_once(':').unwrap();
    let client = AriClient::connect(host, port_str.parse().unwrap(), "user", "pass", "calls");
    wait_for_ws_connection(&server.state).await;

    let fire_count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let fire_count2 = fire_count.clone();
    let cb: ari_client::EntityCallback = Arc::new(move |_client, _event, _entity| {
        fire_count2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    });
    client.register_entity_callback(EventType::new("ChannelDestroyed"), EntityKind::Channel, "ch1", "tok", cb);

    push_frame(
        &server.state,
        json!({
            "type": "StasisStart",
            "application": "calls",
            "timestamp": "t",
            "args": [],
            "channel": channel_payload("ch1", "Up"),
        }),
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    push_frame(
        &server.state,
        json!({
            "type": "ChannelDestroyed",
            "application": "calls",
            "timestamp": "t",
            "cause": 16,
            "cause_txt": "Normal Clearing",
            "channel": channel_payload("ch1", "Down"),
        }),
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(fire_count.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert!(client.registry().get_channel("ch1").is_none());

    client.close().await;
}

#[tokio::test]
async fn registration_from_within_a_callback_only_observes_the_next_event() {
    let server = spawn_mock_server().await;
    let (host, port_str) = server.base_url.split_once(':').unwrap();
    let client = AriClient::connect(host, port_str.parse().unwrap(), "user", "pass", "calls");
    wait_for_ws_connection(&server.state).await;

    let late_fired = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let late_fired2 = late_fired.clone();
    let client_for_first = client.clone();

    let first_cb: ari_client::ClassCallback = Arc::new(move |_client, _event| {
        let late_fired3 = late_fired2.clone();
        let late_cb: ari_client::ClassCallback = Arc::new(move |_client, _event| {
            late_fired3.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        client_for_first.register_class_callback(EventType::new("ChannelCreated"), "late", late_cb);
    });
    client.register_class_callback(EventType::new("ChannelCreated"), "first", first_cb);

    push_frame(
        &server.state,
        json!({
            "type": "ChannelCreated",
            "application": "calls",
            "timestamp": "t",
            "channel": channel_payload("ch1", "Down"),
        }),
    );
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(late_fired.load(std::sync::atomic::Ordering::SeqCst), 0, "late callback must not fire on the event that registered it");

    push_frame(
        &server.state,
        json!({
            "type": "ChannelCreated",
            "application": "calls",
            "timestamp": "t",
            "channel": channel_payload("ch2", "Down"),
        }),
    );
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(late_fired.load(std::sync::atomic::Ordering::SeqCst), 1, "late callback fires from the next event onward");

    client.close().await;
}
