//! Exercises the origination loop's admission bound against a mock ARI
//! server: only as many channels as the configured `count` may be
//! outstanding at once, and a released permit (via `ChannelDestroyed`) lets
//! the loop originate exactly one more.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ari_client::AriClient;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use callgen::config::CallsConfig;
use callgen::driver::CallDriver;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
struct MockState {
    ws_tx: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
}

async fn create_channel(Path(id): Path<String>, State(_state): State<MockState>) -> impl IntoResponse {
    axum::Json(channel_payload(&id, "Ring"))
}

async fn event_filter(State(_state): State<MockState>, _body: axum::Json<Value>) -> impl IntoResponse {
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

async fn spawn_mock_server() -> (MockState, String) {
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

    (state, format!("127.0.0.1:{}", addr.port()))
}

async fn wait_for_ws_connection(state: &MockState) {
    for _ in 0..100 {
        if state.ws_tx.lock().expect("lock poisoned").is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("call driver's client never connected to mock ari websocket");
}

fn push_frame(state: &MockState, frame: Value) {
    let tx = state.ws_tx.lock().expect("lock poisoned");
    let tx = tx.as_ref().expect("websocket not connected yet");
    tx.send(frame.to_string()).expect("push frame");
}

#[tokio::test]
async fn origination_loop_never_exceeds_configured_concurrency() {
    let (state, base_url) = spawn_mock_server().await;
    let (host, port_str) = base_url.split_once(':').unwrap();
    let client = AriClient::connect(host, port_str.parse().unwrap(), "user", "pass", "calls");
    wait_for_ws_connection(&state).await;

    let config = CallsConfig {
        count: 2,
        driver: "PJSIP".to_owned(),
        trunk: "local".to_owned(),
        phone: "79000000004".to_owned(),
        callerid: "loadgen".to_owned(),
    };
    let shutdown = CancellationToken::new();
    let driver = CallDriver::new(client.clone(), config, "sounds".to_owned(), shutdown.clone());
    let handle = tokio::spawn(driver.clone().run_origination_loop());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(driver.stats().sent_calls.load(std::sync::atomic::Ordering::SeqCst), 2, "origination must stop at the admission cap");

    // A real teardown always delivers StasisEnd before ChannelDestroyed
    // (both are Channel finish events); StasisEnd's eviction must not take
    // out the permit-release callback before ChannelDestroyed arrives.
    push_frame(
        &state,
        json!({
            "type": "StasisEnd",
            "application": "calls",
            "timestamp": "t",
            "channel": channel_payload("1", "Down"),
        }),
    );
    tokio::time::sleep(Duration::from_millis(80)).await;
    push_frame(
        &state,
        json!({
            "type": "ChannelDestroyed",
            "application": "calls",
            "timestamp": "t",
            "cause": 16,
            "cause_txt": "Normal Clearing",
            "channel": channel_payload("1", "Down"),
        }),
    );
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        driver.stats().sent_calls.load(std::sync::atomic::Ordering::SeqCst),
        3,
        "StasisEnd's eviction must not prevent the later ChannelDestroyed from releasing the permit"
    );

    shutdown.cancel();
    let _ = handle.await;
    client.close().await;
}
