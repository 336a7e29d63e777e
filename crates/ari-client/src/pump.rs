//! Event pump (component D): long-lived WebSocket consumer with
//! reconnection, modeled after the teacher's `uplink.rs` session loop.

use std::time::Duration;

use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};

use ari_types::Event;

use crate::client::AriClient;
use crate::error::PumpError;

const RETRY_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_RETRIES: u32 = 10;
const BACKOFF: Duration = Duration::from_secs(5);

/// Drives the WebSocket connection for the client's lifetime. Returns only
/// once the client's shutdown token is cancelled — intended to be
/// `tokio::spawn`ed once.
pub async fn run(client: std::sync::Arc<AriClient>) {
    let shutdown = client.shutdown_token();
    let mut retries: u32 = 0;

    loop {
        if shutdown.is_cancelled() {
            return;
        }

        let connected = tokio::select! {
            biased;
            () = shutdown.cancelled() => return,
            result = connect_and_negotiate(&client) => result,
        };

        match connected {
            Ok(stream) => {
                retries = 0;
                consume(&client, &shutdown, stream).await;
                if shutdown.is_cancelled() {
                    return;
                }
                warn!("ari websocket connection closed, reconnecting");
            }
            Err(err) => {
                if !shutdown.is_cancelled() {
                    error!(error = %err, "failed to connect to ari websocket");
                }
            }
        }

        let delay = if retries < MAX_RETRIES { RETRY_TIMEOUT } else { BACKOFF };
        retries = retries.saturating_add(1);
        tokio::select! {
            biased;
            () = shutdown.cancelled() => return,
            () = tokio::time::sleep(delay) => {}
        }
    }
}

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect_and_negotiate(client: &AriClient) -> Result<WsStream, PumpError> {
    let url = client.rest().ws_url(client.app());
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| PumpError::Connect(e.to_string()))?;
    request
        .headers_mut()
        .insert("Authorization", client.rest().auth_header().parse().expect("auth header is valid ascii"));

    let (stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| PumpError::Connect(e.to_string()))?;

    client
        .rest()
        .filter_events(client.app(), &client.callbacks().allowed_events())
        .await
        .map_err(PumpError::FilterNegotiation)?;

    Ok(stream)
}

async fn consume(client: &AriClient, shutdown: &tokio_util::sync::CancellationToken, mut stream: WsStream) {
    loop {
        let msg = tokio::select! {
            biased;
            () = shutdown.cancelled() => return,
            msg = stream.next() => msg,
        };
        let Some(msg) = msg else { return };
        let msg = match msg {
            Ok(m) => m,
            Err(err) => {
                if !shutdown.is_cancelled() {
                    warn!(error = %err, "ari websocket transport error");
                }
                return;
            }
        };
        let text = match msg {
            Message::Text(t) => t,
            Message::Close(_) => return,
            _ => continue,
        };
        handle_frame(client, &text);
    }
}

fn handle_frame(client: &AriClient, text: &str) {
    let data: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(err) => {
            debug!(error = %err, "dropping unparseable ari frame");
            return;
        }
    };
    let Some(type_name) = data.get("type").and_then(serde_json::Value::as_str) else {
        return;
    };
    let event_type = ari_types::EventType::new(type_name);
    if !client.callbacks().is_allowed(&event_type) {
        debug!(event_type = type_name, "dropping event not in allowed set");
        return;
    }
    match Event::parse(&data, client.registry().as_ref()) {
        Some(event) => client.enqueue(event),
        None => debug!(event_type = type_name, "dropping event with no parser or missing required field"),
    }
}
