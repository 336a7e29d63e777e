//! Top-level `AriClient`: wires the REST client, entity registry, callback
//! registry, event pump and dispatcher into one handle.

use std::sync::{Arc, Mutex};

use ari_types::{Bridge, Channel, EntityKind, EventType, Playback};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::callbacks::{CallbackRegistry, ClassCallback, EntityCallback};
use crate::error::RestError;
use crate::registry::Registry;
use crate::rest::RestClient;
use crate::{dispatch, pump};

pub struct AriClient {
    registry: Arc<Registry>,
    callbacks: Arc<CallbackRegistry>,
    rest: RestClient,
    app: String,
    shutdown: CancellationToken,
    event_tx: Mutex<Option<UnboundedSender<ari_types::Event>>>,
    pump_handle: Mutex<Option<JoinHandle<()>>>,
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,
}

impl AriClient {
    /// Builds the client and spawns its pump and dispatcher tasks. The
    /// first event-filter negotiation happens inside the pump's initial
    /// connect attempt, so a connection failure there is only observed
    /// through logs, not this call's return value (matching the
    /// best-effort availability policy for the WebSocket side).
    pub fn connect(host: &str, port: u16, username: &str, secret: &str, app: &str) -> Arc<Self> {
        let rest = RestClient::new(host, port, username, secret);
        let registry = Registry::new();
        let callbacks = Arc::new(CallbackRegistry::new());
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let client = Arc::new(AriClient {
            registry,
            callbacks,
            rest,
            app: app.to_owned(),
            shutdown: CancellationToken::new(),
            event_tx: Mutex::new(Some(event_tx)),
            pump_handle: Mutex::new(None),
            dispatch_handle: Mutex::new(None),
        });

        let dispatch_client = client.clone();
        let dispatch_handle = tokio::spawn(dispatch::run(dispatch_client, event_rx));
        *client.dispatch_handle.lock().expect("lock poisoned") = Some(dispatch_handle);

        let pump_client = client.clone();
        let pump_handle = tokio::spawn(pump::run(pump_client));
        *client.pump_handle.lock().expect("lock poisoned") = Some(pump_handle);

        client
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub(crate) fn enqueue(&self, event: ari_types::Event) {
        // Absent sender or a send error both mean the dispatcher is gone
        // (shutdown race); silently no-op per the error handling policy.
        if let Some(tx) = self.event_tx.lock().expect("lock poisoned").as_ref() {
            let _ = tx.send(event);
        }
    }

    pub fn register_class_callback(&self, event_type: impl Into<EventType>, token: impl Into<String>, cb: ClassCallback) {
        self.callbacks.register_class(event_type.into(), token, cb);
    }

    pub fn register_entity_callback(
        &self,
        event_type: impl Into<EventType>,
        kind: EntityKind,
        id: impl Into<String>,
        token: impl Into<String>,
        cb: EntityCallback,
    ) {
        self.callbacks.register_entity(event_type.into(), kind, id, token, cb);
    }

    pub fn remove_class_callback(&self, event_type: &EventType, token: &str) {
        self.callbacks.remove_class(event_type, token);
    }

    /// Closes the client: cancels the shutdown token (unblocks the pump's
    /// WebSocket read and suppresses reconnect attempts and error logging),
    /// joins the pump, then drops the event sender so the dispatcher's
    /// queue read wakes with `None` and exits on its own, and finally
    /// clears the registry.
    pub async fn close(&self) {
        self.shutdown.cancel();

        let pump = self.pump_handle.lock().expect("lock poisoned").take();
        if let Some(handle) = pump {
            let _ = handle.await;
        }

        self.event_tx.lock().expect("lock poisoned").take();

        let dispatch = self.dispatch_handle.lock().expect("lock poisoned").take();
        if let Some(handle) = dispatch {
            let _ = handle.await;
        }

        self.registry.close();
    }

    // -- Convenience wrappers over `RestClient` that auto-resolve entities
    // through this client's own registry. ----------------------------------

    pub async fn create_channel(
        &self,
        channel_id: &str,
        endpoint: &str,
        callerid: &str,
        timeout: i64,
    ) -> Result<Arc<Channel>, RestError> {
        self.rest
            .create_channel(self.registry.as_ref(), channel_id, endpoint, &self.app, callerid, timeout)
            .await
    }

    pub async fn answer(&self, channel_id: &str) -> Result<(), RestError> {
        self.rest.answer(channel_id).await
    }

    pub async fn close_channel(&self, channel_id: &str) -> Result<(), RestError> {
        self.rest.close_channel(channel_id).await
    }

    pub async fn create_bridge(&self, bridge_type: &str) -> Result<Arc<Bridge>, RestError> {
        self.rest.create_bridge(self.registry.as_ref(), bridge_type).await
    }

    pub async fn close_bridge(&self, bridge_id: &str) -> Result<(), RestError> {
        self.rest.close_bridge(bridge_id).await
    }

    pub async fn add_to_bridge(&self, bridge_id: &str, channel_id: &str) -> Result<(), RestError> {
        self.rest.add_to_bridge(bridge_id, channel_id).await
    }

    pub async fn record_bridge(&self, bridge_id: &str, name: &str) -> Result<Option<Value>, RestError> {
        self.rest.record_bridge(bridge_id, name).await
    }

    pub async fn play_bridge(&self, bridge_id: &str, media: &str) -> Result<Arc<Playback>, RestError> {
        self.rest.play_bridge(self.registry.as_ref(), bridge_id, media).await
    }

    pub async fn start_snoop(&self, channel_id: &str, spy: &str) -> Result<Arc<Channel>, RestError> {
        self.rest.start_snoop(self.registry.as_ref(), channel_id, &self.app, spy).await
    }

    pub async fn external_media(&self, channel_id: &str, external_host: &str, format: &str) -> Result<Arc<Channel>, RestError> {
        self.rest
            .external_media(self.registry.as_ref(), channel_id, &self.app, external_host, format)
            .await
    }
}
