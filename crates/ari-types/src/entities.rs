//! Entity shapes: Channel, Bridge, Playback.
//!
//! Entities are reference-counted, interior-mutable handles: the same `Arc<Channel>`
//! is shared by every event and REST response that names the same `id`. Mutation is
//! limited to refreshing the last-seen payload and the handful of fields ARI updates
//! in place (state, connected line, bridge membership).

use std::sync::RwLock;

use serde_json::Value;

/// Caller ID pair. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId {
    pub name: String,
    pub number: String,
}

impl CallerId {
    pub fn from_json(v: &Value) -> Self {
        CallerId {
            name: v.get("name").and_then(Value::as_str).unwrap_or_default().to_owned(),
            number: v
                .get("number")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        }
    }
}

/// Mutable fields of a Channel, behind one lock.
#[derive(Debug, Clone)]
struct ChannelData {
    name: String,
    state: String,
    caller: CallerId,
    connected: CallerId,
    creationtime: String,
    language: String,
    dialplan: String,
    accountcode: String,
    channelvars: Vec<Value>,
    snoop_channels: Vec<String>,
    raw: Value,
}

/// An active call leg inside Asterisk.
///
/// `protocol` is derived, not stored: it is the prefix of `name` before the
/// first `/` (e.g. `PJSIP`, `SIP`, `Local`).
pub struct Channel {
    pub id: String,
    data: RwLock<ChannelData>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel").field("id", &self.id).finish()
    }
}

impl Channel {
    pub fn from_json(payload: &Value) -> Self {
        let id = payload
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Channel {
            id,
            data: RwLock::new(ChannelData::from_json(payload)),
        }
    }

    pub fn update_from_json(&self, payload: &Value) {
        let mut data = self.data.write().expect("channel lock poisoned");
        data.update_from_json(payload);
    }

    pub fn name(&self) -> String {
        self.data.read().expect("channel lock poisoned").name.clone()
    }

    pub fn state(&self) -> String {
        self.data.read().expect("channel lock poisoned").state.clone()
    }

    pub fn caller(&self) -> CallerId {
        self.data.read().expect("channel lock poisoned").caller.clone()
    }

    pub fn raw(&self) -> Value {
        self.data.read().expect("channel lock poisoned").raw.clone()
    }

    /// The prefix of `name` before the first `/`, e.g. `PJSIP` for `PJSIP/100-0000001`.
    pub fn protocol(&self) -> String {
        let name = self.name();
        name.split('/').next().unwrap_or(&name).to_owned()
    }

    /// Record that a snoop channel with the given id was spawned off this channel.
    pub fn push_snoop_channel(&self, snoop_id: impl Into<String>) {
        self.data
            .write()
            .expect("channel lock poisoned")
            .snoop_channels
            .push(snoop_id.into());
    }

    pub fn snoop_channels(&self) -> Vec<String> {
        self.data.read().expect("channel lock poisoned").snoop_channels.clone()
    }
}

impl ChannelData {
    fn from_json(payload: &Value) -> Self {
        ChannelData {
            name: str_field(payload, "name"),
            state: str_field(payload, "state"),
            caller: payload
                .get("caller")
                .map(CallerId::from_json)
                .unwrap_or(CallerId { name: String::new(), number: String::new() }),
            connected: payload
                .get("connected")
                .map(CallerId::from_json)
                .unwrap_or(CallerId { name: String::new(), number: String::new() }),
            creationtime: str_field(payload, "creationtime"),
            language: str_field(payload, "language"),
            dialplan: str_field(payload, "dialplan"),
            accountcode: str_field(payload, "accountcode"),
            channelvars: payload
                .get("channelvars")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            snoop_channels: Vec::new(),
            raw: payload.clone(),
        }
    }

    fn update_from_json(&mut self, payload: &Value) {
        self.state = str_field(payload, "state");
        if let Some(connected) = payload.get("connected") {
            self.connected = CallerId::from_json(connected);
        }
        self.dialplan = str_field(payload, "dialplan");
        self.accountcode = str_field(payload, "accountcode");
        if let Some(vars) = payload.get("channelvars").and_then(Value::as_array) {
            self.channelvars = vars.clone();
        }
        self.raw = payload.clone();
    }
}

/// Mutable fields of a Bridge, behind one lock.
#[derive(Debug, Clone)]
struct BridgeData {
    technology: String,
    bridge_type: String,
    bridge_class: String,
    creator: String,
    name: String,
    channels_id: Vec<String>,
    creationtime: String,
    raw: Value,
}

/// A mixer connecting multiple channels' media.
pub struct Bridge {
    pub id: String,
    data: RwLock<BridgeData>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge").field("id", &self.id).finish()
    }
}

impl Bridge {
    pub fn from_json(payload: &Value) -> Self {
        let id = payload
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Bridge {
            id,
            data: RwLock::new(BridgeData::from_json(payload)),
        }
    }

    pub fn update_from_json(&self, payload: &Value) {
        self.data.write().expect("bridge lock poisoned").update_from_json(payload);
    }

    pub fn channels_id(&self) -> Vec<String> {
        self.data.read().expect("bridge lock poisoned").channels_id.clone()
    }

    pub fn raw(&self) -> Value {
        self.data.read().expect("bridge lock poisoned").raw.clone()
    }
}

impl BridgeData {
    fn from_json(payload: &Value) -> Self {
        BridgeData {
            technology: str_field(payload, "technology"),
            bridge_type: str_field(payload, "bridge_type"),
            bridge_class: str_field(payload, "bridge_class"),
            creator: str_field(payload, "creator"),
            name: str_field(payload, "name"),
            channels_id: payload
                .get("channels")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect())
                .unwrap_or_default(),
            creationtime: str_field(payload, "creationtime"),
            raw: payload.clone(),
        }
    }

    fn update_from_json(&mut self, payload: &Value) {
        if let Some(channels) = payload.get("channels").and_then(Value::as_array) {
            self.channels_id = channels.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect();
        }
        self.raw = payload.clone();
    }
}

/// Mutable fields of a Playback, behind one lock.
#[derive(Debug, Clone)]
struct PlaybackData {
    media_uri: String,
    target_uri: String,
    language: String,
    state: String,
    raw: Value,
}

/// A media-playing operation, addressable and controllable while active.
pub struct Playback {
    pub id: String,
    data: RwLock<PlaybackData>,
}

impl std::fmt::Debug for Playback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playback").field("id", &self.id).finish()
    }
}

impl Playback {
    pub fn from_json(payload: &Value) -> Self {
        let id = payload
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Playback {
            id,
            data: RwLock::new(PlaybackData::from_json(payload)),
        }
    }

    pub fn update_from_json(&self, payload: &Value) {
        self.data.write().expect("playback lock poisoned").update_from_json(payload);
    }

    pub fn state(&self) -> String {
        self.data.read().expect("playback lock poisoned").state.clone()
    }

    pub fn raw(&self) -> Value {
        self.data.read().expect("playback lock poisoned").raw.clone()
    }
}

impl PlaybackData {
    fn from_json(payload: &Value) -> Self {
        PlaybackData {
            media_uri: str_field(payload, "media_uri"),
            target_uri: str_field(payload, "target_uri"),
            language: str_field(payload, "language"),
            state: str_field(payload, "state"),
            raw: payload.clone(),
        }
    }

    fn update_from_json(&mut self, payload: &Value) {
        self.media_uri = str_field(payload, "media_uri");
        self.target_uri = str_field(payload, "target_uri");
        self.language = str_field(payload, "language");
        self.state = str_field(payload, "state");
        self.raw = payload.clone();
    }
}

fn str_field(v: &Value, key: &str) -> String {
    v.get(key).and_then(Value::as_str).unwrap_or_default().to_owned()
}

/// The three entity kinds the registry indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Channel,
    Bridge,
    Playback,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Channel => "Channel",
            EntityKind::Bridge => "Bridge",
            EntityKind::Playback => "Playback",
        }
    }
}
