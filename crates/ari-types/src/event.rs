//! Event schema: one constructor per ARI event type, each materializing its
//! entity references through an [`EntityResolver`] instead of a live registry
//! handle — this crate knows the event *shapes*; `ari-client` owns the actual
//! store and implements the resolver.
//!
//! Association rules (the `related_events`/`finish_events` tables in the
//! specification) are not represented as a generic field-name map — Rust's
//! static typing makes a match over a closed `Event` enum, with one accessor
//! method per entity kind, the natural replacement for the reflection-based
//! dispatch the original implementation used.

use std::sync::Arc;

use serde_json::Value;

use crate::entities::{Bridge, Channel, Playback};

/// An ARI event type name, e.g. `"StasisStart"`.
///
/// Kept as a string rather than a closed enum: the event-filter negotiation
/// and callback registration accept any type name, including ones this crate
/// has no parser for (the allowed-event set is extensible; the parser just
/// won't ever produce an `Event` for a type it doesn't model).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(pub String);

impl EventType {
    pub fn new(s: impl Into<String>) -> Self {
        EventType(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        EventType(s.to_owned())
    }
}

/// Event types the call driver and the dispatcher's bookkeeping always need,
/// regardless of what the application explicitly registers callbacks for.
/// Mirrors `Ari.AVAILABLE_EVENTS` plus the `finish_events` of every modeled
/// entity kind in the original implementation.
pub fn builtin_allowed_events() -> Vec<EventType> {
    [
        "StasisStart",
        "Dial",
        "ChannelDestroyed",
        "StasisEnd",
        "PlaybackFinished",
        "PlaybackStarted",
        "ChannelCreated",
        "ChannelDtmfReceived",
        "BridgeDestroyed",
    ]
    .into_iter()
    .map(EventType::new)
    .collect()
}

/// Implemented by the live entity registry (`ari-client`). Event parsing
/// calls through this trait so that a REST-created entity and the event that
/// later announces it resolve to the *same* `Arc`.
pub trait EntityResolver: Send + Sync {
    fn resolve_channel(&self, payload: &Value) -> Arc<Channel>;
    fn resolve_bridge(&self, payload: &Value) -> Arc<Bridge>;
    fn resolve_playback(&self, payload: &Value) -> Arc<Playback>;
}

macro_rules! event_struct {
    ($name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            pub application: String,
            pub timestamp: String,
            pub asterisk_id: Option<String>,
            $(pub $field: $ty,)*
        }
    };
}

event_struct!(MissingParams { params: Vec<String> });
event_struct!(DeviceStateChanged { device_state: String });
event_struct!(PlaybackStarted { playback: Arc<Playback> });
event_struct!(PlaybackContinuing { playback: Arc<Playback> });
event_struct!(PlaybackFinished { playback: Arc<Playback> });
event_struct!(RecordingStarted { recording: Value });
event_struct!(RecordingFinished { recording: Value });
event_struct!(RecordingFailed { recording: Value });
event_struct!(BridgeCreated { bridge: Arc<Bridge> });
event_struct!(BridgeDestroyed { bridge: Arc<Bridge> });
event_struct!(BridgeMerged { bridge: Arc<Bridge>, bridge_from: Arc<Bridge> });
event_struct!(ChannelCreated { channel: Arc<Channel> });
event_struct!(ChannelDestroyed { cause: i64, cause_txt: String, channel: Arc<Channel> });
event_struct!(ChannelEnteredBridge { channel: Arc<Channel>, bridge: Arc<Bridge> });
event_struct!(ChannelLeftBridge { channel: Arc<Channel>, bridge: Arc<Bridge> });
event_struct!(ChannelStateChange { channel: Arc<Channel> });
event_struct!(ChannelDtmfReceived { digit: String, duration_ms: i64, channel: Arc<Channel> });
event_struct!(ChannelDialplan { dialplan_app: String, dialplan_app_data: String, channel: Arc<Channel> });
event_struct!(ChannelCallerId { caller_presentation: i64, caller_presentation_txt: String, channel: Arc<Channel> });
event_struct!(ChannelUserevent {
    eventname: String,
    userevent: Value,
    endpoint: Option<String>,
    channel: Option<Arc<Channel>>,
    bridge: Option<Arc<Bridge>>,
});
event_struct!(ChannelHangupRequest { cause: Option<i64>, soft: Option<bool>, channel: Arc<Channel> });
event_struct!(ChannelVarset { channel: Option<Arc<Channel>>, variable: String, value: String });
event_struct!(ChannelHold { musicclass: Option<String>, channel: Arc<Channel> });
event_struct!(ChannelUnhold { channel: Arc<Channel> });
event_struct!(ChannelTalkingStarted { channel: Arc<Channel> });
event_struct!(ChannelTalkingFinished { duration: i64, channel: Arc<Channel> });
event_struct!(ContactStatusChange { endpoint: String, contact_info: Value });
event_struct!(PeerStatusChange { endpoint: String, peer: Value });
event_struct!(EndpointStateChange { endpoint: Value });
event_struct!(Dial {
    caller: Option<Arc<Channel>>,
    forward: Option<String>,
    forwarded: Option<Arc<Channel>>,
    dialstring: Option<String>,
    dialstatus: String,
    peer: Arc<Channel>,
});
event_struct!(StasisEnd { channel: Arc<Channel> });
event_struct!(StasisStart { args: Vec<String>, replace_channel: Option<Arc<Channel>>, channel: Arc<Channel> });
event_struct!(ChannelConnectedLine { channel: Arc<Channel> });

/// A parsed ARI event. One variant per recognized `type` discriminator.
#[derive(Debug, Clone)]
pub enum Event {
    MissingParams(MissingParams),
    DeviceStateChanged(DeviceStateChanged),
    PlaybackStarted(PlaybackStarted),
    PlaybackContinuing(PlaybackContinuing),
    PlaybackFinished(PlaybackFinished),
    RecordingStarted(RecordingStarted),
    RecordingFinished(RecordingFinished),
    RecordingFailed(RecordingFailed),
    BridgeCreated(BridgeCreated),
    BridgeDestroyed(BridgeDestroyed),
    BridgeMerged(BridgeMerged),
    ChannelCreated(ChannelCreated),
    ChannelDestroyed(ChannelDestroyed),
    ChannelEnteredBridge(ChannelEnteredBridge),
    ChannelLeftBridge(ChannelLeftBridge),
    ChannelStateChange(ChannelStateChange),
    ChannelDtmfReceived(ChannelDtmfReceived),
    ChannelDialplan(ChannelDialplan),
    ChannelCallerId(ChannelCallerId),
    ChannelUserevent(ChannelUserevent),
    ChannelHangupRequest(ChannelHangupRequest),
    ChannelVarset(ChannelVarset),
    ChannelHold(ChannelHold),
    ChannelUnhold(ChannelUnhold),
    ChannelTalkingStarted(ChannelTalkingStarted),
    ChannelTalkingFinished(ChannelTalkingFinished),
    ContactStatusChange(ContactStatusChange),
    PeerStatusChange(PeerStatusChange),
    EndpointStateChange(EndpointStateChange),
    Dial(Dial),
    StasisEnd(StasisEnd),
    StasisStart(StasisStart),
    ChannelConnectedLine(ChannelConnectedLine),
}

fn opt_str(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn req_str(v: &Value, key: &str) -> Option<String> {
    opt_str(v, key)
}

fn req_i64(v: &Value, key: &str) -> Option<i64> {
    v.get(key).and_then(Value::as_i64)
}

impl Event {
    /// The `type` discriminator this event was parsed from.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::MissingParams(_) => "MissingParams",
            Event::DeviceStateChanged(_) => "DeviceStateChanged",
            Event::PlaybackStarted(_) => "PlaybackStarted",
            Event::PlaybackContinuing(_) => "PlaybackContinuing",
            Event::PlaybackFinished(_) => "PlaybackFinished",
            Event::RecordingStarted(_) => "RecordingStarted",
            Event::RecordingFinished(_) => "RecordingFinished",
            Event::RecordingFailed(_) => "RecordingFailed",
            Event::BridgeCreated(_) => "BridgeCreated",
            Event::BridgeDestroyed(_) => "BridgeDestroyed",
            Event::BridgeMerged(_) => "BridgeMerged",
            Event::ChannelCreated(_) => "ChannelCreated",
            Event::ChannelDestroyed(_) => "ChannelDestroyed",
            Event::ChannelEnteredBridge(_) => "ChannelEnteredBridge",
            Event::ChannelLeftBridge(_) => "ChannelLeftBridge",
            Event::ChannelStateChange(_) => "ChannelStateChange",
            Event::ChannelDtmfReceived(_) => "ChannelDtmfReceived",
            Event::ChannelDialplan(_) => "ChannelDialplan",
            Event::ChannelCallerId(_) => "ChannelCallerId",
            Event::ChannelUserevent(_) => "ChannelUserevent",
            Event::ChannelHangupRequest(_) => "ChannelHangupRequest",
            Event::ChannelVarset(_) => "ChannelVarset",
            Event::ChannelHold(_) => "ChannelHold",
            Event::ChannelUnhold(_) => "ChannelUnhold",
            Event::ChannelTalkingStarted(_) => "ChannelTalkingStarted",
            Event::ChannelTalkingFinished(_) => "ChannelTalkingFinished",
            Event::ContactStatusChange(_) => "ContactStatusChange",
            Event::PeerStatusChange(_) => "PeerStatusChange",
            Event::EndpointStateChange(_) => "EndpointStateChange",
            Event::Dial(_) => "Dial",
            Event::StasisEnd(_) => "StasisEnd",
            Event::StasisStart(_) => "StasisStart",
            Event::ChannelConnectedLine(_) => "ChannelConnectedLine",
        }
    }

    pub fn event_type(&self) -> EventType {
        EventType::new(self.type_name())
    }

    /// Parse a decoded JSON frame into an `Event`, resolving entity
    /// references through `resolver`. Returns `None` for a `type` this crate
    /// doesn't model, or when a required field is absent — both are dropped
    /// silently at the parse boundary per the schema-errors policy.
    pub fn parse(data: &Value, resolver: &dyn EntityResolver) -> Option<Event> {
        let type_name = data.get("type").and_then(Value::as_str)?;
        let application = req_str(data, "application").unwrap_or_default();
        let timestamp = req_str(data, "timestamp").unwrap_or_default();
        let asterisk_id = opt_str(data, "asterisk_id");

        macro_rules! base {
            () => {
                (application.clone(), timestamp.clone(), asterisk_id.clone())
            };
        }

        let channel = |key: &str| -> Option<Arc<Channel>> {
            data.get(key).map(|p| resolver.resolve_channel(p))
        };
        let bridge = |key: &str| -> Option<Arc<Bridge>> {
            data.get(key).map(|p| resolver.resolve_bridge(p))
        };
        let playback = |key: &str| -> Option<Arc<Playback>> {
            data.get(key).map(|p| resolver.resolve_playback(p))
        };

        Some(match type_name {
            "MissingParams" => {
                let (application, timestamp, asterisk_id) = base!();
                let params = data
                    .get("params")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect())
                    .unwrap_or_default();
                Event::MissingParams(MissingParams { application, timestamp, asterisk_id, params })
            }
            "DeviceStateChanged" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::DeviceStateChanged(DeviceStateChanged {
                    application,
                    timestamp,
                    asterisk_id,
                    device_state: req_str(data, "device_state")?,
                })
            }
            "PlaybackStarted" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::PlaybackStarted(PlaybackStarted {
                    application,
                    timestamp,
                    asterisk_id,
                    playback: playback("playback")?,
                })
            }
            "PlaybackContinuing" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::PlaybackContinuing(PlaybackContinuing {
                    application,
                    timestamp,
                    asterisk_id,
                    playback: playback("playback")?,
                })
            }
            "PlaybackFinished" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::PlaybackFinished(PlaybackFinished {
                    application,
                    timestamp,
                    asterisk_id,
                    playback: playback("playback")?,
                })
            }
            "RecordingStarted" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::RecordingStarted(RecordingStarted {
                    application,
                    timestamp,
                    asterisk_id,
                    recording: data.get("recording")?.clone(),
                })
            }
            "RecordingFinished" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::RecordingFinished(RecordingFinished {
                    application,
                    timestamp,
                    asterisk_id,
                    recording: data.get("recording")?.clone(),
                })
            }
            "RecordingFailed" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::RecordingFailed(RecordingFailed {
                    application,
                    timestamp,
                    asterisk_id,
                    recording: data.get("recording")?.clone(),
                })
            }
            "BridgeCreated" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::BridgeCreated(BridgeCreated {
                    application,
                    timestamp,
                    asterisk_id,
                    bridge: bridge("bridge")?,
                })
            }
            "BridgeDestroyed" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::BridgeDestroyed(BridgeDestroyed {
                    application,
                    timestamp,
                    asterisk_id,
                    bridge: bridge("bridge")?,
                })
            }
            "BridgeMerged" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::BridgeMerged(BridgeMerged {
                    application,
                    timestamp,
                    asterisk_id,
                    bridge: bridge("bridge")?,
                    bridge_from: bridge("bridge_from")?,
                })
            }
            "ChannelCreated" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelCreated(ChannelCreated {
                    application,
                    timestamp,
                    asterisk_id,
                    channel: channel("channel")?,
                })
            }
            "ChannelDestroyed" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelDestroyed(ChannelDestroyed {
                    application,
                    timestamp,
                    asterisk_id,
                    cause: req_i64(data, "cause").unwrap_or_default(),
                    cause_txt: req_str(data, "cause_txt").unwrap_or_default(),
                    channel: channel("channel")?,
                })
            }
            "ChannelEnteredBridge" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelEnteredBridge(ChannelEnteredBridge {
                    application,
                    timestamp,
                    asterisk_id,
                    channel: channel("channel")?,
                    bridge: bridge("bridge")?,
                })
            }
            "ChannelLeftBridge" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelLeftBridge(ChannelLeftBridge {
                    application,
                    timestamp,
                    asterisk_id,
                    channel: channel("channel")?,
                    bridge: bridge("bridge")?,
                })
            }
            "ChannelStateChange" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelStateChange(ChannelStateChange {
                    application,
                    timestamp,
                    asterisk_id,
                    channel: channel("channel")?,
                })
            }
            "ChannelDtmfReceived" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelDtmfReceived(ChannelDtmfReceived {
                    application,
                    timestamp,
                    asterisk_id,
                    digit: req_str(data, "digit")?,
                    duration_ms: req_i64(data, "duration_ms").unwrap_or_default(),
                    channel: channel("channel")?,
                })
            }
            "ChannelDialplan" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelDialplan(ChannelDialplan {
                    application,
                    timestamp,
                    asterisk_id,
                    dialplan_app: req_str(data, "dialplan_app").unwrap_or_default(),
                    dialplan_app_data: req_str(data, "dialplan_app_data").unwrap_or_default(),
                    channel: channel("channel")?,
                })
            }
            "ChannelCallerId" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelCallerId(ChannelCallerId {
                    application,
                    timestamp,
                    asterisk_id,
                    caller_presentation: req_i64(data, "caller_presentation").unwrap_or_default(),
                    caller_presentation_txt: req_str(data, "caller_presentation_txt").unwrap_or_default(),
                    channel: channel("channel")?,
                })
            }
            "ChannelUserevent" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelUserevent(ChannelUserevent {
                    application,
                    timestamp,
                    asterisk_id,
                    eventname: req_str(data, "eventname").unwrap_or_default(),
                    userevent: data.get("userevent").cloned().unwrap_or(Value::Null),
                    endpoint: opt_str(data, "endpoint"),
                    channel: channel("channel"),
                    bridge: bridge("bridge"),
                })
            }
            "ChannelHangupRequest" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelHangupRequest(ChannelHangupRequest {
                    application,
                    timestamp,
                    asterisk_id,
                    cause: req_i64(data, "cause"),
                    soft: data.get("soft").and_then(Value::as_bool),
                    channel: channel("channel")?,
                })
            }
            "ChannelVarset" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelVarset(ChannelVarset {
                    application,
                    timestamp,
                    asterisk_id,
                    channel: channel("channel"),
                    variable: req_str(data, "variable")?,
                    value: req_str(data, "value").unwrap_or_default(),
                })
            }
            "ChannelHold" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelHold(ChannelHold {
                    application,
                    timestamp,
                    asterisk_id,
                    musicclass: opt_str(data, "musicclass"),
                    channel: channel("channel")?,
                })
            }
            "ChannelUnhold" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelUnhold(ChannelUnhold {
                    application,
                    timestamp,
                    asterisk_id,
                    channel: channel("channel")?,
                })
            }
            "ChannelTalkingStarted" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelTalkingStarted(ChannelTalkingStarted {
                    application,
                    timestamp,
                    asterisk_id,
                    channel: channel("channel")?,
                })
            }
            "ChannelTalkingFinished" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelTalkingFinished(ChannelTalkingFinished {
                    application,
                    timestamp,
                    asterisk_id,
                    duration: req_i64(data, "duration").unwrap_or_default(),
                    channel: channel("channel")?,
                })
            }
            "ContactStatusChange" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ContactStatusChange(ContactStatusChange {
                    application,
                    timestamp,
                    asterisk_id,
                    endpoint: req_str(data, "endpoint")?,
                    contact_info: data.get("contact_info").cloned().unwrap_or(Value::Null),
                })
            }
            "PeerStatusChange" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::PeerStatusChange(PeerStatusChange {
                    application,
                    timestamp,
                    asterisk_id,
                    endpoint: req_str(data, "endpoint")?,
                    peer: data.get("peer").cloned().unwrap_or(Value::Null),
                })
            }
            "EndpointStateChange" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::EndpointStateChange(EndpointStateChange {
                    application,
                    timestamp,
                    asterisk_id,
                    endpoint: data.get("endpoint").cloned().unwrap_or(Value::Null),
                })
            }
            "Dial" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::Dial(Dial {
                    application,
                    timestamp,
                    asterisk_id,
                    caller: channel("caller"),
                    forward: opt_str(data, "forward"),
                    forwarded: channel("forwarded"),
                    dialstring: opt_str(data, "dialstring"),
                    dialstatus: req_str(data, "dialstatus").unwrap_or_default(),
                    peer: channel("peer")?,
                })
            }
            "StasisEnd" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::StasisEnd(StasisEnd {
                    application,
                    timestamp,
                    asterisk_id,
                    channel: channel("channel")?,
                })
            }
            "StasisStart" => {
                let (application, timestamp, asterisk_id) = base!();
                let args = data
                    .get("args")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect())
                    .unwrap_or_default();
                Event::StasisStart(StasisStart {
                    application,
                    timestamp,
                    asterisk_id,
                    args,
                    replace_channel: channel("replace_channel"),
                    channel: channel("channel")?,
                })
            }
            "ChannelConnectedLine" => {
                let (application, timestamp, asterisk_id) = base!();
                Event::ChannelConnectedLine(ChannelConnectedLine {
                    application,
                    timestamp,
                    asterisk_id,
                    channel: channel("channel")?,
                })
            }
            _ => return None,
        })
    }

    /// Channels referenced by this event per the `related_events` table —
    /// per-entity `Channel` callbacks for `self.type_name()` fire on each.
    pub fn related_channels(&self) -> Vec<Arc<Channel>> {
        match self {
            Event::ChannelCreated(e) => vec![e.channel.clone()],
            Event::ChannelDestroyed(e) => vec![e.channel.clone()],
            Event::ChannelEnteredBridge(e) => vec![e.channel.clone()],
            Event::ChannelLeftBridge(e) => vec![e.channel.clone()],
            Event::ChannelStateChange(e) => vec![e.channel.clone()],
            Event::ChannelDtmfReceived(e) => vec![e.channel.clone()],
            Event::ChannelDialplan(e) => vec![e.channel.clone()],
            Event::ChannelCallerId(e) => vec![e.channel.clone()],
            Event::ChannelHangupRequest(e) => vec![e.channel.clone()],
            Event::ChannelVarset(e) => e.channel.iter().cloned().collect(),
            Event::ChannelHold(e) => vec![e.channel.clone()],
            Event::ChannelUnhold(e) => vec![e.channel.clone()],
            Event::ChannelTalkingStarted(e) => vec![e.channel.clone()],
            Event::ChannelTalkingFinished(e) => vec![e.channel.clone()],
            Event::Dial(e) => e
                .caller
                .iter()
                .chain(std::iter::once(&e.peer))
                .chain(e.forwarded.iter())
                .cloned()
                .collect(),
            Event::StasisStart(e) => {
                let mut v = vec![e.channel.clone()];
                v.extend(e.replace_channel.clone());
                v
            }
            Event::StasisEnd(e) => vec![e.channel.clone()],
            Event::ChannelConnectedLine(e) => vec![e.channel.clone()],
            _ => Vec::new(),
        }
    }

    /// Bridges referenced by this event per the `related_events` table.
    pub fn related_bridges(&self) -> Vec<Arc<Bridge>> {
        match self {
            Event::BridgeCreated(e) => vec![e.bridge.clone()],
            Event::BridgeDestroyed(e) => vec![e.bridge.clone()],
            Event::BridgeMerged(e) => vec![e.bridge.clone()],
            Event::ChannelEnteredBridge(e) => vec![e.bridge.clone()],
            Event::ChannelLeftBridge(e) => vec![e.bridge.clone()],
            Event::ChannelUserevent(e) => e.bridge.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Playbacks referenced by this event per the `related_events` table.
    pub fn related_playbacks(&self) -> Vec<Arc<Playback>> {
        match self {
            Event::PlaybackStarted(e) => vec![e.playback.clone()],
            Event::PlaybackContinuing(e) => vec![e.playback.clone()],
            Event::PlaybackFinished(e) => vec![e.playback.clone()],
            _ => Vec::new(),
        }
    }

    /// Channel ids whose entity (and per-entity callbacks) must be evicted
    /// after this event is dispatched, per the `finish_events` table.
    pub fn finish_channel_ids(&self) -> Vec<String> {
        match self {
            Event::ChannelDestroyed(e) => vec![e.channel.id.clone()],
            Event::StasisEnd(e) => vec![e.channel.id.clone()],
            _ => Vec::new(),
        }
    }

    /// Bridge ids to evict after dispatch, per the `finish_events` table.
    pub fn finish_bridge_ids(&self) -> Vec<String> {
        match self {
            Event::BridgeDestroyed(e) => vec![e.bridge.id.clone()],
            _ => Vec::new(),
        }
    }

    /// Playback ids to evict after dispatch, per the `finish_events` table.
    pub fn finish_playback_ids(&self) -> Vec<String> {
        match self {
            Event::PlaybackFinished(e) => vec![e.playback.id.clone()],
            _ => Vec::new(),
        }
    }
}
