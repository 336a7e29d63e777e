//! Typed representations of ARI entities and events, and the association
//! rules the dispatcher uses to route events to per-entity callbacks.
//!
//! This crate holds no live state — it is the schema component. The actual
//! registry of live entities lives in `ari-client`, which implements
//! [`EntityResolver`] over its own storage.

mod entities;
mod event;

pub use entities::{Bridge, CallerId, Channel, EntityKind, Playback};
pub use event::{
    builtin_allowed_events, BridgeCreated, BridgeDestroyed, BridgeMerged, ChannelCallerId,
    ChannelConnectedLine, ChannelCreated, ChannelDestroyed, ChannelDialplan,
    ChannelDtmfReceived, ChannelEnteredBridge, ChannelHangupRequest, ChannelHold,
    ChannelLeftBridge, ChannelStateChange, ChannelTalkingFinished, ChannelTalkingStarted,
    ChannelUnhold, ChannelUserevent, ChannelVarset, ContactStatusChange, DeviceStateChanged,
    Dial, EndpointStateChange, Event, EntityResolver, EventType, MissingParams,
    PeerStatusChange, PlaybackContinuing, PlaybackFinished, PlaybackStarted, RecordingFailed,
    RecordingFinished, RecordingStarted, StasisEnd, StasisStart,
};
