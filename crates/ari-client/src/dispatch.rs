//! Dispatcher (component E): single worker draining the event queue in
//! strict arrival order, invoking class then per-entity callbacks, then
//! evicting finished entities.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::error;

use ari_types::{EntityKind, Event};

use crate::callbacks::AnyEntity;
use crate::client::AriClient;

/// Drains `rx` until a `None` sentinel (sent on shutdown) arrives. Intended
/// to be `tokio::spawn`ed exactly once per client.
pub async fn run(client: Arc<AriClient>, mut rx: UnboundedReceiver<Event>) {
    while let Some(event) = rx.recv().await {
        dispatch_one(&client, &event);
    }
}

fn dispatch_one(client: &Arc<AriClient>, event: &Event) {
    let event_type = event.event_type();

    for (_, cb) in client.callbacks().snapshot_class(&event_type) {
        invoke_class(client, event, &cb);
    }

    for channel in event.related_channels() {
        let id = channel.id.clone();
        for (_, cb) in client.callbacks().snapshot_entity(&event_type, EntityKind::Channel, &id) {
            invoke_entity(client, event, &AnyEntity::Channel(channel.clone()), &cb);
        }
    }
    for bridge in event.related_bridges() {
        let id = bridge.id.clone();
        for (_, cb) in client.callbacks().snapshot_entity(&event_type, EntityKind::Bridge, &id) {
            invoke_entity(client, event, &AnyEntity::Bridge(bridge.clone()), &cb);
        }
    }
    for playback in event.related_playbacks() {
        let id = playback.id.clone();
        for (_, cb) in client.callbacks().snapshot_entity(&event_type, EntityKind::Playback, &id) {
            invoke_entity(client, event, &AnyEntity::Playback(playback.clone()), &cb);
        }
    }

    for id in event.finish_channel_ids() {
        client.registry().remove_channel(&id);
        client.callbacks().evict_entity(EntityKind::Channel, &id);
    }
    for id in event.finish_bridge_ids() {
        client.registry().remove_bridge(&id);
        client.callbacks().evict_entity(EntityKind::Bridge, &id);
    }
    for id in event.finish_playback_ids() {
        client.registry().remove_playback(&id);
        client.callbacks().evict_entity(EntityKind::Playback, &id);
    }
}

fn invoke_class(client: &Arc<AriClient>, event: &Event, cb: &crate::callbacks::ClassCallback) {
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| cb(client, event)));
    if result.is_err() {
        error!(event_type = event.type_name(), "class callback panicked");
    }
}

fn invoke_entity(client: &Arc<AriClient>, event: &Event, entity: &AnyEntity, cb: &crate::callbacks::EntityCallback) {
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| cb(client, event, entity)));
    if result.is_err() {
        error!(event_type = event.type_name(), "entity callback panicked");
    }
}
