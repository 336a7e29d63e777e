//! Entity registry (component C): process-wide `{kind -> {id -> entity}}`
//! indexes with get-or-create canonicalization.
//!
//! Each kind has its own construction mutex. The mutex is held for the full
//! duration of a `get_or_create` call so that two concurrent constructions
//! for the same id cannot both win — the loser always observes the winner's
//! entity and just refreshes it.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::sync::Arc;

use ari_types::{Bridge, Channel, EntityResolver, Playback};
use serde_json::Value;

struct Shard<T> {
    // A dedicated construction lock serializes get-or-create bodies; the
    // map itself is additionally behind its own lock so plain `get` reads
    // never have to wait behind an in-flight construction elsewhere.
    construct: Mutex<()>,
    entries: RwLock<HashMap<String, Arc<T>>>,
}

impl<T> Shard<T> {
    fn new() -> Self {
        Shard {
            construct: Mutex::new(()),
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, id: &str) -> Option<Arc<T>> {
        self.entries.read().expect("registry lock poisoned").get(id).cloned()
    }

    fn remove(&self, id: &str) -> Option<Arc<T>> {
        self.entries.write().expect("registry lock poisoned").remove(id)
    }

    fn is_closed_remove_all(&self) {
        self.entries.write().expect("registry lock poisoned").clear();
    }
}

/// The live entity store. Implements [`EntityResolver`] so event parsing in
/// `ari-types` canonicalizes through the same maps REST responses use.
pub struct Registry {
    channels: Shard<Channel>,
    bridges: Shard<Bridge>,
    playbacks: Shard<Playback>,
    closed: std::sync::atomic::AtomicBool,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Registry {
            channels: Shard::new(),
            bridges: Shard::new(),
            playbacks: Shard::new(),
            closed: std::sync::atomic::AtomicBool::new(false),
        })
    }

    pub fn get_channel(&self, id: &str) -> Option<Arc<Channel>> {
        self.channels.get(id)
    }

    pub fn get_bridge(&self, id: &str) -> Option<Arc<Bridge>> {
        self.bridges.get(id)
    }

    pub fn get_playback(&self, id: &str) -> Option<Arc<Playback>> {
        self.playbacks.get(id)
    }

    pub fn get_or_create_channel(&self, payload: &Value) -> Arc<Channel> {
        get_or_create(&self.channels, payload, Channel::from_json, Channel::update_from_json)
    }

    pub fn get_or_create_bridge(&self, payload: &Value) -> Arc<Bridge> {
        get_or_create(&self.bridges, payload, Bridge::from_json, Bridge::update_from_json)
    }

    pub fn get_or_create_playback(&self, payload: &Value) -> Arc<Playback> {
        get_or_create(&self.playbacks, payload, Playback::from_json, Playback::update_from_json)
    }

    pub fn remove_channel(&self, id: &str) -> Option<Arc<Channel>> {
        self.channels.remove(id)
    }

    pub fn remove_bridge(&self, id: &str) -> Option<Arc<Bridge>> {
        self.bridges.remove(id)
    }

    pub fn remove_playback(&self, id: &str) -> Option<Arc<Playback>> {
        self.playbacks.remove(id)
    }

    /// Evicts every entity. Used on client shutdown; subsequent `put`-style
    /// operations (via `get_or_create`) remain harmless no-ops because the
    /// caller who held the client has stopped driving it, not because this
    /// method blocks anything.
    pub fn close(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
        self.channels.is_closed_remove_all();
        self.bridges.is_closed_remove_all();
        self.playbacks.is_closed_remove_all();
    }
}

fn get_or_create<T>(
    shard: &Shard<T>,
    payload: &Value,
    construct: impl Fn(&Value) -> T,
    refresh: impl Fn(&T, &Value),
) -> Arc<T> {
    let id = payload.get("id").and_then(Value::as_str).unwrap_or_default();
    let _guard = shard.construct.lock().expect("registry construction lock poisoned");
    if let Some(existing) = shard.get(id) {
        refresh(&existing, payload);
        return existing;
    }
    let entity = Arc::new(construct(payload));
    shard
        .entries
        .write()
        .expect("registry lock poisoned")
        .insert(id.to_owned(), entity.clone());
    entity
}

impl EntityResolver for Registry {
    fn resolve_channel(&self, payload: &Value) -> Arc<Channel> {
        self.get_or_create_channel(payload)
    }

    fn resolve_bridge(&self, payload: &Value) -> Arc<Bridge> {
        self.get_or_create_bridge(payload)
    }

    fn resolve_playback(&self, payload: &Value) -> Arc<Playback> {
        self.get_or_create_playback(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn channel_payload(id: &str) -> Value {
        json!({
            "id": id, "name": "PJSIP/100-1", "state": "Up",
            "caller": {"name": "", "number": ""}, "connected": {"name": "", "number": ""},
            "creationtime": "t", "language": "en", "dialplan": {}, "accountcode": "",
        })
    }

    #[test]
    fn get_or_create_returns_same_identity_for_same_id() {
        let registry = Registry::new();
        let a = registry.get_or_create_channel(&channel_payload("ch1"));
        let b = registry.get_or_create_channel(&channel_payload("ch1"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn remove_evicts_entity_so_get_returns_none() {
        let registry = Registry::new();
        registry.get_or_create_channel(&channel_payload("ch1"));
        assert!(registry.get_channel("ch1").is_some());
        registry.remove_channel("ch1");
        assert!(registry.get_channel("ch1").is_none());
    }

    #[test]
    fn update_refreshes_raw_payload_without_new_identity() {
        let registry = Registry::new();
        let first = registry.get_or_create_channel(&channel_payload("ch1"));
        assert_eq!(first.state(), "Up");
        let mut second_payload = channel_payload("ch1");
        second_payload["state"] = json!("Ringing");
        let second = registry.get_or_create_channel(&second_payload);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.state(), "Ringing");
    }
}
