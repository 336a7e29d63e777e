//! Callback registry (component F): class-level and per-entity callback
//! chains, guarded by one mutex, with snapshot-on-dispatch semantics.
//!
//! Rust closures have no identity usable as a map key (unlike the Python
//! function objects the original implementation deduplicated on), so every
//! registration carries a caller-chosen `token`: re-registering the same
//! token for the same key is a no-op, matching the "duplicate registration"
//! rule in the specification.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use ari_types::{Bridge, Channel, EntityKind, Event, EventType, Playback};

use crate::client::AriClient;

/// A resolved entity handle passed to per-entity callbacks. The dispatcher
/// already knows the entity's kind from the association table it consulted,
/// so this is a plain tagged union rather than a trait object.
#[derive(Clone)]
pub enum AnyEntity {
    Channel(Arc<Channel>),
    Bridge(Arc<Bridge>),
    Playback(Arc<Playback>),
}

pub type ClassCallback = Arc<dyn Fn(&AriClient, &Event) + Send + Sync>;
pub type EntityCallback = Arc<dyn Fn(&AriClient, &Event, &AnyEntity) + Send + Sync>;

type EntityKey = (EntityKind, String);

#[derive(Default)]
struct Inner {
    class_cb: HashMap<EventType, Vec<(String, ClassCallback)>>,
    entity_cb: HashMap<EventType, HashMap<EntityKey, Vec<(String, EntityCallback)>>>,
    allowed: HashSet<EventType>,
}

pub struct CallbackRegistry {
    inner: Mutex<Inner>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        let mut allowed = HashSet::new();
        for ev in ari_types::builtin_allowed_events() {
            allowed.insert(ev);
        }
        CallbackRegistry {
            inner: Mutex::new(Inner {
                class_cb: HashMap::new(),
                entity_cb: HashMap::new(),
                allowed,
            }),
        }
    }

    /// Register a class-level callback for `event_type`. Adds `event_type`
    /// to the allowed-event set. A duplicate `token` for the same
    /// `event_type` is a no-op.
    pub fn register_class(&self, event_type: EventType, token: impl Into<String>, cb: ClassCallback) {
        let token = token.into();
        let mut inner = self.inner.lock().expect("callback registry lock poisoned");
        inner.allowed.insert(event_type.clone());
        let list = inner.class_cb.entry(event_type).or_default();
        if !list.iter().any(|(t, _)| t == &token) {
            list.push((token, cb));
        }
    }

    pub fn remove_class(&self, event_type: &EventType, token: &str) {
        let mut inner = self.inner.lock().expect("callback registry lock poisoned");
        if let Some(list) = inner.class_cb.get_mut(event_type) {
            list.retain(|(t, _)| t != token);
        }
    }

    /// Register a per-entity callback for `event_type` scoped to `(kind, id)`.
    /// Also extends the allowed-event set.
    pub fn register_entity(
        &self,
        event_type: EventType,
        kind: EntityKind,
        id: impl Into<String>,
        token: impl Into<String>,
        cb: EntityCallback,
    ) {
        let token = token.into();
        let key: EntityKey = (kind, id.into());
        let mut inner = self.inner.lock().expect("callback registry lock poisoned");
        inner.allowed.insert(event_type.clone());
        let by_entity = inner.entity_cb.entry(event_type).or_default();
        let list = by_entity.entry(key).or_default();
        if !list.iter().any(|(t, _)| t == &token) {
            list.push((token, cb));
        }
    }

    /// Snapshot of class callbacks registered for `event_type`, in
    /// registration order, taken at the moment of the call — safe to invoke
    /// while other threads mutate the registry concurrently.
    pub fn snapshot_class(&self, event_type: &EventType) -> Vec<(String, ClassCallback)> {
        let inner = self.inner.lock().expect("callback registry lock poisoned");
        inner.class_cb.get(event_type).cloned().unwrap_or_default()
    }

    pub fn snapshot_entity(
        &self,
        event_type: &EventType,
        kind: EntityKind,
        id: &str,
    ) -> Vec<(String, EntityCallback)> {
        let inner = self.inner.lock().expect("callback registry lock poisoned");
        inner
            .entity_cb
            .get(event_type)
            .and_then(|by_entity| by_entity.get(&(kind, id.to_owned())))
            .cloned()
            .unwrap_or_default()
    }

    /// Evicts every per-entity callback keyed by `(kind, id)`, across all
    /// event types. Called when the entity is finished (component C).
    pub fn evict_entity(&self, kind: EntityKind, id: &str) {
        let mut inner = self.inner.lock().expect("callback registry lock poisoned");
        let key: EntityKey = (kind, id.to_owned());
        for by_entity in inner.entity_cb.values_mut() {
            by_entity.remove(&key);
        }
    }

    pub fn allowed_events(&self) -> Vec<EventType> {
        let inner = self.inner.lock().expect("callback registry lock poisoned");
        let mut v: Vec<_> = inner.allowed.iter().cloned().collect();
        v.sort();
        v
    }

    pub fn is_allowed(&self, event_type: &EventType) -> bool {
        self.inner.lock().expect("callback registry lock poisoned").allowed.contains(event_type)
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn duplicate_token_registration_is_a_no_op() {
        let registry = CallbackRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let cb: ClassCallback = Arc::new(move |_, _| {
            calls2.fetch_add(1, Ordering::SeqCst);
        });
        let et = EventType::new("StasisStart");
        registry.register_class(et.clone(), "tok", cb.clone());
        registry.register_class(et.clone(), "tok", cb);
        assert_eq!(registry.snapshot_class(&et).len(), 1);
    }

    #[test]
    fn registering_an_event_type_extends_allowed_set() {
        let registry = CallbackRegistry::new();
        let et = EventType::new("ChannelTalkingStarted");
        assert!(!registry.allowed_events().contains(&et));
        let cb: ClassCallback = Arc::new(|_, _| {});
        registry.register_class(et.clone(), "tok", cb);
        assert!(registry.allowed_events().contains(&et));
    }

    #[test]
    fn evict_entity_removes_callbacks_across_all_event_types() {
        let registry = CallbackRegistry::new();
        let cb: EntityCallback = Arc::new(|_, _, _| {});
        registry.register_entity(
            EventType::new("ChannelDestroyed"),
            EntityKind::Channel,
            "ch1",
            "tok",
            cb.clone(),
        );
        registry.register_entity(EventType::new("ChannelHold"), EntityKind::Channel, "ch1", "tok", cb);
        registry.evict_entity(EntityKind::Channel, "ch1");
        assert!(registry
            .snapshot_entity(&EventType::new("ChannelDestroyed"), EntityKind::Channel, "ch1")
            .is_empty());
        assert!(registry
            .snapshot_entity(&EventType::new("ChannelHold"), EntityKind::Channel, "ch1")
            .is_empty());
    }
}
