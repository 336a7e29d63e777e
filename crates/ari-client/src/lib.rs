//! ARI client runtime: REST transport, entity registry, event pump, and
//! dispatcher fused into one handle.
//!
//! Consumers build an [`AriClient`] with [`AriClient::connect`], register
//! class- and entity-scoped callbacks, issue REST operations through the
//! convenience methods on the client (or the lower-level [`RestClient`]),
//! and call [`AriClient::close`] on shutdown.

mod callbacks;
mod client;
mod dispatch;
mod error;
mod pump;
mod registry;
mod rest;

pub use ari_types::{Bridge, Channel, EntityKind, EntityResolver, Event, EventType, Playback};
pub use callbacks::{AnyEntity, CallbackRegistry, ClassCallback, EntityCallback};
pub use client::AriClient;
pub use error::{PumpError, RestError};
pub use registry::Registry;
pub use rest::RestClient;
