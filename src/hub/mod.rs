//! hub
//!
//! The notification hub: a keyed, value-memoizing publish/subscribe primitive.
//! A topic can be resolved with a value; listeners registered before or after
//! the resolution receive it exactly once, repeating listeners receive every
//! resolution, and pending listeners can be cancelled before they fire.
//!
//! Public types:
//! - `Hub`: the owner of all topic state
//! - `Listener`: a callback with a stable identity
//! - `Resolver` / `Pending`: the deferred halves of resolve and subscribe
//! - `DeliveryFailure`: a listener that panicked during delivery

pub mod dispatch;
pub mod engine;
pub mod listener;
pub mod resolver;
pub mod topic;

use std::sync::LazyLock;

use serde_json::Value;

use crate::config::{DispatchMode, HubSettings};

pub use dispatch::DeliveryFailure;
pub use engine::{Hub, TopicKey};
pub use listener::{Listener, ListenerId};
pub use resolver::{Pending, Resolver};
pub use topic::{Payload, TopicState};

static DEFAULT_HUB: LazyLock<Hub<String, Value>> = LazyLock::new(|| {
    // not tied to whichever runtime happens to touch it first
    Hub::with_settings(HubSettings {
        dispatch: DispatchMode::Thread,
        ..HubSettings::default()
    })
});

/// The process-wide default hub, keyed by string topics and carrying JSON
/// values. Subsystems that need private topics should `spawn` their own.
pub fn broadcast() -> &'static Hub<String, Value> {
    &DEFAULT_HUB
}
