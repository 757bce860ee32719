//! Hub engine
//!
//! This module contains the in-memory notification hub responsible for:
//! - keeping one `TopicState` per topic, created lazily
//! - memoizing the last resolved payload of each topic
//! - handing pending and late subscribers their payload exactly once
//! - re-arming repeating subscribers after every resolution
//!
//! Concurrency and usage notes:
//! - Every public operation runs to completion synchronously and only holds
//!   the topic lock for bookkeeping and for queueing deliveries, so the queue
//!   follows the order of state changes even across threads. Listeners are
//!   never invoked under the lock, nor inside the call that triggered them:
//!   they run on the hub's dispatcher on a later turn.
//! - `Hub` is a cheap handle (`Arc` inside); clones share state. Use `spawn`
//!   for an independent hub.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, oneshot};
use tracing::{debug, trace};

use crate::config::HubSettings;
use crate::hub::dispatch::{DeliveryFailure, Dispatcher};
use crate::hub::listener::{Listener, ListenerId};
use crate::hub::resolver::{Pending, Resolver};
use crate::hub::topic::{Mode, Payload, TopicState};

/// Anything usable as a topic identifier.
pub trait TopicKey: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> TopicKey for T where T: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

pub struct Hub<K, V> {
    inner: Arc<Inner<K, V>>,
}

struct Inner<K, V> {
    topics: Mutex<HashMap<K, TopicState<V>>>,
    dispatcher: Dispatcher<K, V>,
    settings: HubSettings,
}

impl<K, V> Hub<K, V>
where
    K: TopicKey,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_settings(HubSettings::default())
    }

    pub fn with_settings(settings: HubSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: Mutex::new(HashMap::new()),
                dispatcher: Dispatcher::new(settings.dispatch, settings.failure_capacity),
                settings,
            }),
        }
    }

    /// A new hub with the same settings and no shared state.
    pub fn spawn(&self) -> Self {
        Self::with_settings(self.inner.settings.clone())
    }

    pub fn settings(&self) -> &HubSettings {
        &self.inner.settings
    }

    /// No callback ever runs under this lock, so a poisoned map is still consistent.
    fn topics(&self) -> MutexGuard<'_, HashMap<K, TopicState<V>>> {
        self.inner
            .topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Call `listener` once with the next value of `topic`, or with the
    /// current one if the topic is already resolved. Subscribing a listener
    /// that is already pending on the topic is a no-op.
    pub fn subscribe_once(&self, topic: impl Into<K>, listener: &Listener<V>) {
        self.subscribe(topic.into(), listener, Mode::Once);
    }

    /// Call `listener` with the current value (if any) and on every later
    /// resolution of `topic`, until cancelled.
    pub fn subscribe_all(&self, topic: impl Into<K>, listener: &Listener<V>) {
        self.subscribe(topic.into(), listener, Mode::Repeat);
    }

    fn subscribe(&self, topic: K, listener: &Listener<V>, mode: Mode) {
        let mut topics = self.topics();
        let ready = topics
            .entry(topic.clone())
            .or_default()
            .subscribe(listener.clone(), mode);

        trace!(topic = ?topic, listener = %listener.id(), ?mode, ready = ready.is_some(), "subscribed");
        // enqueue under the topic lock so deliveries keep the order of the
        // state changes that caused them; the dispatcher never takes this lock
        if let Some(payload) = ready {
            self.inner.dispatcher.deliver(topic, listener.clone(), payload);
        }
    }

    /// A future settling with the value of `topic`: right away if it is
    /// resolved, otherwise on its next resolution.
    pub fn wait_for(&self, topic: impl Into<K>) -> Pending<V> {
        let (tx, rx) = oneshot::channel();
        let slot = Mutex::new(Some(tx));
        let listener = Listener::new(move |values: &[V]| {
            let tx = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(tx) = tx {
                // the waiter may have been dropped
                let _ = tx.send(Payload::from(values));
            }
        });

        let topic = topic.into();
        self.subscribe_once(topic.clone(), &listener);

        // a dropped waiter unsubscribes, unless the hub is already gone
        let hub = Arc::downgrade(&self.inner);
        Pending::new(listener.id(), rx, move |id| {
            if let Some(inner) = hub.upgrade() {
                Hub { inner }.cancel(topic, id);
            }
        })
    }

    /// Resolve `topic` with a single value. Returns the value back.
    pub fn resolve(&self, topic: impl Into<K>, value: V) -> V {
        self.publish(topic.into(), Payload::from([value.clone()]));
        value
    }

    /// Resolve `topic` with any number of values, including none. Returns the
    /// first value, if there is one.
    pub fn resolve_with<I>(&self, topic: impl Into<K>, values: I) -> Option<V>
    where
        I: IntoIterator<Item = V>,
    {
        let payload: Payload<V> = values.into_iter().collect();
        let first = payload.first().cloned();
        self.publish(topic.into(), payload);
        first
    }

    /// Bind `topic` now, resolve it later.
    pub fn resolver(&self, topic: impl Into<K>) -> Resolver<K, V> {
        Resolver::new(self.clone(), topic.into())
    }

    fn publish(&self, topic: K, payload: Payload<V>) {
        let mut topics = self.topics();
        let fired = topics
            .entry(topic.clone())
            .or_default()
            .resolve(Arc::clone(&payload));

        debug!(topic = ?topic, values = payload.len(), listeners = fired.len(), "resolved");
        for listener in fired {
            self.inner
                .dispatcher
                .deliver(topic.clone(), listener, Arc::clone(&payload));
        }
    }

    /// Remove a one-shot or repeating listener from `topic`. Returns whether
    /// it was registered; unknown topics and listeners are ignored.
    pub fn cancel(&self, topic: impl Into<K>, listener: ListenerId) -> bool {
        let topic = topic.into();
        // the listener is released after the lock: it may own a `Pending`
        // whose drop cancels on this same hub
        let removed = self
            .topics()
            .get_mut(&topic)
            .and_then(|state| state.cancel(listener));

        trace!(topic = ?topic, %listener, removed = removed.is_some(), "cancelled");
        removed.is_some()
    }

    /// Forget `topic` entirely: its value and every pending subscription.
    /// Outstanding `wait_for` futures on it settle with `HubError::Dropped`.
    pub fn drop_topic(&self, topic: impl Into<K>) -> bool {
        let topic = topic.into();
        let removed = self.topics().remove(&topic);

        debug!(topic = ?topic, existed = removed.is_some(), "dropped");
        removed.is_some()
    }

    /// Completes once every delivery scheduled before this call has run.
    pub fn flush(&self) -> impl Future<Output = ()> + Send + use<K, V> {
        let done = self.inner.dispatcher.barrier();
        async move {
            let _ = done.await;
        }
    }

    /// Receiver for listeners that panicked during delivery.
    pub fn failures(&self) -> broadcast::Receiver<DeliveryFailure<K>> {
        self.inner.dispatcher.failures()
    }

    pub fn is_resolved(&self, topic: &K) -> bool {
        self.topics().get(topic).is_some_and(TopicState::is_resolved)
    }

    /// The cached payload of `topic`, if resolved.
    pub fn value(&self, topic: &K) -> Option<Payload<V>> {
        self.topics().get(topic).and_then(|s| s.value().cloned())
    }

    /// `(one_shot, repeating)` listener counts for `topic`.
    pub fn pending(&self, topic: &K) -> (usize, usize) {
        self.topics()
            .get(topic)
            .map_or((0, 0), |s| (s.pending_once(), s.repeating()))
    }

    /// Number of topics currently known to the hub.
    pub fn topics_len(&self) -> usize {
        self.topics().len()
    }
}

/// Short names mirroring the classic `when` / `that` / `all` vocabulary.
impl<K, V> Hub<K, V>
where
    K: TopicKey,
    V: Clone + Send + Sync + 'static,
{
    pub fn when(&self, topic: impl Into<K>, listener: &Listener<V>) {
        self.subscribe_once(topic, listener);
    }

    pub fn that(&self, topic: impl Into<K>, value: V) -> V {
        self.resolve(topic, value)
    }

    pub fn about(&self, topic: impl Into<K>, value: V) -> V {
        self.resolve(topic, value)
    }

    pub fn all(&self, topic: impl Into<K>, listener: &Listener<V>) {
        self.subscribe_all(topic, listener);
    }
}

impl<K, V> Default for Hub<K, V>
where
    K: TopicKey,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for Hub<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for Hub<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = self
            .inner
            .topics
            .lock()
            .map_or(0, |topics| topics.len());
        f.debug_struct("Hub")
            .field("topics", &topics)
            .field("settings", &self.inner.settings)
            .finish()
    }
}
