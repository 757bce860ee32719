//! Deferred halves of the hub API
//!
//! - `Resolver`: a topic bound to a hub, resolved later. Handy to hand to
//!   another async API as its completion callback.
//! - `Pending`: a future settling with a topic's value.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::hub::engine::{Hub, TopicKey};
use crate::hub::listener::ListenerId;
use crate::hub::topic::Payload;
use crate::utils::error::{HubError, Result};

pub struct Resolver<K, V> {
    hub: Hub<K, V>,
    topic: K,
}

impl<K, V> Resolver<K, V>
where
    K: TopicKey,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(hub: Hub<K, V>, topic: K) -> Self {
        Self { hub, topic }
    }

    pub fn topic(&self) -> &K {
        &self.topic
    }

    /// Same as `Hub::resolve` on the bound topic.
    pub fn resolve(&self, value: V) -> V {
        self.hub.resolve(self.topic.clone(), value)
    }

    /// Same as `Hub::resolve_with` on the bound topic.
    pub fn resolve_with<I>(&self, values: I) -> Option<V>
    where
        I: IntoIterator<Item = V>,
    {
        self.hub.resolve_with(self.topic.clone(), values)
    }

    /// Turn the resolver into a plain closure.
    pub fn into_fn(self) -> impl Fn(V) -> V + Send + Sync + 'static {
        move |value| self.resolve(value)
    }
}

impl<K: Clone, V> Clone for Resolver<K, V> {
    fn clone(&self) -> Self {
        Self {
            hub: self.hub.clone(),
            topic: self.topic.clone(),
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Resolver<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

/// Unsubscribes the listener behind a `Pending` when it is dropped unsettled.
type Cancel = Box<dyn FnOnce(ListenerId) + Send + Sync>;

/// Future returned by `Hub::wait_for`.
///
/// Settles with the payload of the topic, or `HubError::Dropped` when the
/// topic is dropped, the waiter is cancelled or the hub goes away first.
/// Dropping the future before it settles unsubscribes its listener.
#[must_use = "futures do nothing unless polled"]
pub struct Pending<V> {
    id: ListenerId,
    rx: oneshot::Receiver<Payload<V>>,
    cancel: Option<Cancel>,
}

impl<V> Pending<V> {
    pub(crate) fn new<F>(id: ListenerId, rx: oneshot::Receiver<Payload<V>>, cancel: F) -> Self
    where
        F: FnOnce(ListenerId) + Send + Sync + 'static,
    {
        Self {
            id,
            rx,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Identity of the internal listener backing this future.
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl<V> Future for Pending<V> {
    type Output = Result<Payload<V>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let res = std::task::ready!(Pin::new(&mut this.rx).poll(cx));
        // settled either way, nothing left to unsubscribe
        this.cancel = None;
        Poll::Ready(res.map_err(|_| HubError::Dropped))
    }
}

impl<V> Drop for Pending<V> {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel(self.id);
        }
    }
}

impl<V> fmt::Debug for Pending<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("id", &self.id)
            .field("settled", &self.cancel.is_none())
            .finish()
    }
}
