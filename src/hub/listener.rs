//! Listener identity
//!
//! A `Listener` is a callback with a stable identity. Rust closures cannot be
//! compared, so every listener gets a `Uuid` when it is built; clones share
//! the id, which is what `Hub::cancel` matches on.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

pub type ListenerId = Uuid;

type Callback<V> = dyn Fn(&[V]) + Send + Sync;

pub struct Listener<V> {
    id: ListenerId,
    callback: Arc<Callback<V>>,
}

impl<V> Listener<V> {
    /// Wrap a callback. It receives the values the topic was resolved with.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&[V]) + Send + Sync + 'static,
    {
        Self {
            id: Uuid::new_v4(),
            callback: Arc::new(callback),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub(crate) fn call(&self, values: &[V]) {
        (self.callback)(values)
    }
}

impl<V> Clone for Listener<V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<V> PartialEq for Listener<V> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<V> Eq for Listener<V> {}

impl<V> fmt::Debug for Listener<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}
