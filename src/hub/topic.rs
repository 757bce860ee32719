//! Topic state
//!
//! A `TopicState` holds the last resolved payload of a topic and the
//! listeners waiting on it. Pending subscriptions are kept in one ordered list
//! so that one-shot and repeating listeners fire in the order they subscribed;
//! each entry records its mode, which doubles as the listener → repeating
//! registration mapping used by cancellation.
//!
//! Concurrency note: callers must synchronize access to `TopicState` (the hub
//! keeps all topics behind one lock). Nothing here invokes a listener; the
//! methods only decide *who* must be called and with *what*.

use std::sync::Arc;

use crate::hub::listener::{Listener, ListenerId};

/// Values a topic was resolved with. Shared between every delivery of one
/// resolution event.
pub type Payload<V> = Arc<[V]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fire on the next (or current) value, then forget.
    Once,
    /// Fire on the current value and on every later resolution.
    Repeat,
}

#[derive(Debug)]
struct Subscription<V> {
    listener: Listener<V>,
    mode: Mode,
}

#[derive(Debug)]
pub struct TopicState<V> {
    value: Option<Payload<V>>,
    pending: Vec<Subscription<V>>,
}

impl<V> Default for TopicState<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TopicState<V> {
    pub fn new() -> Self {
        Self {
            value: None,
            pending: Vec::new(),
        }
    }

    pub fn value(&self) -> Option<&Payload<V>> {
        self.value.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.pending.iter().any(|s| s.listener.id() == id)
    }

    /// Number of one-shot listeners waiting for the next resolution.
    pub fn pending_once(&self) -> usize {
        self.count(Mode::Once)
    }

    /// Number of repeating listeners.
    pub fn repeating(&self) -> usize {
        self.count(Mode::Repeat)
    }

    fn count(&self, mode: Mode) -> usize {
        self.pending.iter().filter(|s| s.mode == mode).count()
    }

    /// Register `listener`. Returns the payload it must be handed right away,
    /// if any.
    ///
    /// - A listener already registered in the same or a stronger mode is a no-op.
    /// - `Once` on a resolved topic is satisfied immediately and not stored.
    /// - `Repeat` is stored and, on a resolved topic, also satisfied immediately.
    /// - `Repeat` over a pending `Once` upgrades it without delivering twice.
    pub fn subscribe(&mut self, listener: Listener<V>, mode: Mode) -> Option<Payload<V>> {
        if let Some(existing) = self
            .pending
            .iter_mut()
            .find(|s| s.listener.id() == listener.id())
        {
            if mode == Mode::Repeat {
                existing.mode = Mode::Repeat;
            }
            return None;
        }

        match mode {
            Mode::Once => match &self.value {
                Some(value) => Some(Arc::clone(value)),
                None => {
                    self.pending.push(Subscription { listener, mode });
                    None
                }
            },
            Mode::Repeat => {
                self.pending.push(Subscription { listener, mode });
                self.value.clone()
            }
        }
    }

    /// Store `payload` and drain the pending list. Returns the listeners to
    /// invoke, in subscription order; repeating listeners stay registered.
    pub fn resolve(&mut self, payload: Payload<V>) -> Vec<Listener<V>> {
        self.value = Some(payload);

        let drained = std::mem::take(&mut self.pending);
        let mut fired = Vec::with_capacity(drained.len());
        for subscription in drained {
            if subscription.mode == Mode::Repeat {
                self.pending.push(Subscription {
                    listener: subscription.listener.clone(),
                    mode: Mode::Repeat,
                });
            }
            fired.push(subscription.listener);
        }
        fired
    }

    /// Remove a listener whatever its mode, handing it back if it was
    /// registered. Ids are unique within the pending list.
    pub fn cancel(&mut self, id: ListenerId) -> Option<Listener<V>> {
        let at = self.pending.iter().position(|s| s.listener.id() == id)?;
        Some(self.pending.remove(at).listener)
    }
}
