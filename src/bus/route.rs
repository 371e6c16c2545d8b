//! Per-topic route
//!
//! A route is the bus's view of one topic: the live bindings registered on
//! it, each with the kind of its user and the sending half of its inbox.
//! Routes hold no buffers; they only point at the bindings' queues.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::registry::{BindingId, UserHandle, UserKindHandle};
use crate::stats::TopicStats;

/// A binding registered on a route
#[derive(Debug)]
pub(crate) struct Subscriber {
    pub user: UserHandle,
    pub user_kind: UserKindHandle,
    pub inbox: mpsc::UnboundedSender<Bytes>,
}

/// Live bindings on one topic
#[derive(Debug, Default)]
pub(super) struct Route {
    subscribers: HashMap<BindingId, Subscriber>,
    chunks_published: AtomicU64,
    deliveries: AtomicU64,
}

impl Route {
    pub(super) fn insert(&mut self, id: BindingId, subscriber: Subscriber) {
        self.subscribers.insert(id, subscriber);
    }

    pub(super) fn remove(&mut self, id: BindingId) -> Option<Subscriber> {
        self.subscribers.remove(&id)
    }

    pub(super) fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Subscribers other than `from` whose user is of `target_kind`
    fn targets(
        &self,
        from: BindingId,
        target_kind: UserKindHandle,
    ) -> impl Iterator<Item = (&BindingId, &Subscriber)> + '_ {
        self.subscribers
            .iter()
            .filter(move |(id, sub)| **id != from && sub.user_kind == target_kind)
    }

    /// Count the subscribers a write from `from` would reach
    pub(super) fn matching(&self, from: BindingId, target_kind: UserKindHandle) -> usize {
        self.targets(from, target_kind).count()
    }

    /// Enqueue `data` into every matching subscriber's inbox
    ///
    /// Returns the number of inboxes that accepted the chunk. `Bytes` clones
    /// share one allocation, so fan-out does not copy the payload.
    pub(super) fn deliver(
        &self,
        from: BindingId,
        target_kind: UserKindHandle,
        data: &Bytes,
    ) -> usize {
        let mut delivered = 0;
        for (id, sub) in self.targets(from, target_kind) {
            if sub.inbox.send(data.clone()).is_ok() {
                delivered += 1;
            } else {
                // Receiver already dropped; the binding is mid-close
                tracing::debug!(binding = %id, user = %sub.user, "Skipping closed inbox");
            }
        }

        self.chunks_published.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        delivered
    }

    pub(super) fn stats(&self) -> TopicStats {
        let kinds: HashSet<UserKindHandle> =
            self.subscribers.values().map(|sub| sub.user_kind).collect();
        TopicStats {
            bindings: self.subscribers.len(),
            kinds: kinds.len(),
            chunks_published: self.chunks_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
        }
    }
}
