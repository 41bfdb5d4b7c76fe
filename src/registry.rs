//! Insertion-ordered set of topic subscriptions.
//!
//! Entries survive disconnects and are replayed after every successful
//! connect. Only `subscribe` and `unsubscribe` mutate the set.

use crate::types::{OutboundMessage, Subscription};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct SubscriptionRegistry {
    order: Vec<Subscription>,
    members: HashSet<Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `subscription`. Returns `false` if it was already present.
    pub fn subscribe(&mut self, subscription: Subscription) -> bool {
        if !self.members.insert(subscription.clone()) {
            debug!(%subscription, "Subscription already registered");
            return false;
        }
        self.order.push(subscription);
        true
    }

    /// Removes `subscription`. Returns `false` if it was not present.
    pub fn unsubscribe(&mut self, subscription: &Subscription) -> bool {
        if !self.members.remove(subscription) {
            return false;
        }
        self.order.retain(|s| s != subscription);
        true
    }

    /// Sends one subscribe message per entry, in insertion order.
    pub fn replay_all(&self, mut send: impl FnMut(OutboundMessage)) {
        for subscription in &self.order {
            send(subscription.subscribe_message());
        }
    }

    pub fn contains(&self, subscription: &Subscription) -> bool {
        self.members.contains(subscription)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
