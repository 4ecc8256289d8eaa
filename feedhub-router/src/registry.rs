//! Live and retired subscription indexes.

use crate::subscription::Subscription;
use feedhub_core::SubscriptionId;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

/// Manages subscriptions known to a router.
///
/// Live subscriptions are held strongly and iterate in creation order.
/// Terminal subscriptions move to a weak index so a late envelope can be
/// told apart from a never-seen id for as long as any consumer still holds
/// the handle.
pub struct SubscriptionRegistry {
    live: RwLock<BTreeMap<SubscriptionId, Arc<Subscription>>>,
    retired: Mutex<HashMap<SubscriptionId, Weak<Subscription>>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            live: RwLock::new(BTreeMap::new()),
            retired: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a subscription to the live index.
    pub fn insert(&self, subscription: Arc<Subscription>) {
        self.live.write().insert(subscription.id(), subscription);
    }

    /// Adds a subscription unless an equal request is already live.
    ///
    /// Subscriptions with a pending stop do not count as duplicates.
    ///
    /// # Errors
    /// Returns the existing subscription when one matches.
    pub fn insert_unique(&self, subscription: Arc<Subscription>) -> Result<(), Arc<Subscription>> {
        let mut live = self.live.write();
        if let Some(existing) = live.values().find(|existing| {
            existing.spec() == subscription.spec()
                && !existing.is_stop_requested()
                && !existing.is_terminal()
        }) {
            return Err(Arc::clone(existing));
        }
        live.insert(subscription.id(), subscription);
        Ok(())
    }

    /// Looks up a live subscription.
    #[must_use]
    pub fn get(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        self.live.read().get(&id).cloned()
    }

    /// Moves a subscription from the live to the retired index.
    ///
    /// Returns the subscription if it was live.
    pub fn retire(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        let removed = self.live.write().remove(&id)?;
        let mut retired = self.retired.lock();
        retired.retain(|_, weak| weak.strong_count() > 0);
        retired.insert(id, Arc::downgrade(&removed));
        Some(removed)
    }

    /// Returns true if `id` was live once and is still referenced somewhere.
    #[must_use]
    pub fn is_retired(&self, id: SubscriptionId) -> bool {
        self.retired
            .lock()
            .get(&id)
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Snapshot of live subscriptions in creation order.
    #[must_use]
    pub fn live(&self) -> Vec<Arc<Subscription>> {
        self.live.read().values().cloned().collect()
    }

    /// Snapshot of live subscriptions served by `connector`.
    #[must_use]
    pub fn live_for_connector(&self, connector: &str) -> Vec<Arc<Subscription>> {
        self.live
            .read()
            .values()
            .filter(|sub| sub.connector() == connector)
            .cloned()
            .collect()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.read().len()
    }

    /// Returns true if nothing is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.read().is_empty()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
