//! # SubscriptionRegistry - the active set.
//!
//! Tracks which subscription ids are backed by a running emission task.
//!
//! ## Rules
//! - An id is a member between processing its create and processing its delete.
//! - Membership is never duplicated; a second insert is reported, not applied.
//! - Removing an id that is not a member is an inconsistency fault.
//! - Emission tasks only read; the controller alone mutates.

use std::collections::HashSet;

use tokio::sync::RwLock;

use crate::broker::SubscriptionId;
use crate::error::ControllerError;

/// Set of active subscription ids.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    active: RwLock<HashSet<SubscriptionId>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id`; returns `false` if it was already active.
    pub async fn insert(&self, id: SubscriptionId) -> bool {
        self.active.write().await.insert(id)
    }

    /// Removes `id`.
    ///
    /// Returns [`ControllerError::UnknownSubscription`] if `id` was not active.
    pub async fn remove(&self, id: SubscriptionId) -> Result<(), ControllerError> {
        if self.active.write().await.remove(&id) {
            Ok(())
        } else {
            Err(ControllerError::UnknownSubscription { id })
        }
    }

    pub async fn contains(&self, id: SubscriptionId) -> bool {
        self.active.read().await.contains(&id)
    }

    /// Returns sorted list of active ids.
    pub async fn snapshot(&self) -> Vec<SubscriptionId> {
        let active = self.active.read().await;
        let mut ids: Vec<SubscriptionId> = active.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub async fn len(&self) -> usize {
        self.active.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.active.read().await.is_empty()
    }
}
