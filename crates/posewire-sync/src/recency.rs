//! Recency window: bounds how many recently created markers stay visible.
//!
//! Members are kept in creation order. [`RecencyWindow::on_create`] returns
//! the ids that just fell out of the window; the caller hides them. Hidden
//! ids are never members, so re-entering one is just another `on_create`.

use std::collections::VecDeque;

use posewire_config::EvictionPolicy;
use posewire_net::MarkerId;

/// Fixed-capacity FIFO over marker ids.
#[derive(Debug, Clone)]
pub struct RecencyWindow {
    capacity: usize,
    policy: EvictionPolicy,
    members: VecDeque<MarkerId>,
}

impl RecencyWindow {
    /// A window holding `capacity` members. A capacity of 0 disables eviction.
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            capacity,
            policy,
            members: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Record a newly created (or reactivated) marker and return the ids to hide.
    pub fn on_create(&mut self, id: MarkerId) -> Vec<MarkerId> {
        if self.capacity == 0 {
            return Vec::new();
        }

        self.members.push_back(id);

        match self.policy {
            EvictionPolicy::SlidingWindow => {
                let excess = self.members.len().saturating_sub(self.capacity);
                self.members.drain(..excess).collect()
            }
            // The whole oldest batch goes once the batch has grown one past capacity.
            EvictionPolicy::BatchSweep if self.members.len() > self.capacity => {
                self.members.drain(..self.capacity).collect()
            }
            EvictionPolicy::BatchSweep => Vec::new(),
        }
    }

    /// Current members, oldest first.
    pub fn members(&self) -> impl Iterator<Item = MarkerId> + '_ {
        self.members.iter().copied()
    }

    /// Whether `id` is currently a member.
    pub fn contains(&self, id: MarkerId) -> bool {
        self.members.contains(&id)
    }

    /// Number of current members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the window has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }
}
