//! Per-tick reconciliation of marker poses against the tracked registry.
//!
//! Each tick the consumer drains the inbox and applies every message in
//! arrival order. An unseen id spawns a marker and enters the recency
//! window; a known id moves its marker only when some axis changed by more
//! than the configured tolerance. Entities are never destroyed, only hidden,
//! so id lookups stay stable for the life of the reconciler.

use std::collections::HashMap;

use glam::Vec3;
use posewire_config::{EvictionPolicy, SyncSection};
use posewire_net::{EventKind, Inbox, MarkerId, Message, PoseMessage};

use crate::recency::RecencyWindow;
use crate::sink::MarkerSink;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Per-axis absolute difference below which an update is treated as noise.
pub const DEFAULT_TOLERANCE: f32 = 0.01;

/// Number of recently created markers kept visible.
pub const DEFAULT_WINDOW_CAPACITY: usize = 2;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("no tracked marker with id {0}")]
    UnknownMarker(MarkerId),
}

// ---------------------------------------------------------------------------
// ReconcilerConfig
// ---------------------------------------------------------------------------

/// Tuning for [`PoseReconciler`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilerConfig {
    pub tolerance: f32,
    /// 0 disables eviction.
    pub window_capacity: usize,
    pub eviction: EvictionPolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            eviction: EvictionPolicy::default(),
        }
    }
}

impl ReconcilerConfig {
    pub fn from_section(section: &SyncSection) -> Self {
        Self {
            tolerance: section.tolerance,
            window_capacity: section.window_capacity,
            eviction: section.eviction,
        }
    }
}

// ---------------------------------------------------------------------------
// TrackedEntity / TickReport
// ---------------------------------------------------------------------------

/// Registry entry for one marker id.
#[derive(Debug, Clone)]
pub struct TrackedEntity<H> {
    pub id: MarkerId,
    /// Last accepted position. Updated while hidden too.
    pub position: Vec3,
    pub visible: bool,
    pub handle: H,
}

/// What a single tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Newly created markers, in creation order.
    pub created: Vec<(MarkerId, Vec3)>,
    /// Known markers whose position was replaced.
    pub updated: usize,
    /// Known markers whose update fell within tolerance.
    pub suppressed: usize,
    /// Markers hidden by the recency window, in eviction order.
    pub hidden: Vec<MarkerId>,
    /// Joint snapshots written to the rig.
    pub joints_applied: usize,
    /// Messages that carried no work for this consumer.
    pub ignored: usize,
}

impl TickReport {
    /// Total messages accounted for by this report.
    pub fn processed(&self) -> usize {
        self.created.len() + self.updated + self.suppressed + self.joints_applied + self.ignored
    }

    pub fn is_empty(&self) -> bool {
        self.processed() == 0
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

/// Something invoked once per external tick to apply inbound messages.
pub trait Consumer {
    /// Apply one message, recording the outcome in `report`.
    fn apply(&mut self, message: Message, report: &mut TickReport);

    /// Drain `inbox` and apply everything in FIFO order.
    fn tick(&mut self, inbox: &Inbox<Message>) -> TickReport {
        let mut report = TickReport::default();
        for message in inbox.drain_all() {
            self.apply(message, &mut report);
        }
        report
    }
}

// ---------------------------------------------------------------------------
// PoseReconciler
// ---------------------------------------------------------------------------

/// Create-or-update consumer for pose sessions.
pub struct PoseReconciler<S: MarkerSink> {
    config: ReconcilerConfig,
    sink: S,
    entities: HashMap<MarkerId, TrackedEntity<S::Handle>>,
    window: RecencyWindow,
}

impl<S: MarkerSink> PoseReconciler<S> {
    pub fn new(config: ReconcilerConfig, sink: S) -> Self {
        Self {
            window: RecencyWindow::new(config.window_capacity, config.eviction),
            config,
            sink,
            entities: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn entity(&self, id: MarkerId) -> Option<&TrackedEntity<S::Handle>> {
        self.entities.get(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &TrackedEntity<S::Handle>> {
        self.entities.values()
    }

    /// Number of tracked markers, visible or not.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn window(&self) -> &RecencyWindow {
        &self.window
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Show a hidden marker again and make it the newest window member.
    ///
    /// Returns the ids hidden to make room for it. Reactivating a marker
    /// that is already visible does nothing.
    pub fn reactivate(&mut self, id: MarkerId) -> Result<Vec<MarkerId>, SyncError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(SyncError::UnknownMarker(id))?;
        if entity.visible {
            return Ok(Vec::new());
        }

        entity.visible = true;
        self.sink.show(&entity.handle);
        tracing::debug!("Marker {id} reactivated");

        let evicted = self.window.on_create(id);
        Ok(self.hide_all(evicted))
    }

    fn apply_pose(&mut self, pose: PoseMessage, report: &mut TickReport) {
        let PoseMessage { id, position, .. } = pose;

        if let Some(entity) = self.entities.get_mut(&id) {
            if (position - entity.position).abs().max_element() > self.config.tolerance {
                entity.position = position;
                self.sink.move_marker(&entity.handle, position);
                report.updated += 1;
            } else {
                report.suppressed += 1;
            }
            return;
        }

        let handle = self.sink.spawn_marker(id, position);
        self.entities.insert(
            id,
            TrackedEntity {
                id,
                position,
                visible: true,
                handle,
            },
        );
        tracing::debug!("Marker {id} created at {position}");
        report.created.push((id, position));

        let evicted = self.window.on_create(id);
        report.hidden.extend(self.hide_all(evicted));
    }

    fn hide_all(&mut self, ids: Vec<MarkerId>) -> Vec<MarkerId> {
        let mut hidden = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            if entity.visible {
                entity.visible = false;
                self.sink.hide(&entity.handle);
                tracing::debug!("Marker {id} hidden");
                hidden.push(id);
            }
        }
        hidden
    }
}

impl<S: MarkerSink> Consumer for PoseReconciler<S> {
    fn apply(&mut self, message: Message, report: &mut TickReport) {
        let pose = match message {
            Message::Pose(pose) => pose,
            Message::Joints(_) => {
                tracing::warn!("Pose reconciler ignoring joint message");
                report.ignored += 1;
                return;
            }
        };

        match &pose.kind {
            EventKind::PoseUpdate => {}
            EventKind::AnchorCreated | EventKind::Heartbeat | EventKind::Echo => {
                tracing::debug!("Ignoring {} message for id {}", pose.kind.as_wire(), pose.id);
                report.ignored += 1;
                return;
            }
            EventKind::Other(kind) => {
                tracing::debug!("Ignoring unknown kind {kind:?} for id {}", pose.id);
                report.ignored += 1;
                return;
            }
        }

        self.apply_pose(pose, report);
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
