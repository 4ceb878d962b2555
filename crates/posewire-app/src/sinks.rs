//! Headless collaborators that report marker and joint activity to the log.

use glam::Vec3;
use posewire_net::MarkerId;
use posewire_sync::{Joint, JointRig, MarkerSink};
use tracing::{debug, info};

/// Marker sink that logs every call. The handle is the marker id.
#[derive(Debug, Default)]
pub struct LoggingMarkerSink {
    spawned: usize,
    visible: usize,
}

impl LoggingMarkerSink {
    pub fn spawned(&self) -> usize {
        self.spawned
    }

    pub fn visible(&self) -> usize {
        self.visible
    }
}

impl MarkerSink for LoggingMarkerSink {
    type Handle = MarkerId;

    fn spawn_marker(&mut self, id: MarkerId, position: Vec3) -> MarkerId {
        self.spawned += 1;
        self.visible += 1;
        info!("Spawned marker {id} at {position}");
        id
    }

    fn move_marker(&mut self, handle: &MarkerId, position: Vec3) {
        debug!("Moved marker {handle} to {position}");
    }

    fn hide(&mut self, handle: &MarkerId) {
        self.visible = self.visible.saturating_sub(1);
        info!("Hid marker {handle}");
    }

    fn show(&mut self, handle: &MarkerId) {
        self.visible += 1;
        info!("Showed marker {handle}");
    }
}

/// Joint rig that keeps the latest positions and logs them at debug.
#[derive(Debug, Default)]
pub struct LoggingRig {
    pub left_hand: Vec3,
    pub right_hand: Vec3,
    pub head: Vec3,
}

impl JointRig for LoggingRig {
    fn set_joint(&mut self, joint: Joint, position: Vec3) {
        let slot = match joint {
            Joint::LeftHand => &mut self.left_hand,
            Joint::RightHand => &mut self.right_hand,
            Joint::Head => &mut self.head,
        };
        *slot = position;
        debug!("{joint:?} -> {position}");
    }
}
