//! Capabilities the consumer drives but never implements itself.
//!
//! Whatever draws markers (a scene graph, a game engine, a test double)
//! implements [`MarkerSink`] for pose sessions or [`JointRig`] for joint
//! sessions. The reconciler only ever calls these methods.

use glam::Vec3;
use posewire_net::MarkerId;

/// Spawns and manipulates one visual marker per tracked id.
pub trait MarkerSink {
    /// Opaque reference to a spawned marker.
    type Handle;

    /// Create a visible marker for `id` at `position`.
    fn spawn_marker(&mut self, id: MarkerId, position: Vec3) -> Self::Handle;

    /// Move an existing marker.
    fn move_marker(&mut self, handle: &Self::Handle, position: Vec3);

    /// Make a marker invisible without destroying it.
    fn hide(&mut self, handle: &Self::Handle);

    /// Make a hidden marker visible again.
    fn show(&mut self, handle: &Self::Handle);
}

/// One of the fixed points driven by joint messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    LeftHand,
    RightHand,
    Head,
}

impl Joint {
    /// All joints in wire order.
    pub const ALL: [Joint; 3] = [Joint::LeftHand, Joint::RightHand, Joint::Head];
}

/// Receives joint positions.
pub trait JointRig {
    /// Place `joint` at `position`, replacing whatever it had.
    fn set_joint(&mut self, joint: Joint, position: Vec3);
}
