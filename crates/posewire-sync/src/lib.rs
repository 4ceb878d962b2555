//! Consumer side of posewire: drains the inbox once per tick and reconciles
//! inbound poses against a registry of tracked markers.

pub mod joints;
pub mod recency;
pub mod reconciler;
pub mod sink;

pub use joints::JointMirror;
pub use recency::RecencyWindow;
pub use reconciler::{
    Consumer, DEFAULT_TOLERANCE, DEFAULT_WINDOW_CAPACITY, PoseReconciler, ReconcilerConfig,
    SyncError, TickReport, TrackedEntity,
};
pub use sink::{Joint, JointRig, MarkerSink};
