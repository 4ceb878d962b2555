use super::*;

#[derive(Debug, Clone, PartialEq)]
enum SinkCall {
    Spawn(MarkerId, Vec3),
    Move(MarkerId, Vec3),
    Hide(MarkerId),
    Show(MarkerId),
}

/// Records every call; the handle is the marker id itself.
#[derive(Debug, Default)]
struct RecordingSink {
    calls: Vec<SinkCall>,
}

impl MarkerSink for RecordingSink {
    type Handle = MarkerId;

    fn spawn_marker(&mut self, id: MarkerId, position: Vec3) -> MarkerId {
        self.calls.push(SinkCall::Spawn(id, position));
        id
    }

    fn move_marker(&mut self, handle: &MarkerId, position: Vec3) {
        self.calls.push(SinkCall::Move(*handle, position));
    }

    fn hide(&mut self, handle: &MarkerId) {
        self.calls.push(SinkCall::Hide(*handle));
    }

    fn show(&mut self, handle: &MarkerId) {
        self.calls.push(SinkCall::Show(*handle));
    }
}

fn reconciler(capacity: usize, eviction: EvictionPolicy) -> PoseReconciler<RecordingSink> {
    PoseReconciler::new(
        ReconcilerConfig {
            window_capacity: capacity,
            eviction,
            ..Default::default()
        },
        RecordingSink::default(),
    )
}

fn update(id: MarkerId, x: f32, y: f32, z: f32) -> Message {
    Message::pose(EventKind::PoseUpdate, id, Vec3::new(x, y, z))
}

fn apply_all(
    reconciler: &mut PoseReconciler<RecordingSink>,
    messages: impl IntoIterator<Item = Message>,
) -> TickReport {
    let inbox = Inbox::new();
    for message in messages {
        inbox.push(message);
    }
    reconciler.tick(&inbox)
}

fn visible(reconciler: &PoseReconciler<RecordingSink>, id: MarkerId) -> bool {
    reconciler.entity(id).map(|e| e.visible).unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

#[test]
fn test_update_within_tolerance_is_suppressed() {
    let mut rec = reconciler(2, EvictionPolicy::SlidingWindow);
    apply_all(&mut rec, [update(1, 0.0, 0.0, 0.0)]);

    let report = apply_all(&mut rec, [update(1, 0.005, 0.005, 0.005)]);
    assert_eq!(report.suppressed, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(rec.entity(1).unwrap().position, Vec3::ZERO);
    assert_eq!(rec.sink().calls, vec![SinkCall::Spawn(1, Vec3::ZERO)]);
}

#[test]
fn test_update_beyond_tolerance_on_one_axis_replaces() {
    let mut rec = reconciler(2, EvictionPolicy::SlidingWindow);
    apply_all(&mut rec, [update(1, 0.0, 0.0, 0.0)]);

    let report = apply_all(&mut rec, [update(1, 0.02, 0.0, 0.0)]);
    assert_eq!(report.updated, 1);
    assert_eq!(rec.entity(1).unwrap().position, Vec3::new(0.02, 0.0, 0.0));
    assert_eq!(
        rec.sink().calls.last(),
        Some(&SinkCall::Move(1, Vec3::new(0.02, 0.0, 0.0)))
    );
}

#[test]
fn test_negative_delta_counts_as_change() {
    let mut rec = reconciler(2, EvictionPolicy::SlidingWindow);
    apply_all(&mut rec, [update(1, 1.0, 1.0, 1.0)]);

    let report = apply_all(&mut rec, [update(1, 1.0, 1.0, 0.9)]);
    assert_eq!(report.updated, 1);
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[test]
fn test_same_id_creates_one_entity() {
    let mut rec = reconciler(2, EvictionPolicy::SlidingWindow);
    let report = apply_all(&mut rec, [update(7, 1.0, 2.0, 3.0), update(7, 1.0, 2.0, 3.0)]);

    assert_eq!(rec.len(), 1);
    assert_eq!(report.created, vec![(7, Vec3::new(1.0, 2.0, 3.0))]);
    assert_eq!(report.suppressed, 1);
    let spawns = rec
        .sink()
        .calls
        .iter()
        .filter(|c| matches!(c, SinkCall::Spawn(..)))
        .count();
    assert_eq!(spawns, 1);
}

#[test]
fn test_empty_inbox_does_nothing() {
    let mut rec = reconciler(2, EvictionPolicy::SlidingWindow);
    let report = rec.tick(&Inbox::new());
    assert!(report.is_empty());
    assert!(rec.sink().calls.is_empty());
}

#[test]
fn test_non_update_kinds_are_ignored() {
    let mut rec = reconciler(2, EvictionPolicy::SlidingWindow);
    let report = apply_all(
        &mut rec,
        [
            Message::pose(EventKind::Heartbeat, 0, Vec3::ZERO),
            Message::pose(EventKind::Echo, 1, Vec3::ONE),
            Message::pose(EventKind::AnchorCreated, 2, Vec3::ONE),
            Message::pose(EventKind::Other("calibrate".into()), 3, Vec3::ONE),
        ],
    );

    assert_eq!(report.ignored, 4);
    assert!(rec.is_empty());
    assert!(rec.sink().calls.is_empty());
}

#[test]
fn test_joint_message_is_ignored_by_pose_reconciler() {
    let mut rec = reconciler(2, EvictionPolicy::SlidingWindow);
    let joints = Message::Joints(posewire_net::JointMessage {
        left_hand: Vec3::ONE,
        right_hand: Vec3::ONE,
        head: Vec3::ONE,
    });
    let report = apply_all(&mut rec, [joints]);
    assert_eq!(report.ignored, 1);
    assert!(rec.is_empty());
}

// ---------------------------------------------------------------------------
// Recency window
// ---------------------------------------------------------------------------

#[test]
fn test_sliding_window_hides_oldest() {
    let mut rec = reconciler(2, EvictionPolicy::SlidingWindow);
    let report = apply_all(
        &mut rec,
        [update(1, 0.0, 0.0, 0.0), update(2, 1.0, 0.0, 0.0), update(3, 2.0, 0.0, 0.0)],
    );

    assert_eq!(report.hidden, vec![1]);
    assert!(!visible(&rec, 1));
    assert!(visible(&rec, 2));
    assert!(visible(&rec, 3));
    assert_eq!(rec.len(), 3);
    assert!(rec.sink().calls.contains(&SinkCall::Hide(1)));
}

#[test]
fn test_batch_sweep_hides_in_batches() {
    let mut rec = reconciler(2, EvictionPolicy::BatchSweep);

    let report = apply_all(&mut rec, [update(1, 0.0, 0.0, 0.0), update(2, 0.0, 0.0, 0.0)]);
    assert!(report.hidden.is_empty());

    let report = apply_all(&mut rec, [update(3, 0.0, 0.0, 0.0)]);
    assert_eq!(report.hidden, vec![1, 2]);
    assert!(visible(&rec, 3));

    let report = apply_all(&mut rec, [update(4, 0.0, 0.0, 0.0), update(5, 0.0, 0.0, 0.0)]);
    assert_eq!(report.hidden, vec![3, 4]);
    assert!(visible(&rec, 5));
}

#[test]
fn test_zero_capacity_keeps_everything_visible() {
    let mut rec = reconciler(0, EvictionPolicy::SlidingWindow);
    let report = apply_all(&mut rec, (0..5).map(|id| update(id, 0.0, 0.0, 0.0)));
    assert!(report.hidden.is_empty());
    assert!(rec.entities().all(|e| e.visible));
}

#[test]
fn test_hidden_entity_tracks_position_without_showing() {
    let mut rec = reconciler(1, EvictionPolicy::SlidingWindow);
    apply_all(&mut rec, [update(1, 0.0, 0.0, 0.0), update(2, 0.0, 0.0, 0.0)]);
    assert!(!visible(&rec, 1));

    let report = apply_all(&mut rec, [update(1, 5.0, 0.0, 0.0)]);
    assert_eq!(report.updated, 1);
    assert!(report.created.is_empty());
    assert!(!visible(&rec, 1));
    assert_eq!(rec.entity(1).unwrap().position, Vec3::new(5.0, 0.0, 0.0));
    assert!(!rec.sink().calls.contains(&SinkCall::Show(1)));
}

// ---------------------------------------------------------------------------
// Reactivation
// ---------------------------------------------------------------------------

#[test]
fn test_reactivate_shows_and_evicts_oldest_member() {
    let mut rec = reconciler(2, EvictionPolicy::SlidingWindow);
    apply_all(
        &mut rec,
        [update(1, 0.0, 0.0, 0.0), update(2, 0.0, 0.0, 0.0), update(3, 0.0, 0.0, 0.0)],
    );
    assert!(!visible(&rec, 1));

    let hidden = rec.reactivate(1).unwrap();
    assert_eq!(hidden, vec![2]);
    assert!(visible(&rec, 1));
    assert!(!visible(&rec, 2));
    assert_eq!(rec.window().members().collect::<Vec<_>>(), vec![3, 1]);
    assert!(rec.sink().calls.contains(&SinkCall::Show(1)));
}

#[test]
fn test_reactivate_visible_is_noop() {
    let mut rec = reconciler(2, EvictionPolicy::SlidingWindow);
    apply_all(&mut rec, [update(1, 0.0, 0.0, 0.0)]);
    let before = rec.sink().calls.len();

    assert_eq!(rec.reactivate(1), Ok(Vec::new()));
    assert_eq!(rec.sink().calls.len(), before);
}

#[test]
fn test_reactivate_unknown_fails() {
    let mut rec = reconciler(2, EvictionPolicy::SlidingWindow);
    assert_eq!(rec.reactivate(42), Err(SyncError::UnknownMarker(42)));
}

#[test]
fn test_config_from_section() {
    let section = SyncSection {
        tolerance: 0.5,
        window_capacity: 4,
        eviction: EvictionPolicy::BatchSweep,
        ..Default::default()
    };
    let config = ReconcilerConfig::from_section(&section);
    assert_eq!(config.tolerance, 0.5);
    assert_eq!(config.window_capacity, 4);
    assert_eq!(config.eviction, EvictionPolicy::BatchSweep);
}
