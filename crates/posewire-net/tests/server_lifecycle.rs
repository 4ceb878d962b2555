//! End-to-end tests against a real server bound to an ephemeral port.

use std::time::Duration;

use glam::Vec3;
use posewire_net::{
    EventKind, Inbox, Message, MessageShape, SendError, ServerConfig, ServerHandle, ServerState,
    TelemetryClient, TelemetryServer, heartbeat_message,
};
use tokio::sync::watch;

const TIMEOUT: Duration = Duration::from_secs(5);

fn start_server(shape: MessageShape) -> (ServerHandle, Inbox<Message>) {
    let inbox = Inbox::new();
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        shape,
        ..Default::default()
    };
    let handle = TelemetryServer::new(config, inbox.clone()).start().unwrap();
    (handle, inbox)
}

async fn wait_for_state(
    rx: &mut watch::Receiver<ServerState>,
    pred: impl FnMut(&ServerState) -> bool,
) -> ServerState {
    let state = tokio::time::timeout(TIMEOUT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for server state")
        .expect("server state channel closed");
    *state
}

async fn wait_for_messages(inbox: &Inbox<Message>, count: usize) -> Vec<Message> {
    let mut received = Vec::new();
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while received.len() < count {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out with {} of {count} messages",
            received.len()
        );
        received.extend(inbox.drain_all());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    received
}

fn pose(id: i64, x: f32, y: f32, z: f32) -> Message {
    Message::pose(EventKind::PoseUpdate, id, Vec3::new(x, y, z))
}

#[tokio::test]
async fn test_messages_reach_inbox_in_order() {
    let (handle, inbox) = start_server(MessageShape::Pose);
    let mut client = TelemetryClient::connect(handle.local_addr(), MessageShape::Pose)
        .await
        .unwrap();

    let sent: Vec<Message> = (0..20).map(|i| pose(i, i as f32, 0.0, 0.0)).collect();
    for message in &sent {
        client.send(message).await.unwrap();
    }

    assert_eq!(wait_for_messages(&inbox, sent.len()).await, sent);
}

#[tokio::test]
async fn test_message_split_across_writes() {
    let (handle, inbox) = start_server(MessageShape::Pose);
    let mut client = TelemetryClient::connect(handle.local_addr(), MessageShape::Pose)
        .await
        .unwrap();

    let line = b"{\"resp\":\"aruco_pose\",\"id\":9,\"x\":1.5,\"y\":2.5,\"z\":3.5}\n{\"resp\":";
    for chunk in line.chunks(7) {
        client.send_raw(chunk).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    client
        .send_raw(b"\"aruco_pose\",\"id\":10,\"x\":0,\"y\":0,\"z\":0}\n")
        .await
        .unwrap();

    let received = wait_for_messages(&inbox, 2).await;
    assert_eq!(received, vec![pose(9, 1.5, 2.5, 3.5), pose(10, 0.0, 0.0, 0.0)]);
}

#[tokio::test]
async fn test_malformed_frames_do_not_stop_the_stream() {
    let (handle, inbox) = start_server(MessageShape::Pose);
    let mut client = TelemetryClient::connect(handle.local_addr(), MessageShape::Pose)
        .await
        .unwrap();

    client.send_raw(b"{broken\n").await.unwrap();
    client
        .send_raw(b"{\"LHand_x\":1,\"LHand_y\":2,\"LHand_z\":3}\n")
        .await
        .unwrap();
    client.send(&pose(1, 0.0, 0.0, 0.0)).await.unwrap();

    assert_eq!(wait_for_messages(&inbox, 1).await, vec![pose(1, 0.0, 0.0, 0.0)]);
    assert_eq!(handle.state(), ServerState::Connected(handle.sender().active_session().unwrap()));
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let (handle, inbox) = start_server(MessageShape::Pose);
    let mut state = handle.subscribe();

    let mut first = TelemetryClient::connect(handle.local_addr(), MessageShape::Pose)
        .await
        .unwrap();
    let first_session =
        match wait_for_state(&mut state, |s| matches!(s, ServerState::Connected(_))).await {
            ServerState::Connected(id) => id,
            other => panic!("unexpected state {other:?}"),
        };
    first.send(&pose(1, 0.0, 0.0, 0.0)).await.unwrap();
    assert_eq!(wait_for_messages(&inbox, 1).await.len(), 1);

    first.close().await.unwrap();
    wait_for_state(&mut state, |s| *s == ServerState::Listening).await;

    let mut second = TelemetryClient::connect(handle.local_addr(), MessageShape::Pose)
        .await
        .unwrap();
    let second_session = match wait_for_state(&mut state, |s| {
        matches!(s, ServerState::Connected(id) if *id != first_session)
    })
    .await
    {
        ServerState::Connected(id) => id,
        other => panic!("unexpected state {other:?}"),
    };
    assert!(second_session > first_session);

    second.send(&pose(2, 0.5, 0.5, 0.5)).await.unwrap();
    assert_eq!(wait_for_messages(&inbox, 1).await, vec![pose(2, 0.5, 0.5, 0.5)]);
}

#[tokio::test]
async fn test_send_before_any_connection_fails() {
    let (handle, _inbox) = start_server(MessageShape::Pose);
    let result = handle.sender().send(&heartbeat_message());
    assert!(matches!(result, Err(SendError::NotConnected)));
}

#[tokio::test]
async fn test_heartbeat_reaches_client() {
    let (handle, _inbox) = start_server(MessageShape::Pose);
    let mut state = handle.subscribe();
    let mut client = TelemetryClient::connect(handle.local_addr(), MessageShape::Pose)
        .await
        .unwrap();
    wait_for_state(&mut state, |s| matches!(s, ServerState::Connected(_))).await;

    handle.sender().send(&heartbeat_message()).unwrap();

    let received = tokio::time::timeout(TIMEOUT, client.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, Some(heartbeat_message()));
}

#[tokio::test]
async fn test_send_to_superseded_session_fails() {
    let (handle, _inbox) = start_server(MessageShape::Pose);
    let sender = handle.sender();
    let mut state = handle.subscribe();

    let first = TelemetryClient::connect(handle.local_addr(), MessageShape::Pose)
        .await
        .unwrap();
    wait_for_state(&mut state, |s| matches!(s, ServerState::Connected(_))).await;
    let old_session = sender.active_session().unwrap();

    first.close().await.unwrap();
    wait_for_state(&mut state, |s| *s == ServerState::Listening).await;
    assert!(matches!(
        sender.send_to(old_session, &heartbeat_message()),
        Err(SendError::NotConnected)
    ));

    let _second = TelemetryClient::connect(handle.local_addr(), MessageShape::Pose)
        .await
        .unwrap();
    wait_for_state(&mut state, |s| matches!(s, ServerState::Connected(id) if *id != old_session))
        .await;

    assert!(matches!(
        sender.send_to(old_session, &heartbeat_message()),
        Err(SendError::StaleSession { requested, .. }) if requested == old_session
    ));
}

#[tokio::test]
async fn test_new_connection_replaces_idle_session() {
    let (handle, inbox) = start_server(MessageShape::Pose);
    let sender = handle.sender();
    let mut state = handle.subscribe();

    // Connected but silent, like a tracker that crashed without closing.
    let mut idle = TelemetryClient::connect(handle.local_addr(), MessageShape::Pose)
        .await
        .unwrap();
    let first = match wait_for_state(&mut state, |s| matches!(s, ServerState::Connected(_))).await {
        ServerState::Connected(id) => id,
        other => panic!("unexpected state {other:?}"),
    };

    let mut newer = TelemetryClient::connect(handle.local_addr(), MessageShape::Pose)
        .await
        .unwrap();
    let second = match wait_for_state(&mut state, |s| {
        matches!(s, ServerState::Connected(id) if *id != first)
    })
    .await
    {
        ServerState::Connected(id) => id,
        other => panic!("unexpected state {other:?}"),
    };

    newer.send(&pose(3, 1.0, 1.0, 1.0)).await.unwrap();
    assert_eq!(wait_for_messages(&inbox, 1).await, vec![pose(3, 1.0, 1.0, 1.0)]);

    assert!(matches!(
        sender.send_to(first, &heartbeat_message()),
        Err(SendError::StaleSession { requested, active }) if requested == first && active == second
    ));
    sender.send_to(second, &heartbeat_message()).unwrap();

    // The replaced connection is closed by the server.
    let eof = tokio::time::timeout(TIMEOUT, idle.recv()).await.unwrap();
    assert!(matches!(eof, Ok(None) | Err(_)));
}

#[tokio::test]
async fn test_joint_shape_server() {
    let (handle, inbox) = start_server(MessageShape::Joints);
    let mut client = TelemetryClient::connect(handle.local_addr(), MessageShape::Joints)
        .await
        .unwrap();

    client
        .send_raw(b"{\"LHand_x\":1,\"LHand_y\":2,\"LHand_z\":3,\"RHand_x\":4,\"RHand_y\":5,\"RHand_z\":6,\"Head_x\":7,\"Head_y\":8,\"Head_z\":9}\n")
        .await
        .unwrap();

    let received = wait_for_messages(&inbox, 1).await;
    match &received[0] {
        Message::Joints(joints) => assert_eq!(joints.head, Vec3::new(7.0, 8.0, 9.0)),
        other => panic!("expected joints, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stop_closes_client_connection() {
    let (handle, _inbox) = start_server(MessageShape::Pose);
    let mut state = handle.subscribe();
    let mut client = TelemetryClient::connect(handle.local_addr(), MessageShape::Pose)
        .await
        .unwrap();
    wait_for_state(&mut state, |s| matches!(s, ServerState::Connected(_))).await;

    handle.stop().unwrap();
    assert_eq!(*state.borrow(), ServerState::Stopped);

    let eof = tokio::time::timeout(TIMEOUT, client.recv()).await.unwrap();
    assert!(matches!(eof, Ok(None) | Err(_)));
}
