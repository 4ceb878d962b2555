//! The `echo` command: connect as a tracker and echo back whatever arrives.
//!
//! Useful for checking a running server end to end. Pose messages come back
//! with the echo kind and the id bumped by one; joint snapshots come back as-is.

use std::net::SocketAddr;

use posewire_config::MessageShape;
use posewire_net::{EventKind, Message, TelemetryClient};
use tracing::info;

use crate::error::AppError;

/// The reply sent back for `message`.
pub fn echo_reply(message: &Message) -> Message {
    match message {
        Message::Pose(pose) => Message::pose(EventKind::Echo, pose.id.wrapping_add(1), pose.position),
        Message::Joints(joints) => Message::Joints(*joints),
    }
}

/// Connect to `addr` and echo until the server closes the connection.
/// Returns the number of messages echoed.
pub fn run(addr: &str, shape: MessageShape) -> Result<u64, AppError> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|_| AppError::InvalidAddress(addr.to_owned()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;
    runtime.block_on(echo_until_closed(addr, shape))
}

pub async fn echo_until_closed(addr: SocketAddr, shape: MessageShape) -> Result<u64, AppError> {
    let mut client = TelemetryClient::connect(addr, shape).await?;
    info!("Echo client connected to {addr}");

    let mut echoed = 0;
    while let Some(message) = client.recv().await? {
        info!("Echo client received {message:?}");
        client.send(&echo_reply(&message)).await?;
        echoed += 1;
    }

    info!("Server closed the connection after {echoed} messages");
    Ok(echoed)
}
