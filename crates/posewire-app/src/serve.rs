//! The `serve` command: run the server and tick a consumer until interrupted.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use posewire_config::{Config, MessageShape};
use posewire_net::{
    EventKind, Heartbeat, Inbox, Message, OutboundSender, SendError, ServerConfig, ServerHandle,
    TelemetryServer, heartbeat_message,
};
use posewire_sync::{Consumer, JointMirror, PoseReconciler, ReconcilerConfig, TickReport};
use tracing::{debug, info};

use crate::error::AppError;
use crate::sinks::{LoggingMarkerSink, LoggingRig};
use crate::tick::TickDriver;

/// A running server plus the consumer-side chores done every tick.
pub struct ServeLoop {
    handle: ServerHandle,
    inbox: Inbox<Message>,
    sender: OutboundSender,
    heartbeat: Option<Heartbeat>,
    announce_created: bool,
}

impl ServeLoop {
    /// Bind and start the network thread. Bind failures surface here.
    pub fn start(config: &Config) -> Result<Self, AppError> {
        let server_config = ServerConfig::from_section(&config.server)?;
        let inbox = Inbox::new();
        let handle = TelemetryServer::new(server_config, inbox.clone()).start()?;

        Ok(Self {
            sender: handle.sender(),
            heartbeat: config
                .heartbeat
                .enabled
                .then(|| Heartbeat::new(config.heartbeat.interval_secs)),
            announce_created: config.sync.announce_created,
            handle,
            inbox,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.handle.local_addr()
    }

    pub fn handle(&self) -> &ServerHandle {
        &self.handle
    }

    /// One consumer tick at consumer clock `elapsed` seconds.
    pub fn step<C: Consumer>(&mut self, consumer: &mut C, elapsed: f64) -> TickReport {
        let report = consumer.tick(&self.inbox);
        if !report.is_empty() {
            debug!(
                "Tick: {} created, {} updated, {} suppressed, {} hidden, {} joints, {} ignored",
                report.created.len(),
                report.updated,
                report.suppressed,
                report.hidden.len(),
                report.joints_applied,
                report.ignored
            );
        }

        if self.announce_created {
            for &(id, position) in &report.created {
                self.send(&Message::pose(EventKind::AnchorCreated, id, position));
            }
        }

        let heartbeat_due = self
            .heartbeat
            .as_mut()
            .is_some_and(|heartbeat| heartbeat.poll(elapsed));
        if heartbeat_due {
            self.send(&heartbeat_message());
        }

        report
    }

    fn send(&self, message: &Message) {
        match self.sender.send(message) {
            Ok(_) => {}
            Err(SendError::NotConnected) => {}
            Err(e) => debug!("Outbound message dropped: {e}"),
        }
    }

    /// Stop the network thread and wait for it.
    pub fn shutdown(self) -> Result<(), AppError> {
        self.handle.stop()?;
        Ok(())
    }
}

/// Run until `running` is cleared.
pub fn run(config: &Config, running: &AtomicBool) -> Result<(), AppError> {
    let mut serve = ServeLoop::start(config)?;
    info!(
        "Listening on {} for {:?} messages",
        serve.local_addr(),
        config.server.shape
    );

    match config.server.shape {
        MessageShape::Pose => {
            let mut reconciler = PoseReconciler::new(
                ReconcilerConfig::from_section(&config.sync),
                LoggingMarkerSink::default(),
            );
            drive(&mut serve, &mut reconciler, config.sync.tick_hz, running);
            info!("Tracked {} markers", reconciler.len());
        }
        MessageShape::Joints => {
            let mut mirror = JointMirror::new(LoggingRig::default());
            drive(&mut serve, &mut mirror, config.sync.tick_hz, running);
        }
    }

    info!("Shutting down");
    serve.shutdown()
}

fn drive<C: Consumer>(serve: &mut ServeLoop, consumer: &mut C, tick_hz: u32, running: &AtomicBool) {
    let mut driver = TickDriver::new(tick_hz);
    while running.load(Ordering::SeqCst) {
        driver.tick(|_, elapsed| serve.step(consumer, elapsed));
        driver.sleep_remaining();
    }
}
