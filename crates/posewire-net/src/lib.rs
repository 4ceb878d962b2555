//! TCP ingest for pose telemetry: newline framing, JSON messages, the
//! network-to-consumer inbox, the single-session server, and the outbound
//! sender.

pub mod framing;
pub mod heartbeat;
pub mod inbox;
pub mod messages;
pub mod platform;
pub mod session;
pub mod tcp_client;
pub mod tcp_server;

pub use framing::{FrameConfig, FrameError, LineFramer, write_frame};
pub use heartbeat::{Heartbeat, heartbeat_message};
pub use inbox::Inbox;
pub use messages::{
    DecodeError, EncodeError, EventKind, JointMessage, MarkerId, Message, PoseMessage, decode,
    encode,
};
pub use platform::SocketConfig;
pub use posewire_config::MessageShape;
pub use session::{IdGenerator, OutboundSender, SendError, SessionId};
pub use tcp_client::{ClientError, TelemetryClient};
pub use tcp_server::{ServerConfig, ServerError, ServerHandle, ServerState, TelemetryServer};
