//! Wire message types and JSON serialization.
//!
//! A deployment receives exactly one [`MessageShape`]: either marker pose
//! updates or joint snapshots. The payloads are JSON objects, one per frame
//! (see [`crate::framing`]). Use [`decode`] and [`encode`] to move between
//! frame bytes and [`Message`].

use glam::Vec3;
use posewire_config::MessageShape;
use serde::{Deserialize, Serialize};

/// Identifier of a tracked marker as sent by the remote tracker.
pub type MarkerId = i64;

/// Wire value of [`EventKind::PoseUpdate`].
pub const POSE_UPDATE_KIND: &str = "aruco_pose";
/// Wire value of [`EventKind::AnchorCreated`].
pub const ANCHOR_CREATED_KIND: &str = "anchor_created";
/// Wire value of [`EventKind::Heartbeat`].
pub const HEARTBEAT_KIND: &str = "From Server";
/// Wire value of [`EventKind::Echo`].
pub const ECHO_KIND: &str = "From Client";

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// Event kind carried in the `resp` field of a pose message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A marker was observed at a position.
    PoseUpdate,
    /// The server created a marker for an id (outbound acknowledgement).
    AnchorCreated,
    /// Periodic liveness ping from the server.
    Heartbeat,
    /// A client bouncing a server message back.
    Echo,
    /// Any other value, kept verbatim.
    Other(String),
}

impl EventKind {
    /// Parse the wire string. Unknown values become [`EventKind::Other`].
    pub fn from_wire(value: &str) -> Self {
        match value {
            POSE_UPDATE_KIND | "pose_update" | "pose-update" => Self::PoseUpdate,
            ANCHOR_CREATED_KIND => Self::AnchorCreated,
            HEARTBEAT_KIND => Self::Heartbeat,
            ECHO_KIND => Self::Echo,
            other => Self::Other(other.to_string()),
        }
    }

    /// The string written to the `resp` field.
    pub fn as_wire(&self) -> &str {
        match self {
            Self::PoseUpdate => POSE_UPDATE_KIND,
            Self::AnchorCreated => ANCHOR_CREATED_KIND,
            Self::Heartbeat => HEARTBEAT_KIND,
            Self::Echo => ECHO_KIND,
            Self::Other(value) => value,
        }
    }
}

/// A single marker observation or event.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseMessage {
    /// What happened.
    pub kind: EventKind,
    /// Marker the event refers to.
    pub id: MarkerId,
    /// Position in the sender's coordinate frame.
    pub position: Vec3,
}

/// Snapshot of three tracked body points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointMessage {
    pub left_hand: Vec3,
    pub right_hand: Vec3,
    pub head: Vec3,
}

/// Top-level decoded message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Pose(PoseMessage),
    Joints(JointMessage),
}

impl Message {
    /// Convenience constructor for a pose message.
    pub fn pose(kind: EventKind, id: MarkerId, position: Vec3) -> Self {
        Self::Pose(PoseMessage { kind, id, position })
    }

    /// Shape this message is encoded with.
    pub fn shape(&self) -> MessageShape {
        match self {
            Self::Pose(_) => MessageShape::Pose,
            Self::Joints(_) => MessageShape::Joints,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire layouts
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct PoseWire {
    resp: String,
    id: MarkerId,
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Serialize, Deserialize)]
struct JointWire {
    #[serde(rename = "LHand_x")]
    left_hand_x: f32,
    #[serde(rename = "LHand_y")]
    left_hand_y: f32,
    #[serde(rename = "LHand_z")]
    left_hand_z: f32,
    #[serde(rename = "RHand_x")]
    right_hand_x: f32,
    #[serde(rename = "RHand_y")]
    right_hand_y: f32,
    #[serde(rename = "RHand_z")]
    right_hand_z: f32,
    #[serde(rename = "Head_x")]
    head_x: f32,
    #[serde(rename = "Head_y")]
    head_y: f32,
    #[serde(rename = "Head_z")]
    head_z: f32,
}

impl From<PoseWire> for PoseMessage {
    fn from(wire: PoseWire) -> Self {
        Self {
            kind: EventKind::from_wire(&wire.resp),
            id: wire.id,
            position: Vec3::new(wire.x, wire.y, wire.z),
        }
    }
}

impl From<&PoseMessage> for PoseWire {
    fn from(msg: &PoseMessage) -> Self {
        Self {
            resp: msg.kind.as_wire().to_string(),
            id: msg.id,
            x: msg.position.x,
            y: msg.position.y,
            z: msg.position.z,
        }
    }
}

impl From<JointWire> for JointMessage {
    fn from(wire: JointWire) -> Self {
        Self {
            left_hand: Vec3::new(wire.left_hand_x, wire.left_hand_y, wire.left_hand_z),
            right_hand: Vec3::new(wire.right_hand_x, wire.right_hand_y, wire.right_hand_z),
            head: Vec3::new(wire.head_x, wire.head_y, wire.head_z),
        }
    }
}

impl From<&JointMessage> for JointWire {
    fn from(msg: &JointMessage) -> Self {
        Self {
            left_hand_x: msg.left_hand.x,
            left_hand_y: msg.left_hand.y,
            left_hand_z: msg.left_hand.z,
            right_hand_x: msg.right_hand.x,
            right_hand_y: msg.right_hand.y,
            right_hand_z: msg.right_hand.z,
            head_x: msg.head.x,
            head_y: msg.head.y,
            head_z: msg.head.z,
        }
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// A frame that could not be turned into a [`Message`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame bytes are not UTF-8.
    #[error("frame is not valid UTF-8: {raw:?}")]
    InvalidUtf8 {
        /// Lossy rendering of the offending bytes.
        raw: String,
    },

    /// The frame is not a JSON object of the expected shape.
    #[error("malformed {shape:?} message {raw:?}: {source}")]
    Malformed {
        /// Shape the decoder expected.
        shape: MessageShape,
        /// The offending frame text.
        raw: String,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
}

/// A message that could not be serialized.
#[derive(Debug, thiserror::Error)]
#[error("failed to encode message: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Decode one frame (without its delimiter) as the given shape.
///
/// Returns `Ok(None)` for frames that contain only whitespace, such as a
/// blank line used as keepalive.
pub fn decode(shape: MessageShape, frame: &[u8]) -> Result<Option<Message>, DecodeError> {
    let text = std::str::from_utf8(frame).map_err(|_| DecodeError::InvalidUtf8 {
        raw: String::from_utf8_lossy(frame).into_owned(),
    })?;

    if text.trim().is_empty() {
        return Ok(None);
    }

    let malformed = |source| DecodeError::Malformed {
        shape,
        raw: text.to_string(),
        source,
    };

    let message = match shape {
        MessageShape::Pose => {
            let wire: PoseWire = serde_json::from_str(text).map_err(malformed)?;
            Message::Pose(wire.into())
        }
        MessageShape::Joints => {
            let wire: JointWire = serde_json::from_str(text).map_err(malformed)?;
            Message::Joints(wire.into())
        }
    };

    Ok(Some(message))
}

/// Serialize a message to compact JSON, without the frame delimiter.
pub fn encode(message: &Message) -> Result<Vec<u8>, EncodeError> {
    let bytes = match message {
        Message::Pose(pose) => serde_json::to_vec(&PoseWire::from(pose))?,
        Message::Joints(joints) => serde_json::to_vec(&JointWire::from(joints))?,
    };
    Ok(bytes)
}
