//! The canonical `{ "type": ..., "payload": ... }` message unit.
//!
//! Every channel speaks packets.  Ekos sends them as JSON text, the bridge
//! republishes them on the broker, and commands coming back from the broker
//! are packets too.
//!
//! ```json
//! {"type":"new_mount_state","payload":{"ra":10.5,"de":45.1}}
//! ```
//!
//! The bridge never interprets `payload`.  Unknown top-level fields are kept
//! in [`Packet::extra`] so that forwarding is verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Packet type emitted when the message channel closes.
pub const CONNECTION_STATE_CHANGED: &str = "connection-state-changed";

/// Packet type produced by the media frame codec.
pub const IMAGE_DATA: &str = "image_data";

/// Errors raised while parsing a textual packet.
#[derive(Debug, Error)]
pub enum PacketError {
    /// The text was not JSON, or it had no string `type` field.
    #[error("malformed packet: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One message exchanged over a channel and mirrored onto the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Semantic type of the packet (e.g. `"new_connection_state"`).
    ///
    /// Becomes the last segment of the topic the packet is published on.
    #[serde(rename = "type")]
    pub kind: String,

    /// Type-specific body.  Absent payloads deserialize as `null`.
    #[serde(default)]
    pub payload: Value,

    /// Any other top-level fields Ekos attached to the packet.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Packet {
    /// Creates a packet with no extra fields.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            extra: Map::new(),
        }
    }

    /// The packet published on behalf of a message channel that went away.
    pub fn connection_lost() -> Self {
        Self::new(
            CONNECTION_STATE_CHANGED,
            json!({ "connected": false, "online": false }),
        )
    }

    /// Parses one packet from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::Malformed`] if the bytes are not a JSON object
    /// with a string `type` field.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PacketError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serializes the packet to compact JSON text.
    pub fn to_json(&self) -> String {
        // A struct of String + Value + Map<String, Value> always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
