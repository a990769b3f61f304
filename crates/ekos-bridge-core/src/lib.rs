//! # ekos-bridge-core
//!
//! Shared library for the Ekos bridge containing the channel model, the
//! canonical packet type, the MQTT topic namespace and the media frame codec.
//!
//! This crate has zero dependencies on sockets, async runtimes or the MQTT
//! client.  Everything here is a pure function over bytes and JSON values, so
//! the bridge binary can be tested without a broker or a live Ekos instance.
//!
//! # Architecture overview
//!
//! Ekos (the observatory control application) opens three WebSocket channels
//! to the bridge: `message`, `media` and `cloud`.  The bridge republishes
//! everything Ekos sends onto an MQTT broker and fans broker commands back out
//! to the matching channel.
//!
//! - **`protocol::channel`** – The closed set of channels and their upgrade
//!   paths.
//! - **`protocol::packet`** – The `{ "type": ..., "payload": ... }` unit that
//!   travels in both directions.
//! - **`protocol::topic`** – How `(channel, packet type)` maps onto
//!   `bridge/<channel>/<type>` and how command topics are parsed back.
//! - **`protocol::media`** – The hybrid JSON + JPEG frame used only by the
//!   media channel.

pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `ekos_bridge_core::Packet` instead of `ekos_bridge_core::protocol::packet::Packet`.
pub use protocol::channel::{Channel, UnknownChannel};
pub use protocol::media::{decode_media_frame, encode_media_frame, MediaFrameError, MediaPacket};
pub use protocol::packet::{Packet, PacketError};
pub use protocol::topic::{CommandTopic, Topic, TopicError, COMMAND_SUBSCRIPTION};
