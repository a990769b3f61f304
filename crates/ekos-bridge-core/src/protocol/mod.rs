//! Protocol module containing the channel model, packets, topics and the
//! media frame codec.

pub mod channel;
pub mod media;
pub mod packet;
pub mod topic;

pub use channel::Channel;
pub use media::{decode_media_frame, encode_media_frame, MediaFrameError, MediaPacket};
pub use packet::{Packet, PacketError};
pub use topic::{CommandTopic, Topic, TopicError, COMMAND_SUBSCRIPTION, TOPIC_NAMESPACE};
