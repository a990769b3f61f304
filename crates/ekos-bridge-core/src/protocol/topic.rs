//! MQTT topic namespace used by the bridge.
//!
//! ```text
//! outbound (Ekos → broker):   bridge/<channel>/<packet type>
//! inbound  (broker → Ekos):   bridge/commands/<channel>/<command>
//! ```
//!
//! Outbound topics always have exactly three segments.  A packet type that
//! would add segments (`/`) or turn the topic into a filter (`+`, `#`) is
//! rejected rather than published under a topic nobody subscribed to.

use std::fmt;

use thiserror::Error;

use crate::protocol::channel::Channel;

/// First segment of every topic owned by the bridge.
pub const TOPIC_NAMESPACE: &str = "bridge";

/// Second segment of inbound command topics.
pub const COMMANDS_SEGMENT: &str = "commands";

/// The single subscription the bridge holds on the broker.
pub const COMMAND_SUBSCRIPTION: &str = "bridge/commands/+/+";

/// Errors raised while building or parsing a topic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    /// The packet type is empty or contains `/`, `+` or `#`.
    #[error("packet type {0:?} cannot be used as a topic segment")]
    InvalidType(String),

    /// The topic does not start with the bridge namespace.
    #[error("topic {0:?} is outside the bridge namespace")]
    ForeignNamespace(String),

    /// The topic has the wrong number of segments or an empty segment.
    #[error("malformed topic {0:?}")]
    Malformed(String),

    /// The channel segment does not name a known channel.
    #[error("topic {topic:?} names unknown channel {segment:?}")]
    UnknownChannel { topic: String, segment: String },
}

/// An outbound topic: `bridge/<channel>/<type>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    channel: Channel,
    kind: String,
}

impl Topic {
    /// Builds the topic a packet of type `kind` on `channel` is published on.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::InvalidType`] if `kind` is not a valid single
    /// topic segment.
    pub fn new(channel: Channel, kind: &str) -> Result<Self, TopicError> {
        if !is_valid_segment(kind) {
            return Err(TopicError::InvalidType(kind.to_string()));
        }
        Ok(Self {
            channel,
            kind: kind.to_string(),
        })
    }

    /// Parses a three-segment `bridge/<channel>/<type>` topic.
    ///
    /// # Errors
    ///
    /// See [`TopicError`]; every variant except `InvalidType` can occur.
    pub fn parse(topic: &str) -> Result<Self, TopicError> {
        let segments: Vec<&str> = topic.split('/').collect();
        if segments.first() != Some(&TOPIC_NAMESPACE) {
            return Err(TopicError::ForeignNamespace(topic.to_string()));
        }
        let [_, channel, kind] = segments.as_slice() else {
            return Err(TopicError::Malformed(topic.to_string()));
        };
        if !is_valid_segment(kind) {
            return Err(TopicError::Malformed(topic.to_string()));
        }
        Ok(Self {
            channel: parse_channel(topic, channel)?,
            kind: (*kind).to_string(),
        })
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TOPIC_NAMESPACE}/{}/{}", self.channel, self.kind)
    }
}

/// An inbound command topic: `bridge/commands/<channel>/<command>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTopic {
    pub channel: Channel,
    pub command: String,
}

impl CommandTopic {
    /// Parses a topic matched by [`COMMAND_SUBSCRIPTION`].
    ///
    /// The channel is the segment at index 2.
    ///
    /// # Errors
    ///
    /// See [`TopicError`].
    pub fn parse(topic: &str) -> Result<Self, TopicError> {
        let segments: Vec<&str> = topic.split('/').collect();
        if segments.first() != Some(&TOPIC_NAMESPACE) {
            return Err(TopicError::ForeignNamespace(topic.to_string()));
        }
        let [_, COMMANDS_SEGMENT, channel, command] = segments.as_slice() else {
            return Err(TopicError::Malformed(topic.to_string()));
        };
        if command.is_empty() {
            return Err(TopicError::Malformed(topic.to_string()));
        }
        Ok(Self {
            channel: parse_channel(topic, channel)?,
            command: (*command).to_string(),
        })
    }
}

/// Resolves the channel a broker message should be broadcast to.
///
/// Accepts both command topics (`bridge/commands/<channel>/<command>`) and
/// plain channel topics (`bridge/<channel>/<type>`).
///
/// # Errors
///
/// Returns the error of the shape the topic most closely resembles.
pub fn target_channel(topic: &str) -> Result<Channel, TopicError> {
    if topic.split('/').nth(1) == Some(COMMANDS_SEGMENT) {
        CommandTopic::parse(topic).map(|t| t.channel)
    } else {
        Topic::parse(topic).map(|t| t.channel)
    }
}

fn parse_channel(topic: &str, segment: &str) -> Result<Channel, TopicError> {
    segment.parse().map_err(|_| TopicError::UnknownChannel {
        topic: topic.to_string(),
        segment: segment.to_string(),
    })
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains(['/', '+', '#'])
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_display_is_three_segments() {
        let topic = Topic::new(Channel::Message, "new_mount_state").unwrap();
        assert_eq!(topic.to_string(), "bridge/message/new_mount_state");
    }

    #[test]
    fn test_topic_rejects_empty_type() {
        assert_eq!(
            Topic::new(Channel::Media, ""),
            Err(TopicError::InvalidType(String::new()))
        );
    }

    #[test]
    fn test_topic_rejects_types_that_add_segments_or_wildcards() {
        for kind in ["a/b", "+", "#", "state#1"] {
            assert!(Topic::new(Channel::Cloud, kind).is_err(), "{kind} must be rejected");
        }
    }

    #[test]
    fn test_topic_parse_inverts_display() {
        // Arrange
        let original = Topic::new(Channel::Cloud, "upload").unwrap();

        // Act
        let parsed = Topic::parse(&original.to_string()).unwrap();

        // Assert
        assert_eq!(parsed, original);
        assert_eq!(parsed.channel(), Channel::Cloud);
        assert_eq!(parsed.kind(), "upload");
    }

    #[test]
    fn test_topic_parse_rejects_wrong_segment_count() {
        assert!(matches!(
            Topic::parse("bridge/message"),
            Err(TopicError::Malformed(_))
        ));
        assert!(matches!(
            Topic::parse("bridge/message/a/b"),
            Err(TopicError::Malformed(_))
        ));
    }

    #[test]
    fn test_topic_parse_rejects_reordered_segments() {
        assert!(matches!(
            Topic::parse("message/bridge/foo"),
            Err(TopicError::ForeignNamespace(_))
        ));
    }

    #[test]
    fn test_command_topic_parse_reads_channel_at_index_two() {
        let topic = CommandTopic::parse("bridge/commands/media/capture").unwrap();
        assert_eq!(topic.channel, Channel::Media);
        assert_eq!(topic.command, "capture");
    }

    #[test]
    fn test_command_topic_unknown_channel() {
        let result = CommandTopic::parse("bridge/commands/telemetry/x");
        assert_eq!(
            result,
            Err(TopicError::UnknownChannel {
                topic: "bridge/commands/telemetry/x".to_string(),
                segment: "telemetry".to_string(),
            })
        );
    }

    #[test]
    fn test_command_topic_requires_commands_segment() {
        assert!(matches!(
            CommandTopic::parse("bridge/other/message/x"),
            Err(TopicError::Malformed(_))
        ));
    }

    #[test]
    fn test_target_channel_for_command_topic() {
        assert_eq!(target_channel("bridge/commands/cloud/sync"), Ok(Channel::Cloud));
    }

    #[test]
    fn test_target_channel_for_plain_topic() {
        assert_eq!(target_channel("bridge/message/foo"), Ok(Channel::Message));
    }

    #[test]
    fn test_target_channel_foreign_namespace() {
        assert!(matches!(
            target_channel("homeassistant/light/state"),
            Err(TopicError::ForeignNamespace(_))
        ));
    }

    #[test]
    fn test_subscription_matches_command_shape() {
        let segments: Vec<&str> = COMMAND_SUBSCRIPTION.split('/').collect();
        assert_eq!(segments, [TOPIC_NAMESPACE, COMMANDS_SEGMENT, "+", "+"]);
    }
}
