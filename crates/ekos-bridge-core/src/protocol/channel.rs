//! The three logical channels Ekos opens to the bridge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the three WebSocket channels multiplexed by the bridge.
///
/// A channel identifies both the connection-handling context (which upgrade
/// path the connection arrived on) and the second segment of every topic
/// published for that connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Structured control messages; the primary Ekos connection.
    Message,
    /// Image frames (JSON metadata followed by a JPEG stream).
    Media,
    /// Bulk data (compressed FITS files) in online mode; silent offline.
    Cloud,
}

/// Returned when a string does not name one of the three channels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown channel: {0:?}")]
pub struct UnknownChannel(pub String);

impl Channel {
    /// All channels, in a fixed order.
    pub const ALL: [Channel; 3] = [Channel::Message, Channel::Media, Channel::Cloud];

    /// The topic segment and log name for this channel.
    pub const fn as_str(self) -> &'static str {
        match self {
            Channel::Message => "message",
            Channel::Media => "media",
            Channel::Cloud => "cloud",
        }
    }

    /// The HTTP path Ekos requests when upgrading to this channel.
    pub const fn upgrade_path(self) -> &'static str {
        match self {
            Channel::Message => "/message/ekos",
            Channel::Media => "/media/ekos",
            Channel::Cloud => "/cloud/ekos",
        }
    }

    /// Resolves an upgrade path to its channel.
    ///
    /// Matching is exact and case-sensitive: `/Message/ekos` or
    /// `/message/ekos/` do not resolve.
    pub fn from_upgrade_path(path: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|channel| channel.upgrade_path() == path)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(Channel::Message),
            "media" => Ok(Channel::Media),
            "cloud" => Ok(Channel::Cloud),
            other => Err(UnknownChannel(other.to_string())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
