//! Codec for the hybrid frames Ekos sends on the media channel.
//!
//! Wire format (no length prefix, no delimiter between the two regions):
//! ```text
//! [JSON metadata object][raw JPEG bytes starting with 0xFF]
//! ```
//!
//! Decoding is a two-phase byte scan: the first `}` ends the metadata, the
//! first `0xFF` after it starts the image.  Scanning for the *first* `}` is
//! only correct because the metadata object is flat.  Metadata containing a
//! nested object is reported as [`MediaFrameError::NestedMetadata`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::protocol::packet::{Packet, IMAGE_DATA};

/// First byte of every JPEG stream (the SOI marker is `FF D8`).
pub const IMAGE_START_MARKER: u8 = 0xFF;

/// Prefix of the data URI placed in the `image` payload field.
pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Payload key the encoded image is stored under.
pub const IMAGE_FIELD: &str = "image";

/// Errors that can occur while decoding a media frame.
#[derive(Debug, Error)]
pub enum MediaFrameError {
    /// The frame contains no `}` byte, so the metadata never ends.
    #[error("media frame has no end of metadata ('}}')")]
    MissingMetadataEnd,

    /// The metadata text is not valid JSON.
    #[error("media frame metadata is not valid JSON: {0}")]
    Metadata(#[source] serde_json::Error),

    /// The metadata contains a nested object, which the scan cannot delimit.
    #[error("media frame metadata contains a nested object")]
    NestedMetadata,

    /// The metadata is valid JSON but not an object.
    #[error("media frame metadata must be a JSON object")]
    MetadataNotObject,

    /// A string in the metadata contains `}`, which would end the scan early.
    #[error("media frame metadata contains '}}' inside a string")]
    BraceInMetadataString,

    /// No `0xFF` byte follows the metadata.
    #[error("media frame has no image start marker (0xFF) after byte {metadata_end}")]
    MissingImageMarker { metadata_end: usize },
}

impl MediaFrameError {
    /// `true` for errors in the frame layout, `false` for JSON errors.
    pub fn is_framing_error(&self) -> bool {
        matches!(
            self,
            MediaFrameError::MissingMetadataEnd | MediaFrameError::MissingImageMarker { .. }
        )
    }
}

/// A decoded media frame: image metadata plus the encoded image.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPacket {
    /// The metadata fields exactly as Ekos sent them.
    pub metadata: Map<String, Value>,
    /// `data:image/jpeg;base64,...`
    pub image: String,
}

impl MediaPacket {
    /// Converts into the canonical `image_data` packet.
    ///
    /// The payload is the metadata with an added `image` field.  An `image`
    /// key already present in the metadata is overwritten.
    pub fn into_packet(self) -> Packet {
        let mut payload = self.metadata;
        payload.insert(IMAGE_FIELD.to_string(), Value::String(self.image));
        Packet::new(IMAGE_DATA, Value::Object(payload))
    }
}

/// Decodes one raw media frame.
///
/// # Errors
///
/// - [`MediaFrameError::MissingMetadataEnd`] / [`MediaFrameError::MissingImageMarker`]
///   when the frame layout is wrong.
/// - [`MediaFrameError::Metadata`], [`MediaFrameError::NestedMetadata`] or
///   [`MediaFrameError::MetadataNotObject`] when the metadata is not a flat
///   JSON object.
///
/// # Examples
///
/// ```rust
/// use ekos_bridge_core::decode_media_frame;
///
/// let frame = [br#"{"resolution":"640x480"}"#.as_slice(), &[0xFF, 0xD8, 0xFF]].concat();
/// let media = decode_media_frame(&frame).unwrap();
/// assert_eq!(media.image, "data:image/jpeg;base64,/9j/");
/// ```
pub fn decode_media_frame(frame: &[u8]) -> Result<MediaPacket, MediaFrameError> {
    // Phase 1: metadata is everything up to and including the first '}'.
    let metadata_end = frame
        .iter()
        .position(|&b| b == b'}')
        .ok_or(MediaFrameError::MissingMetadataEnd)?;
    let metadata_bytes = &frame[..=metadata_end];

    let metadata = match serde_json::from_slice::<Value>(metadata_bytes) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(MediaFrameError::MetadataNotObject),
        Err(_) if opens_nested_object(metadata_bytes) => {
            return Err(MediaFrameError::NestedMetadata)
        }
        Err(e) => return Err(MediaFrameError::Metadata(e)),
    };

    // Phase 2: the image starts at the first 0xFF after the metadata.
    let image_start = frame[metadata_end + 1..]
        .iter()
        .position(|&b| b == IMAGE_START_MARKER)
        .map(|offset| metadata_end + 1 + offset)
        .ok_or(MediaFrameError::MissingImageMarker { metadata_end })?;

    Ok(MediaPacket {
        metadata,
        image: jpeg_data_uri(&frame[image_start..]),
    })
}

/// Builds a frame in the media wire layout.
///
/// # Errors
///
/// Returns [`MediaFrameError::NestedMetadata`] if any metadata value is an
/// object and [`MediaFrameError::BraceInMetadataString`] if a key or string
/// contains `}`.  Either frame would fail to decode.
pub fn encode_media_frame(
    metadata: &Map<String, Value>,
    image: &[u8],
) -> Result<Vec<u8>, MediaFrameError> {
    if metadata.values().any(contains_object) {
        return Err(MediaFrameError::NestedMetadata);
    }
    let mut frame = serde_json::to_vec(metadata).map_err(MediaFrameError::Metadata)?;
    // The closing brace of the object must be the first '}' in the frame.
    if frame.iter().position(|&b| b == b'}') != Some(frame.len() - 1) {
        return Err(MediaFrameError::BraceInMetadataString);
    }
    frame.extend_from_slice(image);
    Ok(frame)
}

/// Wraps raw JPEG bytes as a base64 data URI.
pub fn jpeg_data_uri(image: &[u8]) -> String {
    let mut uri = String::with_capacity(JPEG_DATA_URI_PREFIX.len() + image.len() * 4 / 3 + 4);
    uri.push_str(JPEG_DATA_URI_PREFIX);
    STANDARD.encode_string(image, &mut uri);
    uri
}

/// `true` if `prefix` opens a second object outside of any string.
fn opens_nested_object(prefix: &[u8]) -> bool {
    let mut in_string = false;
    let mut escaped = false;
    let mut opened = 0usize;
    for &b in prefix {
        match (in_string, b) {
            (true, _) if escaped => escaped = false,
            (true, b'\\') => escaped = true,
            (true, b'"') => in_string = false,
            (true, _) => {}
            (false, b'"') => in_string = true,
            (false, b'{') => opened += 1,
            (false, _) => {}
        }
    }
    opened > 1
}

fn contains_object(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(contains_object),
        _ => false,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
