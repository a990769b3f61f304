//! Integration tests for the media frame codec and the packet/topic types.
//!
//! These tests drive the public API the way the bridge does: a raw frame from
//! the media channel is decoded, turned into an `image_data` packet, and the
//! packet is addressed to its outbound topic.

use ekos_bridge_core::{
    decode_media_frame, encode_media_frame, protocol::media::jpeg_data_uri, Channel,
    MediaFrameError, Packet, Topic,
};
use serde_json::{json, Map, Value};

/// A small but structurally real JPEG header (SOI + APP0 marker start).
const JPEG_HEAD: [u8; 6] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

fn metadata(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be an object, got {other}"),
    }
}

#[test]
fn test_flat_metadata_and_jpeg_decode_to_image_packet() {
    // Arrange: metadata the way Ekos sends it for a preview image.
    let meta = metadata(json!({
        "uuid": "7f1c",
        "resolution": "1280x1024",
        "bin": "1x1",
        "exposure": 1.5,
        "ext": "fits"
    }));
    let frame = encode_media_frame(&meta, &JPEG_HEAD).expect("flat metadata encodes");

    // Act
    let packet = decode_media_frame(&frame).expect("frame decodes").into_packet();

    // Assert
    let mut expected = meta.clone();
    expected.insert("image".to_string(), json!(jpeg_data_uri(&JPEG_HEAD)));
    assert_eq!(packet.kind, "image_data");
    assert_eq!(packet.payload, Value::Object(expected));
}

#[test]
fn test_decoded_image_packet_is_addressed_to_media_topic() {
    let frame = [br#"{"uuid":"x"}"#.as_slice(), &JPEG_HEAD].concat();

    let packet = decode_media_frame(&frame).unwrap().into_packet();
    let topic = Topic::new(Channel::Media, &packet.kind).unwrap();

    assert_eq!(topic.to_string(), "bridge/media/image_data");
}

#[test]
fn test_image_bytes_containing_braces_do_not_confuse_the_scan() {
    // The JPEG body may contain '}' (0x7D); only the first one matters.
    let image = [0xFF, 0xD8, b'}', b'{', 0x7D, 0xFF];
    let frame = [br#"{"a":"b"}"#.as_slice(), &image].concat();

    let media = decode_media_frame(&frame).unwrap();

    assert_eq!(media.image, jpeg_data_uri(&image));
}

#[test]
fn test_empty_frame_is_rejected_as_framing_error() {
    let err = decode_media_frame(&[]).unwrap_err();
    assert!(err.is_framing_error());
}

#[test]
fn test_metadata_only_frame_is_rejected_as_framing_error() {
    let err = decode_media_frame(br#"{"a":1}"#).unwrap_err();
    assert!(matches!(err, MediaFrameError::MissingImageMarker { .. }));
}

#[test]
fn test_top_level_array_metadata_is_not_an_object() {
    // `[1]}` parses only up to the first brace, which is not valid JSON;
    // a scalar before the brace likewise cannot be metadata.
    let err = decode_media_frame(&[b"[1]}".as_slice(), &[0xFF]].concat()).unwrap_err();
    assert!(matches!(err, MediaFrameError::Metadata(_)));
}

#[test]
fn test_image_packet_serializes_with_type_and_payload() {
    let frame = [br#"{"w":1}"#.as_slice(), &[0xFF]].concat();
    let packet = decode_media_frame(&frame).unwrap().into_packet();

    let reparsed = Packet::from_slice(packet.to_json().as_bytes()).unwrap();

    assert_eq!(reparsed, packet);
}
