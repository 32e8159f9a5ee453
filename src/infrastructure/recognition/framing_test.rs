use super::WireFrame;
use super::AUDIO_ONLY_REQUEST;
use super::FLAG_POS_SEQUENCE;
use super::FULL_SERVER_RESPONSE;
use super::SERVER_ACK;

#[test]
fn it_treats_server_acks_as_payload_free() {
    // Version 1, one header word; ack message type, no flags.
    let bytes = vec![0b0001_0001, 0b1011_0000, 0b0001_0001, 0x00];

    let frame = WireFrame::parse(&bytes).unwrap();
    assert!(frame.is_ack());
    assert_eq!(frame.message_type, SERVER_ACK);
    assert!(frame.payload.is_empty());
}

#[test]
fn it_round_trips_gzipped_client_frames() {
    let payload = "{\"audio_data\":\"QUJD\",\"sequence\":7}";
    let frame = WireFrame::client_request(AUDIO_ONLY_REQUEST, 7, payload.as_bytes()).unwrap();

    let parsed = WireFrame::parse(&frame.encode()).unwrap();
    assert_eq!(parsed.message_type, AUDIO_ONLY_REQUEST);
    assert_eq!(parsed.flags, FLAG_POS_SEQUENCE);
    assert_eq!(parsed.sequence, 7);

    // The payload went over the wire gzipped; the reader decompresses it.
    assert_ne!(parsed.payload, payload.as_bytes());
    let value = parsed.payload_json().unwrap();
    assert_eq!(value["audio_data"], "QUJD");
    assert_eq!(value["sequence"], 7);
}

#[test]
fn it_parses_plain_json_payloads_without_decompression() {
    let payload = "{\"result\":[{\"text\":\"hi\",\"definite\":true}]}";
    let frame = WireFrame {
        message_type: FULL_SERVER_RESPONSE,
        flags: 0,
        sequence: 1,
        payload: payload.as_bytes().to_vec(),
    };

    let parsed = WireFrame::parse(&frame.encode()).unwrap();
    let value = parsed.payload_json().unwrap();
    assert_eq!(value["result"][0]["text"], "hi");
    assert_eq!(value["result"][0]["definite"], true);
}

#[test]
fn it_encodes_the_fixed_header_layout() {
    let frame = WireFrame {
        message_type: FULL_SERVER_RESPONSE,
        flags: FLAG_POS_SEQUENCE,
        sequence: 2,
        payload: vec![0xAB],
    };

    let bytes = frame.encode();
    // Version 1 in the high nibble, one header word in the low nibble.
    assert_eq!(bytes[0], 0b0001_0001);
    assert_eq!(bytes[1], 0b1001_0001);
    // JSON serialization, gzip compression, reserved byte.
    assert_eq!(bytes[2], 0b0001_0001);
    assert_eq!(bytes[3], 0x00);
    assert_eq!(bytes[4..8].to_vec(), 2i32.to_be_bytes().to_vec());
    assert_eq!(bytes[8..12].to_vec(), 1u32.to_be_bytes().to_vec());
    assert_eq!(bytes[12], 0xAB);
}

#[test]
fn it_rejects_short_frames() {
    assert!(WireFrame::parse(&[0x11, 0x90]).is_err());
}

#[test]
fn it_rejects_truncated_payloads() {
    let frame = WireFrame {
        message_type: FULL_SERVER_RESPONSE,
        flags: 0,
        sequence: 1,
        payload: vec![1, 2, 3, 4],
    };

    let mut bytes = frame.encode();
    bytes.truncate(bytes.len() - 2);

    assert!(WireFrame::parse(&bytes).is_err());
}

#[test]
fn it_rejects_garbage_payloads() {
    let frame = WireFrame {
        message_type: FULL_SERVER_RESPONSE,
        flags: 0,
        sequence: 1,
        payload: vec![0xFF, 0xFE, 0xFD],
    };

    assert!(frame.payload_json().is_err());
}
