#[cfg(test)]
#[path = "framing_test.rs"]
mod tests;

use std::io::Read;
use std::io::Write;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::domain::models::CompanionError;

pub const PROTOCOL_VERSION: u8 = 0b0001;
pub const HEADER_SIZE_WORDS: u8 = 0b0001;

pub const FULL_CLIENT_REQUEST: u8 = 0b0001;
pub const AUDIO_ONLY_REQUEST: u8 = 0b0010;
pub const FULL_SERVER_RESPONSE: u8 = 0b1001;
pub const SERVER_ACK: u8 = 0b1011;

pub const JSON_SERIALIZATION: u8 = 0b0001;
pub const GZIP_COMPRESSION: u8 = 0b0001;
pub const FLAG_POS_SEQUENCE: u8 = 0b0001;

/// Binary frame of the recognition relay's alternate transport. Layout:
/// a 4-byte header (version + header size in 4-byte words, message type +
/// flags, serialization + compression methods, one reserved byte), a 4-byte
/// big-endian sequence number, a 4-byte big-endian payload length, then the
/// payload itself, which is JSON and may be gzip-compressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireFrame {
    pub message_type: u8,
    pub flags: u8,
    pub sequence: i32,
    pub payload: Vec<u8>,
}

impl WireFrame {
    /// Builds a client frame carrying gzip-compressed JSON.
    pub fn client_request(
        message_type: u8,
        sequence: i32,
        payload_json: &[u8],
    ) -> Result<WireFrame, CompanionError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(payload_json)
            .map_err(|err| return CompanionError::Protocol(format!("gzip write: {err}")))?;
        let payload = encoder
            .finish()
            .map_err(|err| return CompanionError::Protocol(format!("gzip finish: {err}")))?;

        return Ok(WireFrame {
            message_type,
            flags: FLAG_POS_SEQUENCE,
            sequence,
            payload,
        });
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + self.payload.len());
        out.push((PROTOCOL_VERSION << 4) | HEADER_SIZE_WORDS);
        out.push((self.message_type << 4) | self.flags);
        out.push((JSON_SERIALIZATION << 4) | GZIP_COMPRESSION);
        out.push(0);
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.payload);

        return out;
    }

    pub fn parse(bytes: &[u8]) -> Result<WireFrame, CompanionError> {
        if bytes.len() < 4 {
            return Err(CompanionError::Protocol(
                "frame shorter than header".to_string(),
            ));
        }

        let header_len = ((bytes[0] & 0x0F) as usize) * 4;
        let message_type = bytes[1] >> 4;
        let flags = bytes[1] & 0x0F;

        // Acknowledgments carry no payload.
        if message_type == SERVER_ACK {
            return Ok(WireFrame {
                message_type,
                flags,
                sequence: 0,
                payload: vec![],
            });
        }

        if bytes.len() < header_len + 8 {
            return Err(CompanionError::Protocol("truncated frame".to_string()));
        }

        let sequence = i32::from_be_bytes(
            bytes[header_len..header_len + 4]
                .try_into()
                .map_err(|_| return CompanionError::Protocol("bad sequence field".to_string()))?,
        );
        let payload_len = u32::from_be_bytes(
            bytes[header_len + 4..header_len + 8]
                .try_into()
                .map_err(|_| return CompanionError::Protocol("bad length field".to_string()))?,
        ) as usize;

        let start = header_len + 8;
        if bytes.len() < start + payload_len {
            return Err(CompanionError::Protocol(
                "payload length overruns frame".to_string(),
            ));
        }

        return Ok(WireFrame {
            message_type,
            flags,
            sequence,
            payload: bytes[start..start + payload_len].to_vec(),
        });
    }

    pub fn is_ack(&self) -> bool {
        return self.message_type == SERVER_ACK;
    }

    /// Attempts a direct JSON parse of the payload first; only when that
    /// fails, gzip-decompresses and parses again.
    pub fn payload_json(&self) -> Result<serde_json::Value, CompanionError> {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&self.payload) {
            return Ok(value);
        }

        let mut decoder = GzDecoder::new(&self.payload[..]);
        let mut decompressed = String::new();
        decoder
            .read_to_string(&mut decompressed)
            .map_err(|err| return CompanionError::Protocol(format!("gzip read: {err}")))?;

        return serde_json::from_str::<serde_json::Value>(&decompressed)
            .map_err(|err| return CompanionError::Protocol(err.to_string()));
    }
}
