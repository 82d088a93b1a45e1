use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum;

/// Preamble length in bytes.
pub const PREAMBLE_SIZE: usize = 4;

/// Default preamble pattern.
pub const DEFAULT_PREAMBLE: [u8; PREAMBLE_SIZE] = [0xAA, 0xBB, 0xCC, 0xDD];

/// Address field length: destination byte + source byte.
pub const ADDRESS_SIZE: usize = 2;

/// Checksum length in bytes (CRC-32).
pub const CHECKSUM_SIZE: usize = 4;

/// Frame header: preamble (4) + destination (1) + source (1) + length (1).
pub const HEADER_SIZE: usize = PREAMBLE_SIZE + ADDRESS_SIZE + 1;

/// Hard payload capacity: the length field is a single byte.
pub const PAYLOAD_CAPACITY: usize = 255;

/// Default configured maximum payload size.
pub const DEFAULT_MAX_PAYLOAD: u8 = 32;

/// Default pause after each transmitted frame.
pub const DEFAULT_INTERFRAME_GAP: Duration = Duration::from_millis(500);

/// A decoded, checksum-verified message as delivered to the application.
///
/// The destination address is consumed during parsing but not carried here:
/// the receiver already knows it is the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sender address from the frame.
    pub source: u8,
    /// The payload bytes.
    pub payload: Bytes,
}

impl Message {
    /// Create a new message.
    pub fn new(source: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            source,
            payload: payload.into(),
        }
    }

    /// Payload length as carried by the wire length field.
    pub fn payload_size(&self) -> u8 {
        self.payload.len() as u8
    }
}

/// Configuration shared by the send path and the receive state machine.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Preamble pattern the receiver synchronizes on.
    pub preamble: [u8; PREAMBLE_SIZE],
    /// Maximum payload size; received and transmitted lengths are clamped
    /// to this, never rejected.
    pub max_payload: u8,
    /// Minimum spacing after each transmitted frame, giving a slow remote
    /// receiver time to drain it. Set to zero to disable.
    pub interframe_gap: Duration,
    /// Optional inter-byte timeout on the receive side: if a frame stalls
    /// mid-parse for longer than this, the parser resynchronizes.
    pub idle_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE,
            max_payload: DEFAULT_MAX_PAYLOAD,
            interframe_gap: DEFAULT_INTERFRAME_GAP,
            idle_timeout: None,
        }
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────────┬──────┬──────┬────────┬─────────────┬────────────┐
/// │ Preamble (4B) │ Dest │ Src  │ Length │ Payload     │ CRC-32     │
/// │ AA BB CC DD   │ (1B) │ (1B) │ (1B)   │ (Len bytes) │ (4B LE)    │
/// └───────────────┴──────┴──────┴────────┴─────────────┴────────────┘
/// ```
///
/// The payload is silently clamped to `max_payload` bytes; excess bytes are
/// dropped without error. The checksum covers destination, source, the
/// (clamped) length byte and the payload — not the preamble.
pub fn encode_frame(
    preamble: &[u8; PREAMBLE_SIZE],
    destination: u8,
    source: u8,
    payload: &[u8],
    max_payload: u8,
    dst: &mut BytesMut,
) {
    let len = payload.len().min(max_payload as usize);
    let payload = &payload[..len];

    dst.reserve(HEADER_SIZE + len + CHECKSUM_SIZE);
    dst.put_slice(preamble);
    dst.put_u8(destination);
    dst.put_u8(source);
    dst.put_u8(len as u8);
    dst.put_slice(payload);
    dst.put_u32_le(checksum::frame_checksum(destination, source, payload));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum;

    #[test]
    fn encode_layout() {
        let mut buf = BytesMut::new();
        encode_frame(&DEFAULT_PREAMBLE, 0x02, 0x05, b"hi", DEFAULT_MAX_PAYLOAD, &mut buf);

        assert_eq!(buf.len(), HEADER_SIZE + 2 + CHECKSUM_SIZE);
        assert_eq!(&buf[..4], &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(buf[4], 0x02); // destination
        assert_eq!(buf[5], 0x05); // source
        assert_eq!(buf[6], 0x02); // length
        assert_eq!(&buf[7..9], b"hi");

        let crc = u32::from_le_bytes(buf[9..13].try_into().unwrap());
        assert_eq!(crc, checksum::compute(&[0x02, 0x05, 0x02, b'h', b'i']));
    }

    #[test]
    fn encode_clamps_oversized_payload() {
        let payload = vec![0x11u8; 300];
        let mut buf = BytesMut::new();
        encode_frame(&DEFAULT_PREAMBLE, 1, 2, &payload, 32, &mut buf);

        assert_eq!(buf[6], 32);
        assert_eq!(buf.len(), HEADER_SIZE + 32 + CHECKSUM_SIZE);
        // Checksum is over the clamped span.
        let crc = u32::from_le_bytes(buf[buf.len() - 4..].try_into().unwrap());
        assert_eq!(crc, checksum::frame_checksum(1, 2, &payload[..32]));
    }

    #[test]
    fn encode_empty_payload() {
        let mut buf = BytesMut::new();
        encode_frame(&DEFAULT_PREAMBLE, 9, 8, b"", DEFAULT_MAX_PAYLOAD, &mut buf);

        assert_eq!(buf.len(), HEADER_SIZE + CHECKSUM_SIZE);
        assert_eq!(buf[6], 0);
    }

    #[test]
    fn encode_uses_caller_preamble_verbatim() {
        let mut buf = BytesMut::new();
        encode_frame(&[1, 2, 3, 4], 0, 0, b"x", DEFAULT_MAX_PAYLOAD, &mut buf);
        assert_eq!(&buf[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn message_payload_size() {
        let msg = Message::new(5, Bytes::from_static(b"hi"));
        assert_eq!(msg.payload_size(), 2);
        assert_eq!(msg.source, 5);
    }
}
