use bytes::Bytes;
use tracing::debug;

use crate::checksum;
use crate::codec::{
    FrameConfig, Message, ADDRESS_SIZE, CHECKSUM_SIZE, PAYLOAD_CAPACITY, PREAMBLE_SIZE,
};

/// Receive state machine states, in strict forward order.
///
/// The only backward transition is the implicit reset to [`Preamble`]
/// after the checksum is verified (or fails) and on [`Parser::reset`].
///
/// [`Preamble`]: ParseState::Preamble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Matching the configured preamble byte-by-byte.
    Preamble,
    /// Reading destination, then source.
    Address,
    /// Reading the payload length byte.
    Size,
    /// Accumulating payload bytes.
    Payload,
    /// Accumulating the 4 checksum bytes, then verifying.
    Checksum,
}

/// Incremental frame parser: consumes exactly one byte per call.
///
/// Designed to sit behind a transport's "data available" notification: the
/// notifier thread feeds each arriving byte to [`push_byte`], which advances
/// the state machine and returns a [`Message`] once a complete frame has
/// passed checksum verification. All working state (in-flight frame fields
/// and the per-state cursor) lives in the struct, so multiple independent
/// parsers coexist safely.
///
/// Two wire-level policies are deliberate and load-bearing:
/// - A preamble mismatch resets the match counter for the *next* byte; the
///   failing byte is not re-tested at offset zero, so overlapping preamble
///   patterns in the stream are not recognized.
/// - A received length larger than the configured maximum is clamped, not
///   rejected. A conformant peer sending a longer frame will fail checksum
///   verification because the excess payload bytes are consumed as checksum
///   bytes; the frame is then dropped and the parser resynchronizes.
///
/// [`push_byte`]: Parser::push_byte
pub struct Parser {
    preamble: [u8; PREAMBLE_SIZE],
    max_payload: u8,
    state: ParseState,
    /// Byte offset within the current field. Reset on every state exit.
    cursor: usize,
    destination: u8,
    source: u8,
    length: u8,
    payload: [u8; PAYLOAD_CAPACITY],
    checksum: [u8; CHECKSUM_SIZE],
    frames_dropped: u64,
}

impl Parser {
    /// Create a parser for the given configuration.
    pub fn new(config: &FrameConfig) -> Self {
        Self {
            preamble: config.preamble,
            max_payload: config.max_payload,
            state: ParseState::Preamble,
            cursor: 0,
            destination: 0,
            source: 0,
            length: 0,
            payload: [0; PAYLOAD_CAPACITY],
            checksum: [0; CHECKSUM_SIZE],
            frames_dropped: 0,
        }
    }

    /// Replace the preamble pattern the parser synchronizes on.
    ///
    /// Also resets the parser: a partially matched old preamble must not
    /// count toward the new one.
    pub fn set_preamble(&mut self, preamble: [u8; PREAMBLE_SIZE]) {
        self.preamble = preamble;
        self.reset();
    }

    /// The configured preamble pattern.
    pub fn preamble(&self) -> [u8; PREAMBLE_SIZE] {
        self.preamble
    }

    /// Current state, for observability and stall detection.
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// True when a frame is partially received (any progress past the first
    /// preamble byte). Used by owners implementing an inter-byte timeout.
    pub fn is_mid_frame(&self) -> bool {
        self.state != ParseState::Preamble || self.cursor > 0
    }

    /// Frames discarded due to checksum mismatch since construction.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Abandon any in-flight frame and return to preamble matching.
    pub fn reset(&mut self) {
        self.state = ParseState::Preamble;
        self.cursor = 0;
    }

    /// Consume one received byte and advance the state machine.
    ///
    /// Returns a decoded message when this byte completes a frame whose
    /// checksum verifies; otherwise `None`. A frame failing verification is
    /// discarded silently apart from the [`frames_dropped`] counter and a
    /// debug-level event.
    ///
    /// [`frames_dropped`]: Parser::frames_dropped
    pub fn push_byte(&mut self, byte: u8) -> Option<Message> {
        match self.state {
            ParseState::Preamble => {
                if byte == self.preamble[self.cursor] {
                    self.cursor += 1;
                } else {
                    // Resynchronize: the failing byte is not re-tested
                    // against offset zero.
                    self.cursor = 0;
                }
                if self.cursor == PREAMBLE_SIZE {
                    self.cursor = 0;
                    self.state = ParseState::Address;
                }
                None
            }
            ParseState::Address => {
                if self.cursor == 0 {
                    self.destination = byte;
                } else {
                    self.source = byte;
                }
                self.cursor += 1;
                if self.cursor == ADDRESS_SIZE {
                    self.cursor = 0;
                    self.state = ParseState::Size;
                }
                None
            }
            ParseState::Size => {
                self.length = byte.min(self.max_payload);
                self.state = if self.length == 0 {
                    ParseState::Checksum
                } else {
                    ParseState::Payload
                };
                None
            }
            ParseState::Payload => {
                self.payload[self.cursor] = byte;
                self.cursor += 1;
                if self.cursor == self.length as usize {
                    self.cursor = 0;
                    self.state = ParseState::Checksum;
                }
                None
            }
            ParseState::Checksum => {
                self.checksum[self.cursor] = byte;
                self.cursor += 1;
                if self.cursor < CHECKSUM_SIZE {
                    return None;
                }

                self.cursor = 0;
                self.state = ParseState::Preamble;

                let payload = &self.payload[..self.length as usize];
                let received = u32::from_le_bytes(self.checksum);
                let expected = checksum::frame_checksum(self.destination, self.source, payload);

                if received == expected {
                    Some(Message::new(self.source, Bytes::copy_from_slice(payload)))
                } else {
                    self.frames_dropped += 1;
                    debug!(
                        destination = self.destination,
                        source = self.source,
                        length = self.length,
                        received,
                        expected,
                        "checksum mismatch, frame dropped"
                    );
                    None
                }
            }
        }
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("frames_dropped", &self.frames_dropped)
            .finish()
    }
}
