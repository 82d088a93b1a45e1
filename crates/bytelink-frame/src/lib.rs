//! Preamble-synchronized framing with CRC-32 integrity for byte links.
//!
//! This is the core value-add layer of bytelink. Every message is framed as:
//! - A 4-byte preamble (default `AA BB CC DD`) for receiver synchronization
//! - Destination and source address bytes
//! - A 1-byte payload length (clamped to the configured maximum)
//! - The payload
//! - A 4-byte little-endian CRC-32 over destination, source, length and
//!   payload (the preamble is excluded)
//!
//! The receive side is a forward-only state machine ([`Parser`]) driven one
//! byte at a time, so it can sit directly behind a "data available"
//! notification from any transport. Validated messages land in a
//! thread-safe FIFO ([`Mailbox`]).

pub mod checksum;
pub mod codec;
pub mod mailbox;
pub mod parser;

pub use codec::{
    encode_frame, FrameConfig, Message, ADDRESS_SIZE, CHECKSUM_SIZE, DEFAULT_MAX_PAYLOAD,
    DEFAULT_PREAMBLE, HEADER_SIZE, PAYLOAD_CAPACITY, PREAMBLE_SIZE,
};
pub use mailbox::Mailbox;
pub use parser::{ParseState, Parser};
