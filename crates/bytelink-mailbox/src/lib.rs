//! Application-facing endpoint for bytelink.
//!
//! This is the "just works" layer. Hand a [`MessageBox`] a byte transport
//! and it runs the receive state machine on a dedicated thread, queues
//! checksum-verified messages in a FIFO, and serializes outgoing frames
//! with the configured inter-frame spacing.

pub mod endpoint;
pub mod error;

pub use endpoint::MessageBox;
pub use error::{LinkError, Result};

pub use bytelink_frame::{FrameConfig, Message};
