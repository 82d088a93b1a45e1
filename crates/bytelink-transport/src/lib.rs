//! Byte-oriented transport abstraction for data-link framing.
//!
//! Provides the [`ByteTransport`] trait — the minimal set of primitives the
//! framing layer needs from a physical transport: send a byte or buffer,
//! receive a byte, and wait (interruptibly) for data to arrive.
//!
//! Two implementations ship with the crate:
//! - [`TtyPort`]: a raw-mode serial device (UART behind `/dev/tty*`)
//! - `UnixStream`: a loopback stream, used by tests and demos
//!
//! This is the lowest layer of bytelink. Everything else builds on top of
//! the [`ByteTransport`] trait defined here.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod tty;

pub use error::{Result, TransportError};
pub use traits::ByteTransport;

#[cfg(unix)]
pub use tty::{Baud, TtyPort};
