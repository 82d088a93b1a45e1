//! Two endpoints over a socket pair exchanging framed messages.
//!
//! Run with:
//!   cargo run --example loopback

use std::os::unix::net::UnixStream;
use std::time::Duration;

use bytelink_mailbox::{FrameConfig, MessageBox};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (left_side, right_side) = UnixStream::pair()?;

    let config = FrameConfig {
        interframe_gap: Duration::from_millis(10),
        ..FrameConfig::default()
    };

    let left = MessageBox::with_config(left_side, config.clone())?;
    let right = MessageBox::with_config(right_side, config)?;

    left.send_to(0x02, 0x01, b"hello from the left")?;
    right.send_to(0x01, 0x02, b"hello from the right")?;

    for (name, link) in [("right", &right), ("left", &left)] {
        while !link.is_available() {
            std::thread::sleep(Duration::from_millis(5));
        }
        let message = link.pop().expect("message was available");
        eprintln!(
            "{name} received {} bytes from address {:#04x}: {}",
            message.payload.len(),
            message.source,
            String::from_utf8_lossy(&message.payload)
        );
    }

    Ok(())
}
