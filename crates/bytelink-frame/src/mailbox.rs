use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::codec::Message;

/// Thread-safe FIFO of decoded messages awaiting consumption.
///
/// Single producer (the receive state machine, on the notifier thread),
/// single consumer (the application, from any thread). Unbounded: a
/// consumer that never pops lets the queue grow, which is the accepted
/// trade-off of the queue-based design.
#[derive(Debug, Default)]
pub struct Mailbox {
    inner: Mutex<VecDeque<Message>>,
}

impl Mailbox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    pub fn push(&self, message: Message) {
        self.lock().push_back(message);
    }

    /// Remove and return the oldest message, or `None` when empty.
    pub fn pop(&self) -> Option<Message> {
        self.lock().pop_front()
    }

    /// Non-destructive check for at least one queued message.
    pub fn is_available(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no messages are queued.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drain all queued messages, discarding them.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Message>> {
        // A poisoned lock means a panic elsewhere; the queue itself is
        // still structurally valid.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;

    fn msg(source: u8, payload: &'static [u8]) -> Message {
        Message::new(source, Bytes::from_static(payload))
    }

    #[test]
    fn fifo_order() {
        let mailbox = Mailbox::new();
        mailbox.push(msg(1, b"a"));
        mailbox.push(msg(2, b"b"));
        mailbox.push(msg(3, b"c"));

        assert_eq!(mailbox.pop().unwrap().source, 1);
        assert_eq!(mailbox.pop().unwrap().source, 2);
        assert_eq!(mailbox.pop().unwrap().source, 3);
        assert!(mailbox.pop().is_none());
    }

    #[test]
    fn is_available_tracks_contents() {
        let mailbox = Mailbox::new();
        assert!(!mailbox.is_available());

        mailbox.push(msg(1, b"x"));
        assert!(mailbox.is_available());
        assert_eq!(mailbox.len(), 1);

        mailbox.pop();
        assert!(!mailbox.is_available());
        assert!(mailbox.is_empty());
    }

    #[test]
    fn clear_discards_everything() {
        let mailbox = Mailbox::new();
        for i in 0..10 {
            mailbox.push(msg(i, b"x"));
        }
        mailbox.clear();
        assert!(mailbox.pop().is_none());
        assert_eq!(mailbox.len(), 0);
    }

    #[test]
    fn pop_on_empty_is_none_not_an_error() {
        let mailbox = Mailbox::new();
        assert!(mailbox.pop().is_none());
    }

    #[test]
    fn concurrent_producer_consumer() {
        let mailbox = Arc::new(Mailbox::new());
        let producer = {
            let mailbox = Arc::clone(&mailbox);
            std::thread::spawn(move || {
                for i in 0..100u8 {
                    mailbox.push(Message::new(i, Bytes::from(vec![i])));
                }
            })
        };

        let mut seen = 0u32;
        let mut next = 0u8;
        while seen < 100 {
            if let Some(message) = mailbox.pop() {
                // FIFO order holds even under concurrency.
                assert_eq!(message.source, next);
                next = next.wrapping_add(1);
                seen += 1;
            } else {
                std::thread::yield_now();
            }
        }

        producer.join().unwrap();
        assert!(mailbox.is_empty());
    }
}
