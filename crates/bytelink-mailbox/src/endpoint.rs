use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::{debug, trace, warn};

use bytelink_frame::{
    encode_frame, FrameConfig, Mailbox, Message, Parser, CHECKSUM_SIZE, HEADER_SIZE,
    PAYLOAD_CAPACITY, PREAMBLE_SIZE,
};
use bytelink_transport::{ByteTransport, TransportError};

use crate::error::{LinkError, Result};

/// How often the receive loop wakes to check the shutdown flag while idle.
const RX_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A message link endpoint over a byte transport.
///
/// Owns two halves of the transport: one is driven by a dedicated receive
/// thread that feeds arriving bytes through the frame [`Parser`] and queues
/// validated messages in a [`Mailbox`]; the other serves the blocking send
/// path. `send` and `pop`/`is_available` may be called from any thread;
/// concurrent senders are serialized on an internal mutex since there is a
/// single in-flight transmit buffer.
///
/// The receive thread is stopped and joined on [`shutdown`] or `Drop`.
///
/// [`shutdown`]: MessageBox::shutdown
pub struct MessageBox<T: ByteTransport> {
    tx: Mutex<TxPath<T>>,
    config: FrameConfig,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

struct TxPath<T> {
    transport: T,
    scratch: BytesMut,
}

struct Shared {
    mailbox: Mailbox,
    parser: Mutex<Parser>,
    shutdown: AtomicBool,
}

impl Shared {
    fn parser(&self) -> MutexGuard<'_, Parser> {
        self.parser.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ByteTransport + 'static> MessageBox<T> {
    /// Create an endpoint over `transport` with default framing.
    pub fn new(transport: T) -> Result<Self> {
        Self::with_config(transport, FrameConfig::default())
    }

    /// Create an endpoint with explicit framing configuration.
    ///
    /// Clones the transport and spawns the receive thread immediately.
    pub fn with_config(transport: T, config: FrameConfig) -> Result<Self> {
        let rx_transport = transport.try_clone()?;

        let shared = Arc::new(Shared {
            mailbox: Mailbox::new(),
            parser: Mutex::new(Parser::new(&config)),
            shutdown: AtomicBool::new(false),
        });

        let handle = std::thread::Builder::new()
            .name("bytelink-rx".into())
            .spawn({
                let shared = Arc::clone(&shared);
                let idle_timeout = config.idle_timeout;
                move || receive_loop(rx_transport, &shared, idle_timeout)
            })
            .map_err(LinkError::Spawn)?;

        Ok(Self {
            tx: Mutex::new(TxPath {
                transport,
                scratch: BytesMut::with_capacity(HEADER_SIZE + PAYLOAD_CAPACITY + CHECKSUM_SIZE),
            }),
            config,
            shared,
            handle: Some(handle),
        })
    }
}

impl<T: ByteTransport> MessageBox<T> {
    /// Assemble and transmit one frame (blocking, fire-and-forget).
    ///
    /// The payload is silently clamped to the configured maximum. After the
    /// frame is written, the calling thread sleeps for the configured
    /// inter-frame gap while still holding the transmit lock, so concurrent
    /// senders observe the spacing too.
    pub fn send(
        &self,
        preamble: &[u8; PREAMBLE_SIZE],
        destination: u8,
        source: u8,
        payload: &[u8],
    ) -> Result<()> {
        let mut tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let TxPath { transport, scratch } = &mut *tx;

        scratch.clear();
        encode_frame(
            preamble,
            destination,
            source,
            payload,
            self.config.max_payload,
            scratch,
        );
        transport.send_all(scratch)?;
        trace!(destination, source, len = scratch.len(), "frame sent");

        if !self.config.interframe_gap.is_zero() {
            std::thread::sleep(self.config.interframe_gap);
        }
        Ok(())
    }

    /// Transmit with the configured preamble.
    pub fn send_to(&self, destination: u8, source: u8, payload: &[u8]) -> Result<()> {
        let preamble = self.config.preamble;
        self.send(&preamble, destination, source, payload)
    }

    /// Replace the preamble pattern the receiver synchronizes on.
    pub fn set_preamble(&self, preamble: [u8; PREAMBLE_SIZE]) {
        self.shared.parser().set_preamble(preamble);
    }

    /// Non-destructive check for at least one queued message.
    pub fn is_available(&self) -> bool {
        self.shared.mailbox.is_available()
    }

    /// Remove and return the oldest decoded message, or `None` when empty.
    pub fn pop(&self) -> Option<Message> {
        self.shared.mailbox.pop()
    }

    /// Drain all queued messages.
    pub fn clear(&self) {
        self.shared.mailbox.clear();
    }

    /// Frames discarded due to checksum mismatch since construction.
    pub fn frames_dropped(&self) -> u64 {
        self.shared.parser().frames_dropped()
    }

    /// Stop and join the receive thread. Idempotent; also runs on `Drop`.
    pub fn shutdown(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("receive thread panicked");
            }
        }
    }
}

impl<T: ByteTransport> Drop for MessageBox<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Drive the parser from transport notifications until shutdown or EOF.
///
/// Each wakeup consumes at most one byte; read failures are treated as "no
/// byte this tick" so parser state is never corrupted by transient errors.
fn receive_loop<T: ByteTransport>(
    mut transport: T,
    shared: &Shared,
    idle_timeout: Option<Duration>,
) {
    debug!("receive thread started");
    let mut last_byte = Instant::now();

    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }

        let wait = match idle_timeout {
            Some(timeout) => RX_POLL_INTERVAL.min(timeout),
            None => RX_POLL_INTERVAL,
        };

        match transport.wait_readable(Some(wait)) {
            Ok(true) => match transport.recv_byte() {
                Ok(Some(byte)) => {
                    last_byte = Instant::now();
                    let mut parser = shared.parser();
                    if let Some(message) = parser.push_byte(byte) {
                        trace!(
                            source = message.source,
                            len = message.payload.len(),
                            "message received"
                        );
                        drop(parser);
                        shared.mailbox.push(message);
                    }
                }
                Ok(None) => {}
                Err(TransportError::Closed) => {
                    debug!("transport closed, receive thread exiting");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "receive error, byte skipped");
                }
            },
            Ok(false) => {
                if let Some(timeout) = idle_timeout {
                    let mut parser = shared.parser();
                    if parser.is_mid_frame() && last_byte.elapsed() >= timeout {
                        debug!("inter-byte timeout, resynchronizing");
                        parser.reset();
                    }
                }
            }
            Err(TransportError::Closed) => {
                debug!("transport closed, receive thread exiting");
                break;
            }
            Err(err) => {
                warn!(error = %err, "wait for data failed");
                std::thread::sleep(RX_POLL_INTERVAL);
            }
        }
    }

    debug!("receive thread stopped");
}
