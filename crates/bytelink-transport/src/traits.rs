use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use crate::error::{Result, TransportError};

/// The byte-level primitives the framing layer needs from a transport.
///
/// One implementor instance corresponds to one endpoint of a link. The
/// framing layer clones the transport (`try_clone`) so a dedicated thread
/// can block on `wait_readable` / `recv_byte` while the application thread
/// sends.
pub trait ByteTransport: Send {
    /// Send a single byte (blocking).
    fn send_byte(&mut self, byte: u8) -> Result<()>;

    /// Send an entire buffer (blocking). Returns the number of bytes written,
    /// which on success is always `buf.len()`.
    fn send_all(&mut self, buf: &[u8]) -> Result<usize>;

    /// Receive one byte if one is readable right now.
    ///
    /// Returns `Ok(None)` when no byte is available this tick; the caller is
    /// expected to `wait_readable` again. EOF is reported as
    /// [`TransportError::Closed`].
    fn recv_byte(&mut self) -> Result<Option<u8>>;

    /// Block until the transport is readable or the timeout expires.
    ///
    /// Returns `Ok(true)` if data is ready, `Ok(false)` on timeout. A `None`
    /// timeout blocks indefinitely; callers that need to observe a shutdown
    /// flag should pass a bounded timeout.
    fn wait_readable(&mut self, timeout: Option<Duration>) -> Result<bool>;

    /// Clone this transport (a new handle to the same underlying device).
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;
}

/// Wait for `fd` to become readable via `poll(2)`.
///
/// `None` blocks indefinitely. Retries on `EINTR`.
#[cfg(unix)]
pub(crate) fn poll_readable(fd: std::os::unix::io::RawFd, timeout: Option<Duration>) -> Result<bool> {
    let timeout_ms: libc::c_int = match timeout {
        Some(d) => d.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
        None => -1,
    };

    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    loop {
        // SAFETY: `pfd` is a valid pollfd for the duration of the call and
        // `fd` is an open descriptor owned by the caller.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                continue;
            }
            return Err(TransportError::Io(err));
        }
        if rc == 0 {
            return Ok(false);
        }
        if pfd.revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0
            && pfd.revents & libc::POLLIN == 0
        {
            return Err(TransportError::Closed);
        }
        return Ok(true);
    }
}

#[cfg(unix)]
impl ByteTransport for std::os::unix::net::UnixStream {
    fn send_byte(&mut self, byte: u8) -> Result<()> {
        self.send_all(&[byte]).map(|_| ())
    }

    fn send_all(&mut self, buf: &[u8]) -> Result<usize> {
        let mut offset = 0usize;
        while offset < buf.len() {
            match self.write(&buf[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(offset)
    }

    fn recv_byte(&mut self) -> Result<Option<u8>> {
        use std::os::unix::io::AsRawFd;

        if !poll_readable(self.as_raw_fd(), Some(Duration::ZERO))? {
            return Ok(None);
        }

        let mut byte = [0u8; 1];
        loop {
            match self.read(&mut byte) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn wait_readable(&mut self, timeout: Option<Duration>) -> Result<bool> {
        use std::os::unix::io::AsRawFd;
        poll_readable(self.as_raw_fd(), timeout)
    }

    fn try_clone(&self) -> Result<Self> {
        std::os::unix::net::UnixStream::try_clone(self).map_err(TransportError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixStream;

    #[test]
    fn send_and_receive_one_byte() {
        let (mut left, mut right) = UnixStream::pair().unwrap();

        left.send_byte(0x42).unwrap();

        assert!(right.wait_readable(Some(Duration::from_secs(1))).unwrap());
        assert_eq!(right.recv_byte().unwrap(), Some(0x42));
    }

    #[test]
    fn send_all_delivers_every_byte() {
        let (mut left, mut right) = UnixStream::pair().unwrap();

        let data = [0xAAu8, 0xBB, 0xCC, 0xDD, 0x01];
        assert_eq!(left.send_all(&data).unwrap(), data.len());

        for expected in data {
            assert!(right.wait_readable(Some(Duration::from_secs(1))).unwrap());
            assert_eq!(right.recv_byte().unwrap(), Some(expected));
        }
    }

    #[test]
    fn recv_byte_without_data_is_none() {
        let (_left, mut right) = UnixStream::pair().unwrap();
        assert_eq!(right.recv_byte().unwrap(), None);
    }

    #[test]
    fn wait_readable_times_out() {
        let (_left, mut right) = UnixStream::pair().unwrap();
        let ready = right.wait_readable(Some(Duration::from_millis(10))).unwrap();
        assert!(!ready);
    }

    #[test]
    fn eof_reports_closed() {
        let (left, mut right) = UnixStream::pair().unwrap();
        drop(left);

        assert!(right.wait_readable(Some(Duration::from_secs(1))).is_ok());
        assert!(matches!(right.recv_byte(), Err(TransportError::Closed)));
    }

    #[test]
    fn cloned_handle_shares_the_stream() {
        let (mut left, right) = UnixStream::pair().unwrap();
        let mut clone = ByteTransport::try_clone(&right).unwrap();

        left.send_byte(0x07).unwrap();
        assert!(clone.wait_readable(Some(Duration::from_secs(1))).unwrap());
        assert_eq!(clone.recv_byte().unwrap(), Some(0x07));
    }
}
