use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{poll_readable, ByteTransport};

/// Supported baud rates for [`TtyPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baud {
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl Baud {
    fn speed(self) -> libc::speed_t {
        match self {
            Baud::B9600 => libc::B9600,
            Baud::B19200 => libc::B19200,
            Baud::B38400 => libc::B38400,
            Baud::B57600 => libc::B57600,
            Baud::B115200 => libc::B115200,
        }
    }
}

/// A raw-mode serial device transport (UART behind `/dev/tty*`).
///
/// The device is opened read/write, switched to raw mode (no line
/// discipline, no echo, 8-bit characters) and configured for the requested
/// baud rate. Reads are non-blocking at the descriptor level; blocking
/// behavior comes from [`ByteTransport::wait_readable`], which polls the
/// descriptor so the owner can bound the wait and remain interruptible.
pub struct TtyPort {
    file: File,
    path: PathBuf,
}

impl TtyPort {
    /// Open and configure a serial device.
    pub fn open(path: impl AsRef<Path>, baud: Baud) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;

        configure_raw(&file, baud).map_err(|e| TransportError::Configure {
            path: path.clone(),
            source: e,
        })?;

        info!(?path, ?baud, "opened serial port");

        Ok(Self { file, path })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Put the descriptor into raw mode at the given baud rate and flush any
/// stale bytes buffered by the driver.
fn configure_raw(file: &File, baud: Baud) -> std::io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: `tio` is a valid writable termios struct and `fd` is an open
    // descriptor; tcgetattr/tcsetattr only read and write through them.
    unsafe {
        let mut tio: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut tio) != 0 {
            return Err(std::io::Error::last_os_error());
        }

        libc::cfmakeraw(&mut tio);
        if libc::cfsetispeed(&mut tio, baud.speed()) != 0
            || libc::cfsetospeed(&mut tio, baud.speed()) != 0
        {
            return Err(std::io::Error::last_os_error());
        }

        // One byte at a time, no inter-character timer: arrival is signalled
        // through poll, not through blocking reads.
        tio.c_cc[libc::VMIN] = 1;
        tio.c_cc[libc::VTIME] = 0;

        if libc::tcsetattr(fd, libc::TCSANOW, &tio) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::tcflush(fd, libc::TCIOFLUSH) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    Ok(())
}

impl ByteTransport for TtyPort {
    fn send_byte(&mut self, byte: u8) -> Result<()> {
        self.send_all(&[byte]).map(|_| ())
    }

    fn send_all(&mut self, buf: &[u8]) -> Result<usize> {
        let mut offset = 0usize;
        while offset < buf.len() {
            match self.file.write(&buf[offset..]) {
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
        let mut byte = [0u8; 1];
        loop {
            match self.file.read(&mut byte) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn wait_readable(&mut self, timeout: Option<Duration>) -> Result<bool> {
        poll_readable(self.file.as_raw_fd(), timeout)
    }

    fn try_clone(&self) -> Result<Self> {
        let file = self.file.try_clone().map_err(TransportError::Io)?;
        debug!(path = ?self.path, "cloned serial port handle");
        Ok(Self {
            file,
            path: self.path.clone(),
        })
    }
}

impl std::fmt::Debug for TtyPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtyPort").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_device_reports_path() {
        let err = TtyPort::open("/dev/tty-bytelink-does-not-exist", Baud::B9600).unwrap_err();
        match err {
            TransportError::Open { path, .. } => {
                assert_eq!(path, PathBuf::from("/dev/tty-bytelink-does-not-exist"));
            }
            other => panic!("expected Open error, got {other:?}"),
        }
    }

    #[test]
    fn configure_rejects_non_tty() {
        // A regular file opens fine but tcgetattr fails on it.
        let dir = std::env::temp_dir().join(format!("bytelink-tty-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("not-a-tty");
        std::fs::write(&path, b"").unwrap();

        let err = TtyPort::open(&path, Baud::B115200).unwrap_err();
        assert!(matches!(err, TransportError::Configure { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
