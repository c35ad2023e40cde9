use std::io::{ErrorKind, Read, Write};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::settings::PortSettings;

/// A connected serial byte link.
///
/// Reads are non-blocking: `read` returns `Ok(0)` when no input is pending.
/// Writes return the number of bytes accepted; callers decide whether a
/// short write is fatal. Only the owner of the link may open or close it,
/// other components just read and write while it is open.
pub trait SerialLink: Send {
    /// Read up to `buf.len()` bytes without blocking.
    ///
    /// Returns `Ok(0)` when nothing is available.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write `buf`, returning the number of bytes actually written.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Number of bytes ready to read without blocking.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Whether the link is still open.
    fn is_open(&self) -> bool;

    /// Close the link. Subsequent reads and writes fail with
    /// [`TransportError::Closed`].
    fn close(&mut self);
}

/// Opens [`SerialLink`]s from port settings.
///
/// The interface layer holds an opener rather than a link so it can reopen
/// the port after a transport failure.
pub trait SerialOpener: Send + Sync {
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn SerialLink>>;
}

/// Adapts any non-blocking `Read + Write` stream into a [`SerialLink`].
///
/// Useful for network-attached TNCs (KISS over TCP) and for in-memory
/// streams in tests. The underlying stream must be in non-blocking mode:
/// `WouldBlock` is mapped to "no bytes available".
pub struct StreamLink<T> {
    inner: T,
    /// One byte read ahead by `bytes_available`, served by the next `read`.
    stash: Option<u8>,
    open: bool,
}

impl<T: Read + Write + Send> StreamLink<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            stash: None,
            open: true,
        }
    }

    /// Consume the adapter and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write + Send> SerialLink for StreamLink<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let mut filled = 0;
        if let Some(byte) = self.stash.take() {
            buf[0] = byte;
            filled = 1;
            if buf.len() == 1 {
                return Ok(1);
            }
        }

        match self.inner.read(&mut buf[filled..]) {
            Ok(n) => Ok(filled + n),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(filled),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(filled),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.open {
            return Err(TransportError::Closed);
        }

        let mut offset = 0usize;
        while offset < buf.len() {
            match self.inner.write(&buf[offset..]) {
                Ok(0) => break,
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(offset)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        if self.stash.is_some() {
            return Ok(1);
        }

        // A generic stream has no queue-length query; probe with a
        // single-byte non-blocking read and stash the result.
        let mut probe = [0u8; 1];
        match self.inner.read(&mut probe) {
            Ok(0) => Ok(0),
            Ok(_) => {
                self.stash = Some(probe[0]);
                Ok(1)
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(0),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        debug!("closing stream link");
        self.open = false;
        self.stash = None;
    }
}
