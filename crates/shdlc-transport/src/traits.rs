use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use crate::error::{Result, TransportError};

/// Reader capability bound to one receive operation.
///
/// `Ok(0)` means no data is available right now; it is not an error.
pub trait ReadChannel {
    /// Read up to `buf.len()` bytes.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Writer capability bound to one transmit operation.
///
/// A return value smaller than `buf.len()` is a short write.
pub trait WriteChannel {
    /// Write up to `buf.len()` bytes.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;
}

/// Millisecond sleep used between retry attempts.
pub trait Sleep {
    fn sleep_ms(&mut self, ms: u32);
}

impl<T: ReadChannel + ?Sized> ReadChannel for &mut T {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }
}

impl<T: WriteChannel + ?Sized> WriteChannel for &mut T {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }
}

impl<T: Sleep + ?Sized> Sleep for &mut T {
    fn sleep_ms(&mut self, ms: u32) {
        (**self).sleep_ms(ms);
    }
}

/// Blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Adapts any `std::io` stream to the SHDLC capability traits.
///
/// Reads that would block or time out report "no data" so the frame decoder
/// can spend its retry budget; interrupted calls are retried. A write that
/// would block is retried once per millisecond for up to the write patience
/// (zero by default) and then reported as a short write.
#[derive(Debug)]
pub struct IoChannel<T> {
    inner: T,
    write_patience_ms: u32,
}

impl<T> IoChannel<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            write_patience_ms: 0,
        }
    }

    /// Wait up to `ms` milliseconds for a blocked write to drain.
    pub fn with_write_patience(mut self, ms: u32) -> Self {
        self.write_patience_ms = ms;
        self
    }

    pub fn write_patience_ms(&self) -> u32 {
        self.write_patience_ms
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the adapter and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> ReadChannel for IoChannel<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.inner.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(0)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<T: Write> WriteChannel for IoChannel<T> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut waited = 0;
        loop {
            match self.inner.write(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    if waited >= self.write_patience_ms {
                        return Ok(0);
                    }
                    waited += 1;
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}
