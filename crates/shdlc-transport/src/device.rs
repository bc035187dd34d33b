use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{IoChannel, ReadChannel, WriteChannel};

/// How long a write waits for a full output queue to drain.
pub const DEFAULT_WRITE_PATIENCE_MS: u32 = 100;

/// A serial character device (e.g. `/dev/ttyUSB0`) opened for SHDLC traffic.
///
/// The device is opened non-blocking so an idle line reports "no data"
/// instead of stalling the decoder's retry loop. Because writes are
/// non-blocking too, a full output queue is waited out for up to
/// [`DEFAULT_WRITE_PATIENCE_MS`] per byte before the write counts as short
/// (which aborts the frame being sent). It never becomes the
/// controlling terminal of the process. Baud rate and parity are expected to
/// be configured beforehand (115200 8N1 for most Sensirion sensors).
#[derive(Debug)]
pub struct SerialDevice {
    channel: IoChannel<File>,
    path: PathBuf,
}

impl SerialDevice {
    /// Open a device path for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let metadata = std::fs::metadata(&path).map_err(|e| TransportError::Open {
            path: path.clone(),
            source: e,
        })?;
        if metadata.is_dir() {
            return Err(TransportError::Open {
                path,
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "path is a directory, not a device",
                ),
            });
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;

        debug!(?path, "opened serial device");

        Ok(Self {
            channel: IoChannel::new(file).with_write_patience(DEFAULT_WRITE_PATIENCE_MS),
            path,
        })
    }

    /// The path this device was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "serial-device"
    }
}

impl ReadChannel for SerialDevice {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.channel.read(buf)
    }
}

impl WriteChannel for SerialDevice {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.channel.write(buf)
    }
}
