use bytes::{BufMut, BytesMut};
use shdlc_transport::{ReadChannel, Sleep, ThreadSleep, TransportError, WriteChannel};
use tracing::{debug, trace};

use crate::codec::{
    max_wire_size, FrameConfig, Response, RxHeader, MAX_DATA_LENGTH, RESPONSE_HEADER_SIZE,
};
use crate::error::{FrameError, Result};
use crate::stuffing::{Checksum, Unstuffer, FRAME_DELIMITER};
use crate::writer::{FrameWriter, RequestStream};

/// Length of one polling step of the retry budget.
pub const POLL_INTERVAL_MS: u32 = 1;

/// Most bytes [`FrameReader::drain`] discards in one call: one largest frame.
pub const DRAIN_LIMIT: usize =
    max_wire_size(RESPONSE_HEADER_SIZE + MAX_DATA_LENGTH as usize);

/// Receives response frames from a [`ReadChannel`].
///
/// Waiting is modelled as a budget of 1 ms polling steps, not as a deadline:
/// a slow individual read can make the real elapsed time exceed the budget.
/// The same budget is shared between waiting for the start delimiter and
/// waiting for late payload bytes.
pub struct FrameReader<T, S = ThreadSleep> {
    inner: T,
    sleeper: S,
    config: FrameConfig,
}

impl<T: ReadChannel> FrameReader<T, ThreadSleep> {
    /// Create a new frame reader that sleeps the calling thread between polls.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ThreadSleep, FrameConfig::default())
    }
}

impl<T: ReadChannel, S: Sleep> FrameReader<T, S> {
    /// Create a new frame reader with an explicit sleep primitive.
    pub fn with_sleep(inner: T, sleeper: S) -> Self {
        Self::with_config(inner, sleeper, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, sleeper: S, config: FrameConfig) -> Self {
        Self {
            inner,
            sleeper,
            config,
        }
    }

    /// Read a response using the configured payload limit and timeout.
    pub fn read(&mut self) -> Result<Response> {
        self.read_response(self.config.max_data_length, self.config.response_timeout_ms)
    }

    /// Discard whatever is left of an aborted frame.
    ///
    /// Reads until the line has been idle for `quiet_ms` consecutive polls,
    /// a transport error occurs, or [`DRAIN_LIMIT`] bytes were dropped.
    /// Returns the number of bytes discarded.
    pub fn drain(&mut self, quiet_ms: u32) -> usize {
        let mut discarded = 0;
        let mut idle = 0;
        while idle < quiet_ms && discarded < DRAIN_LIMIT {
            match self.read_raw() {
                Ok(Some(_)) => {
                    discarded += 1;
                    idle = 0;
                }
                Ok(None) => {
                    idle += 1;
                    self.sleeper.sleep_ms(POLL_INTERVAL_MS);
                }
                Err(err) => {
                    debug!(error = %err, "read failed while draining");
                    break;
                }
            }
        }
        if discarded > 0 {
            debug!(discarded, "drained stale bytes");
        }
        discarded
    }

    /// Receive one response frame (blocking).
    ///
    /// Fails with [`FrameError::FrameTooLong`] before reading the payload when
    /// the header announces more than `expected_data_length` bytes. On any
    /// error the line is left mid-frame.
    pub fn read_response(
        &mut self,
        expected_data_length: u8,
        max_timeout_ms: u32,
    ) -> Result<Response> {
        let mut checksum = Checksum::new();
        let mut unstuffer = Unstuffer::new();
        let mut retries = max_timeout_ms;

        // Only the first byte that arrives is checked; there is no hunting
        // for a later delimiter.
        let first = loop {
            match self.read_raw() {
                Ok(Some(byte)) => break Some(byte),
                Ok(None) => {}
                Err(err) => debug!(error = %err, "read failed while waiting for frame start"),
            }
            if retries == 0 {
                break None;
            }
            retries -= 1;
            self.sleeper.sleep_ms(POLL_INTERVAL_MS);
        };
        if first != Some(FRAME_DELIMITER) {
            debug!(received = ?first, "no start delimiter");
            return Err(FrameError::MissingStart { received: first });
        }

        // The header arrives as one burst once a frame has started; an idle
        // line here is not retried.
        let mut head = [0u8; RESPONSE_HEADER_SIZE];
        for slot in head.iter_mut() {
            match self.read_unstuffed(&mut unstuffer, &mut checksum) {
                Ok(Some(byte)) => *slot = byte,
                Ok(None) => {
                    debug!("line idle inside response header");
                    return Err(FrameError::MissingStop);
                }
                Err(err) => {
                    debug!(error = %err, "read failed inside response header");
                    return Err(FrameError::MissingStop);
                }
            }
        }
        let header = RxHeader::from_bytes(head);

        if expected_data_length < header.data_len {
            debug!(
                declared = header.data_len,
                expected = expected_data_length,
                "response longer than expected"
            );
            return Err(FrameError::FrameTooLong {
                declared: header.data_len,
                expected: expected_data_length,
            });
        }

        let data_len = usize::from(header.data_len);
        let mut payload = BytesMut::with_capacity(data_len);
        while payload.len() < data_len {
            match self.read_unstuffed(&mut unstuffer, &mut checksum) {
                Ok(Some(byte)) => payload.put_u8(byte),
                Ok(None) => {
                    if retries == 0 {
                        debug!(
                            received = payload.len(),
                            expected = data_len,
                            "timed out waiting for payload"
                        );
                        return Err(FrameError::MissingStop);
                    }
                    retries -= 1;
                    self.sleeper.sleep_ms(POLL_INTERVAL_MS);
                }
                Err(err) => {
                    debug!(error = %err, "read failed inside payload");
                    return Err(FrameError::MissingStop);
                }
            }
        }

        // The checksum byte itself is only needed for the running sum.
        if let Err(err) = self.read_unstuffed(&mut unstuffer, &mut checksum) {
            debug!(error = %err, "read failed on checksum byte");
            return Err(FrameError::MissingStop);
        }
        if !checksum.is_valid() {
            debug!(checksum = checksum.value(), "response checksum mismatch");
            return Err(FrameError::ChecksumMismatch {
                checksum: checksum.value(),
            });
        }

        if !header.is_success() {
            debug!(
                command = header.command,
                error_code = header.error_code(),
                "sensor reported execution failure"
            );
            return Err(FrameError::ExecutionFailure {
                state: header.state,
            });
        }

        match self.read_raw() {
            Ok(Some(FRAME_DELIMITER)) => {}
            Ok(other) => {
                debug!(received = ?other, "no stop delimiter");
                return Err(FrameError::MissingStop);
            }
            Err(err) => {
                debug!(error = %err, "read failed on stop delimiter");
                return Err(FrameError::MissingStop);
            }
        }

        trace!(
            address = header.address,
            command = header.command,
            data_len = header.data_len,
            "received response frame"
        );
        Ok(Response {
            header,
            payload: payload.freeze(),
        })
    }

    /// Read one original byte, resolving an escape pair.
    ///
    /// `Ok(None)` means the line went idle; an escape left pending in
    /// `unstuffer` is completed by the next call.
    fn read_unstuffed(
        &mut self,
        unstuffer: &mut Unstuffer,
        checksum: &mut Checksum,
    ) -> std::result::Result<Option<u8>, TransportError> {
        loop {
            let Some(raw) = self.read_raw()? else {
                return Ok(None);
            };
            if let Some(byte) = unstuffer.feed(raw, checksum) {
                return Ok(Some(byte));
            }
        }
    }

    fn read_raw(&mut self) -> std::result::Result<Option<u8>, TransportError> {
        let mut byte = [0u8; 1];
        match self.inner.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: ReadChannel + WriteChannel, S: Sleep> FrameReader<T, S> {
    /// Send `request` and wait for the matching response.
    ///
    /// Responses are not correlated with requests beyond ordering: whatever
    /// frame arrives next is returned.
    pub fn transceive(
        &mut self,
        request: &RequestStream,
        expected_data_length: u8,
        max_timeout_ms: u32,
    ) -> Result<Response> {
        FrameWriter::with_config(&mut self.inner, self.config).write_request(request)?;
        self.read_response(expected_data_length, max_timeout_ms)
    }
}
