use shdlc_transport::WriteChannel;
use tracing::{debug, trace};

use crate::codec::{FrameConfig, REQUEST_HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::stream::{ArgumentBuffer, ArgumentWriter};
use crate::stuffing::{stuff, Checksum, FRAME_DELIMITER};

const ADDRESS_POS: usize = 0;
const COMMAND_POS: usize = 1;
const LENGTH_POS: usize = 2;

/// A request under construction: header followed by appended arguments.
///
/// Start one per request with [`RequestStream::begin`], append exactly the
/// declared number of payload bytes through [`ArgumentWriter`], then hand it
/// to [`FrameWriter::write_request`].
#[derive(Debug, Clone)]
pub struct RequestStream {
    buf: ArgumentBuffer,
}

impl RequestStream {
    /// Begin a request with room for the largest possible payload.
    pub fn begin(command: u8, address: u8, data_length: u8) -> Self {
        let buf = ArgumentBuffer::with_prefix(
            FrameConfig::default().request_capacity,
            &[address, command, data_length],
        );
        Self { buf }
    }

    /// Begin a request whose header and payload must fit in `capacity` bytes.
    pub fn begin_with_capacity(
        command: u8,
        address: u8,
        data_length: u8,
        capacity: usize,
    ) -> Result<Self> {
        let mut buf = ArgumentBuffer::with_capacity(capacity);
        buf.put(&[address, command, data_length])?;
        Ok(Self { buf })
    }

    pub fn address(&self) -> u8 {
        self.buf.as_slice()[ADDRESS_POS]
    }

    pub fn command(&self) -> u8 {
        self.buf.as_slice()[COMMAND_POS]
    }

    /// Payload length announced in the header.
    pub fn declared_len(&self) -> u8 {
        self.buf.as_slice()[LENGTH_POS]
    }

    /// Write cursor: header plus appended payload bytes.
    pub fn offset(&self) -> usize {
        self.buf.len()
    }

    /// Payload appended so far.
    pub fn data(&self) -> &[u8] {
        &self.buf.as_slice()[REQUEST_HEADER_SIZE..]
    }

    /// Header and payload, unstuffed, in transmission order.
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// Check that the appended payload matches the declared length.
    pub fn validate(&self) -> Result<()> {
        let actual = self.offset() - REQUEST_HEADER_SIZE;
        if actual != usize::from(self.declared_len()) {
            return Err(FrameError::LengthMismatch {
                declared: self.declared_len(),
                actual,
            });
        }
        Ok(())
    }
}

impl ArgumentWriter for RequestStream {
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.put(bytes)
    }
}

/// Transmits requests over a [`WriteChannel`], one wire byte per write.
///
/// Any write that transfers less than requested aborts the frame with
/// [`FrameError::TxIncomplete`]; the bytes already sent stay sent.
pub struct FrameWriter<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: WriteChannel> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Begin a request sized by this writer's configured capacity.
    pub fn begin(&self, command: u8, address: u8, data_length: u8) -> Result<RequestStream> {
        RequestStream::begin_with_capacity(
            command,
            address,
            data_length,
            self.config.request_capacity,
        )
    }

    /// Transmit a complete request frame (blocking).
    ///
    /// A request whose payload does not match its declared length is rejected
    /// before anything is written.
    pub fn write_request(&mut self, request: &RequestStream) -> Result<()> {
        if let Err(err) = request.validate() {
            debug!(error = %err, "refusing to send malformed request");
            return Err(err);
        }

        self.write_raw(FRAME_DELIMITER)?;
        let mut checksum = Checksum::new();
        for &byte in request.as_bytes() {
            self.write_stuffed(byte, &mut checksum)?;
        }
        let complement = checksum.complement();
        self.write_stuffed(complement, &mut checksum)?;
        self.write_raw(FRAME_DELIMITER)?;

        trace!(
            address = request.address(),
            command = request.command(),
            data_len = request.declared_len(),
            "sent request frame"
        );
        Ok(())
    }

    fn write_stuffed(&mut self, byte: u8, checksum: &mut Checksum) -> Result<()> {
        for &raw in stuff(byte, checksum).as_bytes() {
            self.write_raw(raw)?;
        }
        Ok(())
    }

    fn write_raw(&mut self, byte: u8) -> Result<()> {
        match self.inner.write(&[byte]) {
            Ok(1) => Ok(()),
            Ok(written) => {
                debug!(written, "short write on transport");
                Err(FrameError::TxIncomplete)
            }
            Err(err) => {
                debug!(error = %err, "transport write failed");
                Err(FrameError::TxIncomplete)
            }
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

    /// Consume the writer and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use shdlc_transport::{Loopback, Result as TransportResult, TransportError};

    use super::*;
    use crate::codec::{decode_frame, encode_request, Request};
    use crate::stuffing::{RESERVED, STUFF_BYTE};

    fn sent_by(request: &RequestStream) -> Vec<u8> {
        let mut writer = FrameWriter::new(Loopback::new());
        writer.write_request(request).unwrap();
        writer.into_inner().take_bytes()
    }

    #[test]
    fn begin_writes_header_and_sets_offset() {
        let request = RequestStream::begin(0xD0, 0x02, 1);
        assert_eq!(request.offset(), 3);
        assert_eq!(request.as_bytes(), &[0x02, 0xD0, 0x01]);
        assert_eq!(request.address(), 0x02);
        assert_eq!(request.command(), 0xD0);
        assert_eq!(request.declared_len(), 1);
        assert!(request.data().is_empty());
    }

    #[test]
    fn write_single_request() {
        let mut request = RequestStream::begin(0xD0, 0x00, 1);
        request.add_u8(0x01).unwrap();

        assert_eq!(
            sent_by(&request),
            vec![0x7E, 0x00, 0xD0, 0x01, 0x01, 0x2D, 0x7E]
        );
    }

    #[test]
    fn wire_matches_in_memory_encoder() {
        let mut request = RequestStream::begin(0x03, 0x00, 7);
        request.add_u16(0x7E11).unwrap();
        request.add_float(-1.5).unwrap();
        request.add_bool(true).unwrap();

        let mut expected = BytesMut::new();
        encode_request(0x00, 0x03, request.data(), &mut expected).unwrap();
        assert_eq!(sent_by(&request), expected.to_vec());
    }

    #[test]
    fn every_reserved_byte_is_escaped_on_the_wire() {
        let payload = [0x11, 0x00, 0x13, 0x7D, 0x20, 0x7E];
        let mut request = RequestStream::begin(0x01, 0x00, payload.len() as u8);
        request.add_bytes(&payload).unwrap();

        let wire = sent_by(&request);
        // delimiter + header (00 01 06) precede the payload
        let body = &wire[4..];
        let mut expected = Vec::new();
        for byte in payload {
            if RESERVED.contains(&byte) {
                expected.extend_from_slice(&[STUFF_BYTE, byte ^ 0x20]);
            } else {
                expected.push(byte);
            }
        }
        assert_eq!(&body[..expected.len()], expected.as_slice());
        assert_eq!(wire.iter().filter(|&&b| b == 0x7E).count(), 2);
    }

    #[test]
    fn unstuffed_frame_sums_to_ff() {
        let mut request = RequestStream::begin(0x42, 0x7E, 4);
        request.add_u32(0xDEAD_BEEF).unwrap();

        let mut wire = BytesMut::from(sent_by(&request).as_slice());
        let content = decode_frame(&mut wire).unwrap().unwrap();
        let decoded = Request::from_content(&content).unwrap();
        assert_eq!(decoded.address, 0x7E);
        assert_eq!(decoded.data.as_ref(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn length_mismatch_transmits_nothing() {
        let mut request = RequestStream::begin(0x03, 0x00, 2);
        request.add_u8(0x01).unwrap();

        let mut writer = FrameWriter::new(Loopback::new());
        let err = writer.write_request(&request).unwrap_err();
        assert_eq!(
            err,
            FrameError::LengthMismatch {
                declared: 2,
                actual: 1
            }
        );
        assert_eq!(writer.get_ref().pending(), 0);

        request.add_u16(0x0203).unwrap();
        let err = writer.write_request(&request).unwrap_err();
        assert_eq!(err.code(), crate::status::ERR_ENCODING_ERROR);
        assert_eq!(writer.get_ref().pending(), 0);
    }

    #[test]
    fn short_write_aborts_mid_frame() {
        let mut request = RequestStream::begin(0x03, 0x00, 2);
        request.add_u16(0x1234).unwrap();

        let mut lb = Loopback::new();
        lb.limit_writes(3);
        let mut writer = FrameWriter::new(lb);
        assert_eq!(
            writer.write_request(&request).unwrap_err(),
            FrameError::TxIncomplete
        );
        assert_eq!(writer.into_inner().take_bytes(), vec![0x7E, 0x00, 0x03]);
    }

    #[test]
    fn short_write_inside_escape_pair() {
        let mut request = RequestStream::begin(0x03, 0x00, 1);
        request.add_u8(0x7E).unwrap();

        let mut lb = Loopback::new();
        lb.limit_writes(5);
        let mut writer = FrameWriter::new(lb);
        assert!(writer.write_request(&request).is_err());
        assert_eq!(
            writer.into_inner().take_bytes(),
            vec![0x7E, 0x00, 0x03, 0x01, STUFF_BYTE]
        );
    }

    #[test]
    fn start_delimiter_failure() {
        let mut lb = Loopback::new();
        lb.limit_writes(0);
        let mut writer = FrameWriter::new(lb);
        let request = RequestStream::begin(0x03, 0x00, 0);
        assert_eq!(
            writer.write_request(&request).unwrap_err(),
            FrameError::TxIncomplete
        );
    }

    struct BrokenLine;

    impl WriteChannel for BrokenLine {
        fn write(&mut self, _buf: &[u8]) -> TransportResult<usize> {
            Err(TransportError::Io(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )))
        }
    }

    #[test]
    fn transport_error_is_tx_incomplete() {
        let mut writer = FrameWriter::new(BrokenLine);
        let request = RequestStream::begin(0x03, 0x00, 0);
        let err = writer.write_request(&request).unwrap_err();
        assert_eq!(err, FrameError::TxIncomplete);
        assert_eq!(err.category(), crate::error::ErrorCategory::Transport);
    }

    #[test]
    fn configured_capacity_bounds_arguments() {
        let config = FrameConfig {
            request_capacity: 5,
            ..FrameConfig::default()
        };
        let writer = FrameWriter::with_config(Loopback::new(), config);
        let mut request = writer.begin(0x03, 0x00, 4).unwrap();
        request.add_u16(1).unwrap();
        let err = request.add_u8(2).unwrap_err();
        assert_eq!(
            err,
            FrameError::CapacityExceeded {
                needed: 6,
                capacity: 5
            }
        );
        assert_eq!(writer.config().request_capacity, 5);
    }

    #[test]
    fn capacity_below_header_is_rejected() {
        let err = RequestStream::begin_with_capacity(0x03, 0x00, 0, 2).unwrap_err();
        assert!(matches!(err, FrameError::CapacityExceeded { needed: 3, .. }));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(Loopback::new());
        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }
}
