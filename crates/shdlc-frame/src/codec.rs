use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::stream::ArgumentReader;
use crate::stuffing::{stuff, Checksum, Unstuffer, FRAME_DELIMITER};

/// Request header: address (1) + command (1) + data length (1).
pub const REQUEST_HEADER_SIZE: usize = 3;

/// Response header: address (1) + command (1) + state (1) + data length (1).
pub const RESPONSE_HEADER_SIZE: usize = 4;

/// The length field is one byte wide.
pub const MAX_DATA_LENGTH: u8 = u8::MAX;

/// Default budget, in 1 ms polling steps, for a response to arrive.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u32 = 1000;

/// Bits 6..0 of the response state byte carry the sensor error code.
pub const STATE_ERROR_MASK: u8 = 0x7F;

/// Worst-case wire size of a frame carrying `content_len` header+data bytes:
/// every byte (and the checksum) escaped, plus both delimiters.
pub const fn max_wire_size(content_len: usize) -> usize {
    2 + 2 * (content_len + 1)
}

/// Header of a received response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxHeader {
    /// Address of the responding device.
    pub address: u8,
    /// Echo of the request's command.
    pub command: u8,
    /// Bit 7 reserved; bits 6..0 are the sensor's error code.
    pub state: u8,
    /// Number of payload bytes that follow.
    pub data_len: u8,
}

impl RxHeader {
    pub fn from_bytes(bytes: [u8; RESPONSE_HEADER_SIZE]) -> Self {
        Self {
            address: bytes[0],
            command: bytes[1],
            state: bytes[2],
            data_len: bytes[3],
        }
    }

    pub fn to_bytes(self) -> [u8; RESPONSE_HEADER_SIZE] {
        [self.address, self.command, self.state, self.data_len]
    }

    /// The sensor's error code; zero means the command executed.
    pub fn error_code(&self) -> u8 {
        self.state & STATE_ERROR_MASK
    }

    pub fn is_success(&self) -> bool {
        self.error_code() == 0
    }
}

/// A validated response: header plus exactly `header.data_len` payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub header: RxHeader,
    pub payload: Bytes,
}

impl Response {
    /// Parse the unstuffed content of a response frame (checksum already
    /// stripped), applying the same length and status rules as the streaming
    /// decoder.
    pub fn from_content(content: &[u8], expected_data_length: u8) -> Result<Self> {
        if content.len() < RESPONSE_HEADER_SIZE {
            return Err(FrameError::PayloadIncomplete {
                received: content.len(),
                expected: RESPONSE_HEADER_SIZE,
            });
        }
        let (head, data) = content.split_at(RESPONSE_HEADER_SIZE);
        let header = RxHeader::from_bytes([head[0], head[1], head[2], head[3]]);

        if expected_data_length < header.data_len {
            return Err(FrameError::FrameTooLong {
                declared: header.data_len,
                expected: expected_data_length,
            });
        }
        let declared = usize::from(header.data_len);
        if data.len() < declared {
            return Err(FrameError::PayloadIncomplete {
                received: data.len(),
                expected: declared,
            });
        }
        if data.len() > declared {
            return Err(FrameError::LengthMismatch {
                declared: header.data_len,
                actual: data.len(),
            });
        }
        if !header.is_success() {
            return Err(FrameError::ExecutionFailure {
                state: header.state,
            });
        }

        Ok(Self {
            header,
            payload: Bytes::copy_from_slice(data),
        })
    }

    /// Typed view over the payload.
    pub fn arguments(&self) -> ArgumentReader {
        ArgumentReader::new(self.payload.clone())
    }
}

/// A decoded request, as seen from the sensor side of the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub address: u8,
    pub command: u8,
    pub data: Bytes,
}

impl Request {
    /// Parse the unstuffed content of a request frame (checksum stripped).
    pub fn from_content(content: &[u8]) -> Result<Self> {
        if content.len() < REQUEST_HEADER_SIZE {
            return Err(FrameError::PayloadIncomplete {
                received: content.len(),
                expected: REQUEST_HEADER_SIZE,
            });
        }
        let declared = content[2];
        let data = &content[REQUEST_HEADER_SIZE..];
        if data.len() != usize::from(declared) {
            return Err(FrameError::LengthMismatch {
                declared,
                actual: data.len(),
            });
        }
        Ok(Self {
            address: content[0],
            command: content[1],
            data: Bytes::copy_from_slice(data),
        })
    }
}

/// Encode frame content into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬────────────────────────────────────┬───────────┬──────┐
/// │ 0x7E │ content (header + data), stuffed   │ ~checksum │ 0x7E │
/// │      │ 0x11 0x13 0x7D 0x7E → 0x7D, b^0x20 │ (stuffed) │      │
/// └──────┴────────────────────────────────────┴───────────┴──────┘
/// ```
pub fn encode_frame(content: &[u8], dst: &mut BytesMut) {
    dst.reserve(max_wire_size(content.len()));
    dst.put_u8(FRAME_DELIMITER);
    let mut checksum = Checksum::new();
    for &byte in content {
        dst.put_slice(stuff(byte, &mut checksum).as_bytes());
    }
    let complement = checksum.complement();
    dst.put_slice(stuff(complement, &mut checksum).as_bytes());
    dst.put_u8(FRAME_DELIMITER);
}

/// Encode a request frame (host to sensor).
pub fn encode_request(address: u8, command: u8, data: &[u8], dst: &mut BytesMut) -> Result<()> {
    let data_len = checked_data_len(data)?;
    let mut content = Vec::with_capacity(REQUEST_HEADER_SIZE + data.len());
    content.extend_from_slice(&[address, command, data_len]);
    content.extend_from_slice(data);
    encode_frame(&content, dst);
    Ok(())
}

/// Encode a response frame (sensor to host).
pub fn encode_response(
    address: u8,
    command: u8,
    state: u8,
    data: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let data_len = checked_data_len(data)?;
    let mut content = Vec::with_capacity(RESPONSE_HEADER_SIZE + data.len());
    content.extend_from_slice(&[address, command, state, data_len]);
    content.extend_from_slice(data);
    encode_frame(&content, dst);
    Ok(())
}

fn checked_data_len(data: &[u8]) -> Result<u8> {
    u8::try_from(data.len()).map_err(|_| FrameError::CapacityExceeded {
        needed: data.len(),
        capacity: usize::from(MAX_DATA_LENGTH),
    })
}

/// Decode one frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success the frame is consumed and its unstuffed content (header and
/// data, checksum removed) is returned. A buffer that does not begin with a
/// delimiter is rejected without being consumed; a complete frame that fails
/// validation is consumed before the error is returned.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<BytesMut>> {
    let Some(&first) = src.first() else {
        return Ok(None);
    };
    if first != FRAME_DELIMITER {
        return Err(FrameError::MissingStart {
            received: Some(first),
        });
    }

    let Some(end) = src[1..].iter().position(|&b| b == FRAME_DELIMITER) else {
        return Ok(None); // Need more data
    };
    let end = end + 1;

    let mut checksum = Checksum::new();
    let mut unstuffer = Unstuffer::new();
    let mut content = BytesMut::with_capacity(end);
    for &raw in &src[1..end] {
        if let Some(byte) = unstuffer.feed(raw, &mut checksum) {
            content.put_u8(byte);
        }
    }
    src.advance(end + 1);

    if unstuffer.is_pending() || content.is_empty() {
        return Err(FrameError::MissingStop);
    }
    if !checksum.is_valid() {
        return Err(FrameError::ChecksumMismatch {
            checksum: checksum.value(),
        });
    }

    content.truncate(content.len() - 1);
    Ok(Some(content))
}

/// Configuration for the frame reader and writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Largest response payload accepted by [`FrameReader::read`](crate::FrameReader::read).
    pub max_data_length: u8,
    /// Polling budget in milliseconds for [`FrameReader::read`](crate::FrameReader::read).
    pub response_timeout_ms: u32,
    /// Buffer capacity for requests started with [`RequestStream::begin`](crate::RequestStream::begin).
    pub request_capacity: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_data_length: MAX_DATA_LENGTH,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            request_capacity: REQUEST_HEADER_SIZE + usize::from(MAX_DATA_LENGTH),
        }
    }
}
