//! SHDLC framing for Sensirion sensors.
//!
//! Every frame on the wire has the shape:
//! - `0x7E` start delimiter
//! - header and data, byte-stuffed (`0x11 0x13 0x7D 0x7E` become `0x7D, b^0x20`)
//! - one's-complement of the 8-bit sum of all unstuffed bytes, also stuffed
//! - `0x7E` stop delimiter
//!
//! Requests carry `[address][command][length]`, responses add a `state`
//! byte whose low seven bits are the sensor's error code. The streaming
//! [`FrameWriter`] and [`FrameReader`] work one byte at a time over a
//! transport capability; [`codec`] does the same job on in-memory buffers.

pub mod codec;
pub mod error;
pub mod reader;
pub mod status;
pub mod stream;
pub mod stuffing;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, encode_request, encode_response, max_wire_size, FrameConfig,
    Request, Response, RxHeader, DEFAULT_RESPONSE_TIMEOUT_MS, MAX_DATA_LENGTH,
    REQUEST_HEADER_SIZE, RESPONSE_HEADER_SIZE,
};
pub use error::{ErrorCategory, FrameError, Result};
pub use reader::FrameReader;
pub use stream::{ArgumentBuffer, ArgumentReader, ArgumentWriter};
pub use writer::{FrameWriter, RequestStream};
