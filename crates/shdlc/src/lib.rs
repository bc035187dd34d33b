//! Host-side SHDLC for Sensirion sensors.
//!
//! SHDLC is the request/response framing Sensirion uses on UART links:
//! delimited, byte-stuffed frames with an additive checksum and a sensor
//! status byte in every response.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-level read/write/sleep capabilities, serial devices, loopback
//! - [`frame`]: argument streams, frame encoder and decoder, in-memory codec
//!
//! ```
//! use shdlc::frame::{encode_response, ArgumentWriter, FrameReader, RequestStream};
//! use shdlc::transport::Loopback;
//!
//! let mut request = RequestStream::begin(0xD0, 0x00, 1);
//! request.add_u8(0x01).unwrap();
//! assert!(request.validate().is_ok());
//!
//! let mut wire = bytes::BytesMut::new();
//! encode_response(0x00, 0xD0, 0x00, &[0x2A], &mut wire).unwrap();
//! let mut reader = FrameReader::new(Loopback::with_bytes(&wire));
//! let response = reader.read_response(1, 100).unwrap();
//! assert_eq!(response.payload.as_ref(), &[0x2A]);
//! ```

/// Re-export transport types.
pub mod transport {
    pub use shdlc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use shdlc_frame::*;
}
