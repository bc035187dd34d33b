//! Numeric status codes of the SHDLC host driver.
//!
//! Zero is success; failures are negative. These are the values reported by
//! [`FrameError::code`](crate::FrameError::code) and used by the CLI and any
//! C-facing layer built on top of this crate.

use crate::error::Result;

/// The operation completed and its outputs are valid.
pub const NO_ERROR: i16 = 0;

/// Reserved: nothing was received at all.
pub const ERR_NO_DATA: i16 = -1;

pub const ERR_MISSING_START: i16 = -2;
pub const ERR_MISSING_STOP: i16 = -3;
pub const ERR_CHECKSUM_MISMATCH: i16 = -4;
pub const ERR_ENCODING_ERROR: i16 = -5;
pub const ERR_TX_INCOMPLETE: i16 = -6;
pub const ERR_FRAME_TOO_LONG: i16 = -7;
pub const ERR_EXECUTION_FAILURE: i16 = -8;

/// Collapse a result into its status code.
pub fn status_of<T>(result: &Result<T>) -> i16 {
    match result {
        Ok(_) => NO_ERROR,
        Err(err) => err.code(),
    }
}

/// Short machine-friendly name for a status code.
pub fn status_name(code: i16) -> &'static str {
    match code {
        NO_ERROR => "ok",
        ERR_NO_DATA => "no-data",
        ERR_MISSING_START => "missing-start",
        ERR_MISSING_STOP => "missing-stop",
        ERR_CHECKSUM_MISMATCH => "checksum-mismatch",
        ERR_ENCODING_ERROR => "encoding-error",
        ERR_TX_INCOMPLETE => "transmit-incomplete",
        ERR_FRAME_TOO_LONG => "frame-too-long",
        ERR_EXECUTION_FAILURE => "execution-failure",
        _ => "unknown",
    }
}
