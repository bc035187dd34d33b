use crate::status;

/// Errors that can occur while building, sending, or receiving SHDLC frames.
///
/// Every variant maps to one of the protocol's numeric status codes via
/// [`FrameError::code`]. After any error the frame state is mid-frame and
/// must be discarded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The request declared a different payload length than was appended.
    #[error("declared data length {declared} but {actual} bytes were appended")]
    LengthMismatch { declared: u8, actual: usize },

    /// A buffered frame holds fewer bytes than its header declares.
    #[error("payload incomplete ({received} of {expected} bytes before timeout)")]
    PayloadIncomplete { received: usize, expected: usize },

    /// An argument would not fit into the request buffer.
    #[error("argument buffer full ({needed} bytes needed, capacity {capacity})")]
    CapacityExceeded { needed: usize, capacity: usize },

    /// A typed read ran past the end of a response payload.
    #[error("payload too short ({needed} bytes needed, {remaining} remaining)")]
    PayloadTooShort { needed: usize, remaining: usize },

    /// The transport accepted fewer bytes than requested.
    #[error("transmit incomplete")]
    TxIncomplete,

    /// The first received byte was not a frame delimiter, or nothing arrived.
    #[error("missing start delimiter (received {})", describe_byte(.received))]
    MissingStart { received: Option<u8> },

    /// The frame broke off or did not end with a stop delimiter.
    #[error("missing stop delimiter")]
    MissingStop,

    /// The accumulated checksum did not complement to 0xFF.
    #[error("checksum mismatch (accumulated 0x{checksum:02X}, expected 0xFF)")]
    ChecksumMismatch { checksum: u8 },

    /// The response declares more data than the caller expects.
    #[error("frame too long (declared {declared} bytes, expected at most {expected})")]
    FrameTooLong { declared: u8, expected: u8 },

    /// The sensor reported an error while executing the command.
    #[error("sensor execution failure (error code 0x{:02X})", .state & 0x7F)]
    ExecutionFailure { state: u8 },
}

/// Broad classes of failure, for deciding on retry policy one layer up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Framing or encoding problems: delimiters, checksum, lengths.
    Protocol,
    /// The line refused bytes.
    Transport,
    /// The sensor understood the request and refused it.
    Execution,
}

impl FrameError {
    /// The negative status code for this error.
    pub fn code(&self) -> i16 {
        match self {
            FrameError::LengthMismatch { .. }
            | FrameError::PayloadIncomplete { .. }
            | FrameError::CapacityExceeded { .. }
            | FrameError::PayloadTooShort { .. } => status::ERR_ENCODING_ERROR,
            FrameError::TxIncomplete => status::ERR_TX_INCOMPLETE,
            FrameError::MissingStart { .. } => status::ERR_MISSING_START,
            FrameError::MissingStop => status::ERR_MISSING_STOP,
            FrameError::ChecksumMismatch { .. } => status::ERR_CHECKSUM_MISMATCH,
            FrameError::FrameTooLong { .. } => status::ERR_FRAME_TOO_LONG,
            FrameError::ExecutionFailure { .. } => status::ERR_EXECUTION_FAILURE,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            FrameError::TxIncomplete => ErrorCategory::Transport,
            FrameError::ExecutionFailure { .. } => ErrorCategory::Execution,
            _ => ErrorCategory::Protocol,
        }
    }

    /// Whether repeating the same request may succeed.
    ///
    /// Sensor-side execution failures are deterministic and are not retried.
    pub fn is_retryable(&self) -> bool {
        self.category() != ErrorCategory::Execution
    }

    /// The sensor's own error code, for execution failures.
    pub fn sensor_error_code(&self) -> Option<u8> {
        match self {
            FrameError::ExecutionFailure { state } => Some(state & 0x7F),
            _ => None,
        }
    }
}

fn describe_byte(byte: &Option<u8>) -> String {
    match byte {
        Some(b) => format!("0x{b:02X}"),
        None => "nothing".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
