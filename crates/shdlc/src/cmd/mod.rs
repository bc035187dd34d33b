use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
#[cfg(unix)]
pub mod request;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a request frame and print its wire bytes.
    Encode(EncodeArgs),
    /// Decode a frame given as hex.
    Decode(DecodeArgs),
    /// Send one request over a serial device and print the response.
    #[cfg(unix)]
    Request(RequestArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        #[cfg(unix)]
        Command::Request(args) => request::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Sensor address (decimal or 0x-prefixed hex).
    #[arg(long, short = 'a', default_value = "0", value_parser = parse_u8)]
    pub address: u8,
    /// Command id (decimal or 0x-prefixed hex).
    #[arg(long, short = 'c', value_parser = parse_u8)]
    pub command: u8,
    /// Command arguments as hex, e.g. "01 2A".
    #[arg(long, short = 'd', default_value = "")]
    pub data: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Complete wire frame as hex, delimiters included.
    pub frame: String,
    /// Decode a host-to-sensor request instead of a response.
    #[arg(long)]
    pub request: bool,
    /// Largest response payload accepted.
    #[arg(long, default_value_t = shdlc_frame::MAX_DATA_LENGTH)]
    pub expected_len: u8,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Serial device path (line settings must already be configured).
    pub device: PathBuf,
    /// Sensor address (decimal or 0x-prefixed hex).
    #[arg(long, short = 'a', default_value = "0", value_parser = parse_u8)]
    pub address: u8,
    /// Command id (decimal or 0x-prefixed hex).
    #[arg(long, short = 'c', value_parser = parse_u8)]
    pub command: u8,
    /// Command arguments as hex.
    #[arg(long, short = 'd', default_value = "")]
    pub data: String,
    /// Largest response payload accepted.
    #[arg(long, default_value_t = shdlc_frame::MAX_DATA_LENGTH)]
    pub expected_len: u8,
    /// Response timeout budget (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
    /// Extra attempts after a retryable framing failure; stale bytes are
    /// drained from the line before each one.
    #[arg(long, default_value_t = 0)]
    pub retries: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a byte given as decimal or `0x`-prefixed hex.
pub fn parse_u8(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse::<u8>(),
    };
    parsed.map_err(|_| format!("expected a byte value (0-255 or 0x00-0xFF), got {input:?}"))
}

/// Parse hex bytes, ignoring whitespace, `:` and `,` separators and an
/// optional leading `0x`.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != ':' && *c != ',')
        .collect();

    hex::decode(&digits)
        .map_err(|err| CliError::new(USAGE, format!("invalid hex input {input:?}: {err}")))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

/// Build the declared-length request stream for `data`.
pub fn build_request(
    address: u8,
    command: u8,
    data: &[u8],
) -> CliResult<shdlc_frame::RequestStream> {
    use shdlc_frame::ArgumentWriter;

    let data_length = u8::try_from(data.len()).map_err(|_| {
        CliError::new(
            USAGE,
            format!(
                "request data is {} bytes; at most {} fit in one frame",
                data.len(),
                shdlc_frame::MAX_DATA_LENGTH
            ),
        )
    })?;
    let mut request = shdlc_frame::RequestStream::begin(command, address, data_length);
    request
        .add_bytes(data)
        .map_err(|err| crate::exit::frame_error("building request failed", err))?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_u8_accepts_decimal_and_hex() {
        assert_eq!(parse_u8("208"), Ok(0xD0));
        assert_eq!(parse_u8("0xD0"), Ok(0xD0));
        assert_eq!(parse_u8("0x7e"), Ok(0x7E));
        assert!(parse_u8("0x100").is_err());
        assert!(parse_u8("-1").is_err());
    }

    #[test]
    fn parse_hex_tolerates_separators() {
        assert_eq!(parse_hex("7E 00 d0").unwrap(), vec![0x7E, 0x00, 0xD0]);
        assert_eq!(parse_hex("0x7e00").unwrap(), vec![0x7E, 0x00]);
        assert_eq!(parse_hex("01:02,03").unwrap(), vec![1, 2, 3]);
        assert!(parse_hex("").unwrap().is_empty());
    }

    #[test]
    fn parse_hex_rejects_bad_input() {
        assert_eq!(parse_hex("7E0").unwrap_err().code, USAGE);
        assert_eq!(parse_hex("zz").unwrap_err().code, USAGE);
    }

    #[test]
    fn parse_hex_accepts_printed_wire() {
        let wire = [0x7E, 0x00, 0xD0, 0x01, 0x01, 0x2D, 0x7E];
        assert_eq!(parse_hex(&crate::output::to_hex(&wire)).unwrap(), wire);
        assert_eq!(parse_hex("7E 0a Ff").unwrap(), vec![0x7E, 0x0A, 0xFF]);

        let err = parse_hex("7E 0G").unwrap_err();
        assert!(err.message.contains("7E 0G"));
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("0ms").unwrap(), Duration::ZERO);
        assert!(parse_duration("bad").is_err());
    }

    #[test]
    fn build_request_declares_data_length() {
        let request = build_request(0x00, 0xD0, &[0x01]).unwrap();
        assert_eq!(request.as_bytes(), &[0x00, 0xD0, 0x01, 0x01]);
        assert!(request.validate().is_ok());

        let err = build_request(0x00, 0xD0, &[0u8; 256]).unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
