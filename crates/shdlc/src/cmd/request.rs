use shdlc_frame::FrameReader;
use shdlc_transport::SerialDevice;
use tracing::{info, warn};

use crate::cmd::{build_request, parse_duration, parse_hex, RequestArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_response, OutputFormat};

/// Idle time that marks the end of a stale frame before a retry.
const RETRY_QUIET_MS: u32 = 20;

pub fn run(args: RequestArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let timeout_ms = u32::try_from(timeout.as_millis())
        .map_err(|_| CliError::new(USAGE, format!("timeout too large: {}", args.timeout)))?;
    let data = parse_hex(&args.data)?;
    let request = build_request(args.address, args.command, &data)?;

    let device = SerialDevice::open(&args.device)
        .map_err(|err| transport_error("open failed", err))?;
    let mut reader = FrameReader::new(device);

    let mut attempt = 0;
    let response = loop {
        match reader.transceive(&request, args.expected_len, timeout_ms) {
            Ok(response) => break response,
            Err(err) if err.is_retryable() && attempt < args.retries => {
                attempt += 1;
                let discarded = reader.drain(RETRY_QUIET_MS);
                warn!(error = %err, attempt, discarded, "request failed, retrying");
            }
            Err(err) => return Err(frame_error("request failed", err)),
        }
    };

    info!(
        device = %args.device.display(),
        command = response.header.command,
        data_len = response.header.data_len,
        "response received"
    );
    print_response(&response, format);
    Ok(SUCCESS)
}
