use shdlc_frame::{FrameWriter, Request};
use shdlc_transport::Loopback;

use crate::cmd::{build_request, parse_hex, EncodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let data = parse_hex(&args.data)?;
    let request = build_request(args.address, args.command, &data)?;

    // Same byte-by-byte path a real transmission takes.
    let mut writer = FrameWriter::new(Loopback::new());
    writer
        .write_request(&request)
        .map_err(|err| frame_error("encoding failed", err))?;
    let wire = writer.into_inner().take_bytes();

    let parsed =
        Request::from_content(request.as_bytes()).map_err(|err| frame_error("encoding failed", err))?;
    tracing::debug!(wire_len = wire.len(), "encoded request");
    print_encoded(&parsed, &wire, format);
    Ok(SUCCESS)
}
