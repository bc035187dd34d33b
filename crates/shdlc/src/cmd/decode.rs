use bytes::BytesMut;
use shdlc_frame::{decode_frame, Request, Response};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_request, print_response, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut buf = BytesMut::from(parse_hex(&args.frame)?.as_slice());

    let content = decode_frame(&mut buf)
        .map_err(|err| frame_error("decode failed", err))?
        .ok_or_else(|| CliError::new(DATA_INVALID, "decode failed: incomplete frame"))?;
    if !buf.is_empty() {
        tracing::warn!(trailing = buf.len(), "ignoring bytes after the first frame");
    }

    if args.request {
        let request =
            Request::from_content(&content).map_err(|err| frame_error("decode failed", err))?;
        print_request(&request, format);
    } else {
        let response = Response::from_content(&content, args.expected_len)
            .map_err(|err| frame_error("decode failed", err))?;
        print_response(&response, format);
    }
    Ok(SUCCESS)
}
