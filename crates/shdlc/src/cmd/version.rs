use shdlc_frame::{DEFAULT_RESPONSE_TIMEOUT_MS, MAX_DATA_LENGTH};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("shdlc {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: shdlc");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("SHDLC_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("max_data_length: {MAX_DATA_LENGTH}");
    println!("default_response_timeout_ms: {DEFAULT_RESPONSE_TIMEOUT_MS}");
    println!("features: cli=true");

    Ok(SUCCESS)
}
