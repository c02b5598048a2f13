use wiiproxy_command::decode_message;
use wiiproxy_frame::Direction;

use crate::cmd::{catalog, DecodeArgs};
use crate::exit::{command_error, CliError, CliResult, SUCCESS};
use crate::output::{parse_hex, print_values, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)
        .ok_or_else(|| CliError::usage(format!("invalid hex input: {}", args.hex)))?;
    let direction = if args.request {
        Direction::HostToController
    } else {
        Direction::ControllerToHost
    };

    let table = catalog()?;
    let (code, values) = decode_message(direction, &table, &bytes)
        .map_err(|err| command_error("decode failed", &err))?;
    let descriptor = table
        .lookup(code)
        .map_err(|err| command_error("decode failed", &err))?;

    print_values(&descriptor, &values, format);
    Ok(SUCCESS)
}
