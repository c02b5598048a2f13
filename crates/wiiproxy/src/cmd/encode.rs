use wiiproxy_command::encode_message;
use wiiproxy_frame::Direction;

use crate::cmd::{catalog, check_outgoing, resolve, values_from_args, EncodeArgs};
use crate::exit::{command_error, CliResult, SUCCESS};
use crate::output::{print_wire, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let table = catalog()?;
    let descriptor = resolve(&table, &args.command)?;
    let values = values_from_args(&descriptor, &args.values)?;

    let direction = if args.reply {
        Direction::ControllerToHost
    } else {
        check_outgoing(&descriptor, values.as_ref())?;
        Direction::HostToController
    };

    let wire = encode_message(direction, &descriptor, values.as_ref())
        .map_err(|err| command_error("encode failed", &err))?;
    print_wire(&descriptor, &wire, format);
    Ok(SUCCESS)
}
