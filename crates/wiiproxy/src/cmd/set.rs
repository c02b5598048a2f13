use wiiproxy_command::Kind;

use crate::cmd::{catalog, check_outgoing, open_link, resolve, values_from_args, SetArgs};
use crate::exit::{link_error, CliError, CliResult, SUCCESS};
use crate::output::{print_values, OutputFormat};

pub fn run(args: SetArgs, format: OutputFormat) -> CliResult<i32> {
    let table = catalog()?;
    let descriptor = resolve(&table, &args.command)?;
    if descriptor.kind() != Kind::Set {
        return Err(CliError::usage(format!(
            "{} is a get command; use `wiiproxy get`",
            descriptor.name()
        )));
    }
    let values = values_from_args(&descriptor, &args.values)?;
    // Reject bad values before touching the port.
    check_outgoing(&descriptor, values.as_ref())?;

    let link = open_link(&args.link, table, Vec::new())?;
    let priority = link.handle().config().default_priority;
    let ack = link
        .submit(descriptor.code(), values, priority)
        .and_then(|mut completion| completion.wait())
        .map_err(|err| link_error("set failed", &err))?;

    print_values(&descriptor, &ack, format);
    Ok(SUCCESS)
}
