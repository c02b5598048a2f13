use wiiproxy_command::Kind;

use crate::cmd::{catalog, open_link, resolve, GetArgs};
use crate::exit::{link_error, CliError, CliResult, SUCCESS};
use crate::output::{print_values, OutputFormat};

pub fn run(args: GetArgs, format: OutputFormat) -> CliResult<i32> {
    let table = catalog()?;
    let descriptor = resolve(&table, &args.command)?;
    if descriptor.kind() != Kind::Get {
        return Err(CliError::usage(format!(
            "{} is a set command; use `wiiproxy set`",
            descriptor.name()
        )));
    }

    let link = open_link(&args.link, table, Vec::new())?;
    let values = link
        .get(descriptor.code())
        .and_then(|mut completion| completion.wait())
        .map_err(|err| link_error("get failed", &err))?;

    print_values(&descriptor, &values, format);
    Ok(SUCCESS)
}
