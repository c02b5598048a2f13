use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use wiiproxy_command::{multiwii, CommandTable, Descriptor, Values};
use wiiproxy_link::{Link, LinkConfig};
use wiiproxy_transport::{SerialConfig, SerialTransport};

use crate::exit::{command_error, link_error, transport_error, CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod commands;
pub mod decode;
pub mod encode;
pub mod get;
pub mod poll;
pub mod set;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the known MultiWii commands.
    Commands(CommandsArgs),
    /// Encode a command into MSP wire bytes.
    Encode(EncodeArgs),
    /// Decode MSP wire bytes given as hex.
    Decode(DecodeArgs),
    /// Request one command from the controller and print the reply.
    Get(GetArgs),
    /// Send a set command and wait for the acknowledgement.
    Set(SetArgs),
    /// Poll commands continuously and print every update.
    Poll(PollArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Commands(args) => commands::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Get(args) => get::run(args, format),
        Command::Set(args) => set::run(args, format),
        Command::Poll(args) => poll::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial link options shared by commands that talk to a controller.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial device of the flight controller.
    #[arg(long, short = 'p', env = "WIIPROXY_PORT")]
    pub port: String,
    /// Line speed in baud.
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,
    /// Time to wait for each reply (e.g. 250ms, 1s).
    #[arg(long, default_value = "250ms")]
    pub read_timeout: String,
    /// Pause after each write in milliseconds.
    #[arg(long, default_value_t = 5)]
    pub write_delay_ms: u64,
}

#[derive(Args, Debug, Default)]
pub struct CommandsArgs {
    /// Only list get commands.
    #[arg(long, conflicts_with = "set_only")]
    pub get_only: bool,
    /// Only list set commands.
    #[arg(long)]
    pub set_only: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Command name or code (e.g. attitude, 108).
    pub command: String,
    /// Field values in layout order.
    #[arg(allow_negative_numbers = true)]
    pub values: Vec<i64>,
    /// Encode as a controller reply (`$M<`) instead of a request.
    #[arg(long)]
    pub reply: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex (e.g. 244d3c00...).
    pub hex: String,
    /// Decode a host request (`$M>`) instead of a controller reply.
    #[arg(long)]
    pub request: bool,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Command name or code.
    pub command: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Command name or code.
    pub command: String,
    /// Field values in layout order.
    #[arg(allow_negative_numbers = true)]
    pub values: Vec<i64>,
}

#[derive(Args, Debug)]
pub struct PollArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Commands to poll (comma-separated). Default: the standard telemetry set.
    #[arg(long, value_delimiter = ',')]
    pub commands: Option<Vec<String>>,
    /// How often to print the latest snapshots (e.g. 500ms, 1s).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Exit after N print rounds.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
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
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}

pub fn catalog() -> CliResult<Arc<CommandTable>> {
    multiwii()
        .map(Arc::new)
        .map_err(|err| CliError::new(INTERNAL, format!("command catalog: {err}")))
}

pub fn resolve(table: &CommandTable, query: &str) -> CliResult<Arc<Descriptor>> {
    table
        .find(query)
        .ok_or_else(|| CliError::usage(format!("unknown command: {query}")))
}

/// Turn command-line integers into values for `descriptor`.
///
/// Returns `None` when no values were given.
pub fn values_from_args(descriptor: &Descriptor, raw: &[i64]) -> CliResult<Option<Values>> {
    if raw.is_empty() {
        return Ok(None);
    }
    descriptor
        .layout()
        .values_from_integers(raw)
        .map(Some)
        .map_err(|mismatch| {
            CliError::usage(format!(
                "values do not fit {} ({}): {mismatch}",
                descriptor.name(),
                descriptor.layout()
            ))
        })
}

/// Open the serial port and start a link.
pub fn open_link(
    args: &LinkArgs,
    table: Arc<CommandTable>,
    default_commands: Vec<u8>,
) -> CliResult<Link<SerialTransport>> {
    let serial = SerialConfig {
        baud_rate: args.baud,
        ..SerialConfig::default()
    };
    let config = LinkConfig {
        read_timeout: parse_duration(&args.read_timeout)?,
        write_delay: Duration::from_millis(args.write_delay_ms),
        default_commands,
        ..LinkConfig::default()
    };

    let transport = SerialTransport::open(args.port.as_str(), &serial)
        .map_err(|err| transport_error("open failed", &err))?;
    let mut link =
        Link::new(transport, table, config).map_err(|err| link_error("link setup failed", &err))?;
    link.start()
        .map_err(|err| link_error("link start failed", &err))?;
    Ok(link)
}

pub fn check_outgoing(descriptor: &Descriptor, values: Option<&Values>) -> CliResult<()> {
    wiiproxy_command::check_outgoing(descriptor, values)
        .map_err(|err| command_error("invalid request", &err))
}
