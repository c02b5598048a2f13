mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "wiiproxy", version, about = "MultiWii Serial Protocol host CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_with_negative_values() {
        let cli = Cli::try_parse_from([
            "wiiproxy",
            "set",
            "--port",
            "/dev/ttyUSB0",
            "set_head",
            "-90",
        ])
        .expect("set args should parse");

        match cli.command {
            Command::Set(args) => {
                assert_eq!(args.values, vec![-90]);
                assert_eq!(args.link.port, "/dev/ttyUSB0");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_poll_command_list() {
        let cli = Cli::try_parse_from([
            "wiiproxy",
            "poll",
            "--port",
            "/dev/ttyUSB0",
            "--commands",
            "attitude,altitude",
            "--count",
            "2",
        ])
        .expect("poll args should parse");

        match cli.command {
            Command::Poll(args) => {
                assert_eq!(
                    args.commands,
                    Some(vec!["attitude".to_string(), "altitude".to_string()])
                );
                assert_eq!(args.count, Some(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_filters() {
        let err = Cli::try_parse_from(["wiiproxy", "commands", "--get-only", "--set-only"])
            .expect_err("conflicting args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
