use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;
use wiiproxy_command::{CommandTable, Descriptor, Kind, DEFAULT_POLL};
use wiiproxy_link::LinkError;

use crate::cmd::{catalog, open_link, parse_duration, resolve, PollArgs};
use crate::exit::{link_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_snapshot, print_stats, OutputFormat};

const TICK: Duration = Duration::from_millis(20);

pub fn run(args: PollArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let table = catalog()?;
    let polled = polled_commands(&table, args.commands.as_deref())?;
    let codes = polled.iter().map(|d| d.code()).collect();

    let link = open_link(&args.link, Arc::clone(&table), codes)?;
    let handle = link.handle();

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    info!(commands = polled.len(), interval = ?interval, "polling");

    let mut printed: HashMap<u8, u64> = HashMap::new();
    let mut rounds = 0usize;

    while running.load(Ordering::SeqCst) {
        let deadline = Instant::now() + interval;
        while running.load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::sleep(TICK);
        }
        if !handle.is_active() {
            let err = handle.last_error().unwrap_or(LinkError::Stopped);
            return Err(link_error("link failed", &err));
        }

        for descriptor in &polled {
            let Some(entry) = handle.snapshot(descriptor.code()) else {
                continue;
            };
            if printed.get(&descriptor.code()) == Some(&entry.version) {
                continue;
            }
            printed.insert(descriptor.code(), entry.version);
            print_snapshot(descriptor, &entry, format);
        }

        rounds = rounds.saturating_add(1);
        if args.count.is_some_and(|count| rounds >= count) {
            break;
        }
    }

    print_stats(&handle.stats(), format);
    Ok(SUCCESS)
}

/// Resolve the commands to poll. Only get commands can be polled.
fn polled_commands(
    table: &CommandTable,
    queries: Option<&[String]>,
) -> CliResult<Vec<Arc<Descriptor>>> {
    let descriptors = match queries {
        Some(queries) if !queries.is_empty() => queries
            .iter()
            .map(|query| resolve(table, query))
            .collect::<CliResult<Vec<_>>>()?,
        _ => DEFAULT_POLL
            .iter()
            .map(|&code| {
                table
                    .lookup(code)
                    .map_err(|err| CliError::new(INTERNAL, format!("default poll: {err}")))
            })
            .collect::<CliResult<Vec<_>>>()?,
    };

    if let Some(set) = descriptors.iter().find(|d| d.kind() != Kind::Get) {
        return Err(CliError::usage(format!(
            "{} is a set command and cannot be polled",
            set.name()
        )));
    }
    Ok(descriptors)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use wiiproxy_command::codes;

    use super::*;

    #[test]
    fn default_poll_set() {
        let table = catalog().unwrap();
        let polled = polled_commands(&table, None).unwrap();
        assert_eq!(polled.len(), DEFAULT_POLL.len());
        assert_eq!(polled[0].code(), codes::STATUS);
    }

    #[test]
    fn named_commands() {
        let table = catalog().unwrap();
        let queries = vec!["attitude".to_string(), "110".to_string()];
        let polled = polled_commands(&table, Some(queries.as_slice())).unwrap();
        let polled_codes: Vec<u8> = polled.iter().map(|d| d.code()).collect();
        assert_eq!(polled_codes, vec![codes::ATTITUDE, codes::ANALOG]);
    }

    #[test]
    fn set_commands_rejected() {
        let table = catalog().unwrap();
        let queries = vec!["set_head".to_string()];
        let err = polled_commands(&table, Some(queries.as_slice())).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }
}
