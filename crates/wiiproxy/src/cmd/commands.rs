use std::sync::Arc;

use wiiproxy_command::{CommandTable, Descriptor, Kind};

use crate::cmd::{catalog, CommandsArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_commands, OutputFormat};

pub fn run(args: CommandsArgs, format: OutputFormat) -> CliResult<i32> {
    let table = catalog()?;
    let kind = match (args.get_only, args.set_only) {
        (true, _) => Some(Kind::Get),
        (_, true) => Some(Kind::Set),
        _ => None,
    };
    print_commands(&select(&table, kind), format);
    Ok(SUCCESS)
}

fn select(table: &CommandTable, kind: Option<Kind>) -> Vec<Arc<Descriptor>> {
    table
        .iter()
        .filter(|d| kind.is_none_or(|kind| d.kind() == kind))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_by_kind() {
        let table = catalog().unwrap();
        let gets = select(&table, Some(Kind::Get));
        let sets = select(&table, Some(Kind::Set));
        assert_eq!(gets.len() + sets.len(), table.len());
        assert_eq!(select(&table, None).len(), table.len());
        assert!(gets.iter().all(|d| d.code() < 200));
        assert!(sets
            .iter()
            .any(|d| d.code() == wiiproxy_command::codes::SET_HEAD));
    }
}
