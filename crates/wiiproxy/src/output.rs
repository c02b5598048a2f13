use std::io::IsTerminal;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use wiiproxy_command::{Descriptor, Kind, Values};
use wiiproxy_link::{LinkStats, SnapshotEntry};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

#[derive(Serialize)]
struct CommandOutput<'a> {
    code: u8,
    name: &'a str,
    kind: Kind,
    layout: String,
    size: Option<usize>,
}

pub fn print_commands(descriptors: &[Arc<Descriptor>], format: OutputFormat) {
    let rows: Vec<CommandOutput<'_>> = descriptors
        .iter()
        .map(|d| CommandOutput {
            code: d.code(),
            name: d.name(),
            kind: d.kind(),
            layout: d.layout().format_string(),
            size: d.layout().fixed_size(),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut out = new_table(vec!["CODE", "NAME", "KIND", "LAYOUT", "SIZE"]);
            for row in &rows {
                out.add_row(vec![
                    row.code.to_string(),
                    row.name.to_string(),
                    row.kind.name().to_string(),
                    row.layout.clone(),
                    size_label(row.size),
                ]);
            }
            println!("{out}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!(
                    "{:>3} {:<16} {:<3} {} ({})",
                    row.code,
                    row.name,
                    row.kind.name(),
                    row.layout,
                    size_label(row.size)
                );
            }
        }
    }
}

fn size_label(size: Option<usize>) -> String {
    size.map_or_else(|| "variable".to_string(), |size| format!("{size} bytes"))
}

#[derive(Serialize)]
struct WireOutput<'a> {
    code: u8,
    name: &'a str,
    length: usize,
    hex: String,
}

pub fn print_wire(descriptor: &Descriptor, wire: &[u8], format: OutputFormat) {
    let out = WireOutput {
        code: descriptor.code(),
        name: descriptor.name(),
        length: wire.len(),
        hex: hex_string(wire),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["CODE", "NAME", "BYTES", "HEX"]);
            table.add_row(vec![
                out.code.to_string(),
                out.name.to_string(),
                out.length.to_string(),
                out.hex,
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", out.hex),
    }
}

#[derive(Serialize)]
struct ValuesOutput<'a> {
    code: u8,
    name: &'a str,
    kind: Kind,
    values: &'a Values,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<u64>,
    timestamp: String,
}

/// Print one decoded message.
pub fn print_values(descriptor: &Descriptor, values: &Values, format: OutputFormat) {
    print_message(descriptor, values, None, SystemTime::now(), format);
}

pub fn print_snapshot(descriptor: &Descriptor, entry: &SnapshotEntry, format: OutputFormat) {
    print_message(
        descriptor,
        &entry.values,
        Some(entry.version),
        entry.updated_at_wall,
        format,
    );
}

fn print_message(
    descriptor: &Descriptor,
    values: &Values,
    version: Option<u64>,
    at: SystemTime,
    format: OutputFormat,
) {
    let out = ValuesOutput {
        code: descriptor.code(),
        name: descriptor.name(),
        kind: descriptor.kind(),
        values,
        version,
        timestamp: now_unix_seconds(at),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["CODE", "NAME", "VERSION", "VALUES"]);
            table.add_row(vec![
                out.code.to_string(),
                out.name.to_string(),
                version.map_or_else(|| "-".to_string(), |v| v.to_string()),
                values.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{} {}", out.name, values),
    }
}

pub fn print_stats(stats: &LinkStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(stats),
        OutputFormat::Table => {
            let mut table = new_table(vec![
                "COMPLETED", "FAILED", "TIMEOUTS", "CORRUPT", "RESYNCS", "POLLS",
            ]);
            table.add_row(vec![
                stats.completed.to_string(),
                stats.failed.to_string(),
                stats.timeouts.to_string(),
                stats.corrupt_frames.to_string(),
                stats.resyncs.to_string(),
                stats.filler_polls.to_string(),
            ]);
            eprintln!("{table}");
        }
        OutputFormat::Pretty => eprintln!(
            "completed={} failed={} timeouts={} corrupt={} resyncs={}",
            stats.completed, stats.failed, stats.timeouts, stats.corrupt_frames, stats.resyncs
        ),
    }
}

pub fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse hex with optional whitespace, `0x` prefix and `:` separators.
pub fn parse_hex(input: &str) -> Option<Vec<u8>> {
    let input = input.trim();
    let input = input.strip_prefix("0x").unwrap_or(input);
    let digits: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(pair, 16).ok()
        })
        .collect()
}

fn now_unix_seconds(at: SystemTime) -> String {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let bytes = [0x24, 0x4d, 0x3e, 0x00, 0x6c, 0x6c];
        assert_eq!(hex_string(&bytes), "244d3e006c6c");
        assert_eq!(parse_hex("24 4d 3e 00 6c 6c").unwrap(), bytes);
        assert_eq!(parse_hex("0x244D3E006C6C").unwrap(), bytes);
        assert_eq!(parse_hex("24:4d:3e:00:6c:6c").unwrap(), bytes);
    }

    #[test]
    fn bad_hex_rejected() {
        assert!(parse_hex("abc").is_none());
        assert!(parse_hex("zz").is_none());
    }
}
