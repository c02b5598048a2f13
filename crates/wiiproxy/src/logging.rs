use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Target prefix shared by every workspace crate. Events under it follow
/// `--log-level`; everything else is held at warn.
const WORKSPACE_TARGET: &str = "wiiproxy";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    /// Per-request cycle and snapshot updates.
    Debug,
    /// Adds raw frame and scheduler activity.
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

fn filter(level: LogLevel) -> Targets {
    Targets::new()
        .with_default(LevelFilter::WARN)
        .with_target(WORKSPACE_TARGET, LevelFilter::from(level))
}

/// Install the stderr subscriber.
///
/// At debug and above, events name the thread and the crate they come from so
/// link worker activity can be told apart from the command that queued it.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let verbose = matches!(level, LogLevel::Debug | LogLevel::Trace);
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(verbose)
        .with_thread_names(verbose);
    let registry = tracing_subscriber::registry().with(filter(level));

    let _ = match format {
        LogFormat::Text => registry.with(fmt).try_init(),
        LogFormat::Json => registry.with(fmt.json()).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn level_applies_to_link_crates_only() {
        let targets = filter(LogLevel::Debug);
        assert!(targets.would_enable("wiiproxy_link::worker", &Level::DEBUG));
        assert!(!targets.would_enable("wiiproxy_link::worker", &Level::TRACE));
        assert!(!targets.would_enable("serialport", &Level::INFO));
        assert!(targets.would_enable("serialport", &Level::WARN));
    }

    #[test]
    fn quiet_level_silences_info() {
        let targets = filter(LogLevel::Error);
        assert!(!targets.would_enable("wiiproxy_frame::reader", &Level::WARN));
        assert!(targets.would_enable("wiiproxy", &Level::ERROR));
    }
}
