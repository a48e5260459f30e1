use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Crates whose events follow `--log-level`.
const PORTWIRE_TARGETS: &[&str] = &[
    "portwire",
    "portwire_codec",
    "portwire_transport",
    "portwire_events",
    "portwire_activity",
];

/// Level applied to every other target (tokio, dependencies).
const FOREIGN_LEVEL: LevelFilter = LevelFilter::WARN;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Filter scoping `level` to the portwire crates.
///
/// Foreign targets never log below WARN, and are quieter still when the
/// chosen level is ERROR.
pub fn target_filter(level: LogLevel) -> Targets {
    let level = level.as_filter();
    PORTWIRE_TARGETS
        .iter()
        .fold(Targets::new(), |targets, target| {
            targets.with_target(*target, level)
        })
        .with_default(FOREIGN_LEVEL.min(level))
}

/// Route `tracing` output to stderr so stdout stays machine readable.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = target_filter(level);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    let installed = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(layer.json().with_filter(filter))
            .try_init(),
    };
    if let Err(err) = installed {
        eprintln!("warning: log subscriber not installed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn chosen_level_applies_to_portwire_crates() {
        let filter = target_filter(LogLevel::Debug);
        assert!(filter.would_enable("portwire_activity::port", &Level::DEBUG));
        assert!(filter.would_enable("portwire_codec", &Level::DEBUG));
        assert!(!filter.would_enable("portwire_events::manager", &Level::TRACE));
    }

    #[test]
    fn foreign_targets_stay_at_warn() {
        let filter = target_filter(LogLevel::Trace);
        assert!(!filter.would_enable("tokio::runtime", &Level::INFO));
        assert!(filter.would_enable("tokio::runtime", &Level::WARN));

        let quiet = target_filter(LogLevel::Error);
        assert!(!quiet.would_enable("tokio::runtime", &Level::WARN));
        assert!(quiet.would_enable("portwire", &Level::ERROR));
    }
}
