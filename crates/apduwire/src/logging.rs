use apduwire_transport::diagnostics::WIRE_TARGET;
use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

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

/// Install the stderr subscriber.
///
/// With `wire` set, byte dumps from the diagnostics hook are shown even when
/// `level` would hide debug output.
pub fn init_logging(format: LogFormat, level: LogLevel, wire: bool) {
    let (targets, max_level) = filters(level, wire);

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(max_level)
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.finish().with(targets).try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().finish().with(targets).try_init();
        }
    }
}

/// Per-target filter plus the subscriber-wide ceiling it needs.
fn filters(level: LogLevel, wire: bool) -> (Targets, LevelFilter) {
    let targets = Targets::new().with_default(level.as_filter());
    if wire {
        let ceiling = level.as_filter().max(LevelFilter::DEBUG);
        (targets.with_target(WIRE_TARGET, LevelFilter::DEBUG), ceiling)
    } else {
        (targets, level.as_filter())
    }
}
