use anyhow::Result;
use chrono::SecondsFormat;
use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::{Level, LevelFilter};

/// How much of the grading run is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warning,
    /// Progress per submission
    Info,
    /// Every rubric line and data-source check
    Debug,
    /// Decoder internals
    Trace,
}

impl LogLevel {
    /// Maps repeated `-v` flags onto a level, starting at `Info`
    pub fn from_occurrences(occurrences: u8) -> Self {
        match occurrences {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Sets up console logging and, when `log_file` is not empty, a file sink
///
/// The console sink writes to stderr; stdout is reserved for the report.
pub fn init_logger(verbosity: LogLevel, log_file: &str) -> Result<()> {
    let mut dispatch = Dispatch::new()
        .level(LevelFilter::from(verbosity))
        .chain(console_sink());

    if !log_file.is_empty() {
        dispatch = dispatch.chain(file_sink(log_file)?);
    }
    dispatch.apply()?;

    log::debug!("Logging at {verbosity:?}");
    Ok(())
}

fn console_sink() -> Dispatch {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::White)
        .debug(Color::White)
        .trace(Color::BrightBlack);

    Dispatch::new()
        .format(move |out, message, record| {
            let color = colors.get_color(&record.level()).to_fg_str();
            match record.level() {
                Level::Error | Level::Warn => out.finish(format_args!(
                    "\x1B[{color}m{}: {message}\x1B[0m",
                    record.level().as_str().to_lowercase()
                )),
                _ => out.finish(format_args!("\x1B[{color}m{message}\x1B[0m")),
            }
        })
        .chain(std::io::stderr())
}

fn file_sink(log_file: &str) -> Result<Dispatch> {
    Ok(Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(fern::log_file(log_file)?))
}

/// Picks the coloured variant of a report line when stdout is a terminal
pub fn format_message(message: &str, colored_message: &str) -> String {
    if atty::is(atty::Stream::Stdout) {
        colored_message.to_string()
    } else {
        message.to_string()
    }
}
