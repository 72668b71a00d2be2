use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Colors used by the summary lines printed after an import.
pub struct Colors;

impl Colors {
    pub fn label(s: &str) -> colored::ColoredString {
        s.cyan().bold()
    }

    pub fn count(n: usize) -> colored::ColoredString {
        n.to_string().green()
    }

    pub fn skipped(n: usize) -> colored::ColoredString {
        if n == 0 {
            n.to_string().normal()
        } else {
            n.to_string().yellow()
        }
    }
}

/// Install the colored logger. Our crate logs at Info (Debug when `verbose`); dependencies only
/// log warnings. A second call is a no-op.
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = if record.level() == Level::Error {
                        "ERROR".red()
                    } else {
                        "WARN".yellow()
                    };
                    let path = record.target().to_string().white();
                    format!("[{} {} {}] {}", name.cyan(), level_str, path, record.args())
                }
                Level::Debug | Level::Trace => {
                    format!("[{} {}] {}", name.cyan(), "debug".dimmed(), record.args())
                }
                Level::Info => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
}
