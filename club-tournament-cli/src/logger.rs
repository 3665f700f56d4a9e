use std::fmt::Arguments;

use chrono::{DateTime, Local};
use log::{set_logger, set_max_level, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Only records of the tournament crates are written.
const TARGET_PREFIX: &str = "club_tournament";

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    set_logger(&Logger)?;
    set_max_level(level);
    Ok(())
}

#[derive(Copy, Clone, Debug)]
pub struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with(TARGET_PREFIX)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // stdout is reserved for the tables.
        eprintln!(
            "{}",
            format_line(
                Local::now(),
                record.file(),
                record.line(),
                record.level(),
                record.args()
            )
        );
    }

    fn flush(&self) {}
}

fn format_line(
    now: DateTime<Local>,
    file: Option<&str>,
    line: Option<u32>,
    level: Level,
    args: &Arguments<'_>,
) -> String {
    let level = match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    };

    format!(
        "[{}] [{}:{}] [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        file.unwrap_or("???"),
        line.unwrap_or(0),
        level,
        args
    )
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};
    use log::{Level, Log, MetadataBuilder};

    use super::{format_line, Logger};

    #[test]
    fn test_format_line() {
        let now = Local.with_ymd_and_hms(2023, 5, 1, 10, 30, 0).unwrap();

        assert_eq!(
            format_line(
                now,
                Some("src/tournament.rs"),
                Some(42),
                Level::Warn,
                &format_args!("match {} rejected", 3)
            ),
            "[2023-05-01 10:30:00] [src/tournament.rs:42] [WARN] match 3 rejected"
        );

        assert_eq!(
            format_line(now, None, None, Level::Info, &format_args!("hi")),
            "[2023-05-01 10:30:00] [???:0] [INFO] hi"
        );
    }

    #[test]
    fn test_logger_enabled() {
        let own = MetadataBuilder::new()
            .target("club_tournament_core::bracket")
            .build();
        let foreign = MetadataBuilder::new().target("toml::de").build();

        assert!(Logger.enabled(&own));
        assert!(!Logger.enabled(&foreign));
    }
}
