use async_trait::async_trait;
use broadcast::{RecordSink, SinkError};
use chrono::{DateTime, Local, TimeZone};
use colored::*;
use domain::{Filter, Record};
use std::fmt::Display;
use std::io::{self, Write};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const RULE: &str = "======================================";

pub fn level_color(level: &str) -> Option<Color> {
    match level {
        "INFO" => Some(Color::Green),
        "WARNING" => Some(Color::Yellow),
        "ERROR" => Some(Color::Red),
        "DEBUG" => Some(Color::Cyan),
        _ => None,
    }
}

/// `[YYYY-MM-DD HH:MM:SS] LEVEL [type]: message`, timestamp in `tz`.
pub fn format_line<Tz>(record: &Record, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let timestamp: DateTime<Tz> = record.timestamp.with_timezone(tz);
    let level = match level_color(&record.level) {
        Some(color) => record.level.color(color),
        None => record.level.normal(),
    };

    format!(
        "[{}] {} [{}]: {}",
        timestamp.format(TIMESTAMP_FORMAT),
        level,
        record.category,
        record.message
    )
}

/// Writes the banner, the active filter and the snapshot, oldest record first.
/// `records` is a snapshot as returned by the store: newest first.
pub fn write_snapshot<W: Write>(out: &mut W, filter: &Filter, records: &[Record]) -> io::Result<()> {
    writeln!(out, "{}", "=== log_relay - Real-time Log Monitoring ===".bold())?;
    if let Some(level) = filter.level() {
        writeln!(out, "Level filter: {level}")?;
    }
    if let Some(category) = filter.category() {
        writeln!(out, "Type filter: {category}")?;
    }
    writeln!(out, "{RULE}")?;

    if records.is_empty() {
        writeln!(out, "No logs found")?;
    } else {
        for record in records.iter().rev() {
            writeln!(out, "{}", format_line(record, &Local))?;
        }
    }

    writeln!(out, "{RULE}")?;
    writeln!(out, "Listening for new logs... (Press Ctrl+C to exit)")?;
    out.flush()
}

/// Prints each live record as one colourised line.
pub struct TerminalSink<W> {
    out: W,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> RecordSink for TerminalSink<W> {
    async fn deliver(&mut self, record: &Record) -> Result<(), SinkError> {
        writeln!(self.out, "{}", format_line(record, &Local))?;
        self.out.flush()?;
        Ok(())
    }
}
