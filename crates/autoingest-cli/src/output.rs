//! Terminal rendering shared by the commands

use crate::Result;
use autoingest_core::CaseStatus;
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use serde::Serialize;

/// Timestamp layout for tables and key/value listings
pub const DISPLAY_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Build a table with the standard look and the given header
pub fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a date, showing epoch as "never"
pub fn format_date(date: DateTime<Utc>) -> String {
    if date == DateTime::UNIX_EPOCH {
        "never".to_string()
    } else {
        date.format(DISPLAY_DATE_FORMAT).to_string()
    }
}

pub fn colored_status(status: CaseStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        CaseStatus::Ok => text.green(),
        CaseStatus::Errors => text.red().bold(),
        CaseStatus::Interrupts => text.yellow(),
        CaseStatus::Cancellations => text.magenta(),
    }
}

/// Print an aligned `key: value` line
pub fn field(key: &str, value: impl std::fmt::Display) {
    println!("  {:<22} {}", format!("{}:", key).bold(), value);
}
