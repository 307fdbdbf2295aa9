//! Reusable formatting utilities for CLI output

use chrono::{DateTime, Local, Utc};

use crate::models::{ScanSummary, Severity};

/// Format a UTC time in the local timezone, e.g. `03/14/2025 10:26 CET`
pub fn format_timestamp_local(time: DateTime<Utc>) -> String {
    let local = time.with_timezone(&Local);
    format!(
        "{} {}",
        local.format("%m/%d/%Y %H:%M"),
        offset_to_tz_abbrev(local.offset().local_minus_utc())
    )
}

/// Convert UTC offset (seconds) to a timezone abbreviation.
///
/// Falls back to `UTC+N` for offsets without a common abbreviation.
pub fn offset_to_tz_abbrev(offset_secs: i32) -> String {
    let offset_hours = offset_secs / 3600;
    let abbrev = match offset_hours {
        -10 => "HST",
        -9 => "AKST",
        -8 => "PST",
        -7 => "MST",
        -6 => "CST",
        -5 => "EST",
        -3 => "ART",
        0 => "UTC",
        1 => "CET",
        2 => "EET",
        3 => "MSK",
        9 => "JST",
        10 => "AEST",
        12 => "NZST",
        _ => return format!("UTC{:+}", offset_hours),
    };
    abbrev.to_string()
}

/// Format seconds as `2h 15m 30s`, `5m 10s` or `45s`
pub fn format_duration_secs(secs: i64) -> String {
    let secs = secs.max(0);
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Coarse age of a past time relative to `now`, e.g. `3h ago`
pub fn format_relative(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - time).num_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3600),
        s => format!("{}d ago", s / 86_400),
    }
}

/// Format bytes as a human-readable size
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Compact severity counts, e.g. `1C 2H 0M 1L 0I`
pub fn format_severity_counts(summary: &ScanSummary) -> String {
    Severity::DESCENDING
        .iter()
        .map(|s| format!("{}{}", summary.count(*s), &s.label()[..1]))
        .collect::<Vec<_>>()
        .join(" ")
}
