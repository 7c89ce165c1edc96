//! Formatting helpers for the `show` table: sizes, speeds, and ETAs.

use std::time::Duration;

use crate::download::Download;

/// Column header printed above [`format_row`] lines.
pub const TABLE_HEADER: &str = "GID              STATUS    PROGRESS   DOWN_SPEED     UP_SPEED        ETA  NAME";

/// Formats a byte count as a human-readable string (B, KB, MB, GB).
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Formats a duration as a human-readable string (e.g. "5.0s", "1m 05s", "1h 01m 05s").
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!(
            "{}h {:02}m {:02}s",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}.{:01}s", secs, d.subsec_millis() / 100)
    }
}

/// Formats a transfer rate, e.g. "1.50 MB/s".
#[must_use]
pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec))
}

/// Formats an optional ETA, "-" when unknown.
#[must_use]
pub fn format_eta(eta: Option<Duration>) -> String {
    eta.map_or_else(|| "-".to_string(), format_duration)
}

/// Formats one row of the `show` table.
#[must_use]
pub fn format_row(download: &Download) -> String {
    format!(
        "{:<16} {:<9} {:>7.2}% {:>12} {:>12} {:>10}  {}",
        download.gid,
        download.status.as_str(),
        download.progress(),
        format_speed(download.download_speed),
        format_speed(download.upload_speed),
        format_eta(download.eta()),
        download.name,
    )
}
