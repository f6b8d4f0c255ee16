//! Utility helpers — path resolution, duration formatting, string handling.

use std::path::PathBuf;

/// Get the Tellbot data directory (e.g. `~/.tellbot/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".tellbot")
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if path.starts_with("~/") || path == "~" {
        let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(path.trim_start_matches('~').trim_start_matches('/'))
    } else {
        PathBuf::from(path)
    }
}

/// Helper to get home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("USERPROFILE").ok().map(PathBuf::from))
}

/// Case-insensitive equality, ASCII only (network nicks are ASCII).
pub fn ieq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Strip any of `punctuation` from the end of `s`.
pub fn trim_trailing(s: &str, punctuation: &str) -> String {
    s.trim_end_matches(|c| punctuation.contains(c)).to_string()
}

/// Format a duration in milliseconds as a rough human expression:
/// "42 seconds", "1 minute", "3 hours", "2 days", "5 months", "1 year".
///
/// Only the largest applicable unit is shown. Month precision uses the
/// average month length; exactness does not matter at these scales.
pub fn format_duration_ms(dur_ms: i64) -> String {
    let mut dur = dur_ms.abs() / 1000; // seconds
    let unit = if dur < 60 {
        "second"
    } else {
        dur /= 60; // minutes
        if dur < 60 {
            "minute"
        } else {
            dur /= 60; // hours
            if dur < 24 {
                "hour"
            } else {
                dur /= 24; // days
                if dur < 30 {
                    "day"
                } else {
                    dur /= 30; // months
                    if dur < 12 {
                        "month"
                    } else {
                        dur /= 12; // years
                        "year"
                    }
                }
            }
        }
    };
    let plural = if dur == 1 { "" } else { "s" };
    format!("{dur} {unit}{plural}")
}

/// Format the distance between a timestamp and now, e.g. for
/// "[10 minutes ago]" phrasings. Works in either direction.
pub fn format_age_ms(then_ms: i64, now_ms: i64) -> String {
    format_duration_ms(now_ms - then_ms)
}
