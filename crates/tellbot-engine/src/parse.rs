//! Time-expression parsing.
//!
//! The trait is the contract: free text in, optional absolute due time out.
//! [`RegexDurationParser`] is the reference implementation covering "in N
//! minutes" phrasings; richer parsers plug in behind the same trait.

use regex::Regex;

/// A time expression found in free text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTime {
    /// Absolute due time (Unix epoch ms).
    pub due_ms: i64,
    /// The expression as matched, for echoing back ("ok, in 10 minutes").
    pub expression: String,
}

/// Finds a time expression in free text, if there is one.
///
/// `None` is the normal outcome for text with no time expression in it,
/// never an error.
pub trait DurationParser: Send + Sync {
    fn parse(&self, text: &str, now_ms: i64) -> Option<ParsedTime>;
}

/// Reference parser for relative expressions of the form
/// "in N seconds/minutes/hours/days/weeks/months/years" ("a"/"an" count
/// as 1).
pub struct RegexDurationParser {
    re: Regex,
}

impl RegexDurationParser {
    pub fn new() -> Self {
        // Unit ordering matters: longest alternatives first so "months"
        // cannot half-match.
        let re = Regex::new(
            r"(?i)\bin (\d+|an?) (seconds?|minutes?|hours?|days?|weeks?|months?|years?)\b",
        )
        .expect("hardcoded regex");
        Self { re }
    }
}

impl Default for RegexDurationParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DurationParser for RegexDurationParser {
    fn parse(&self, text: &str, now_ms: i64) -> Option<ParsedTime> {
        let caps = self.re.captures(text)?;
        let count: i64 = match &caps[1] {
            a if a.eq_ignore_ascii_case("a") || a.eq_ignore_ascii_case("an") => 1,
            n => n.parse().ok()?,
        };
        let unit = caps[2].to_ascii_lowercase();
        let unit_ms: i64 = match unit.trim_end_matches('s') {
            "second" => 1_000,
            "minute" => 60_000,
            "hour" => 3_600_000,
            "day" => 86_400_000,
            "week" => 7 * 86_400_000,
            "month" => 30 * 86_400_000,
            "year" => 365 * 86_400_000,
            _ => return None,
        };
        Some(ParsedTime {
            due_ms: now_ms + count.saturating_mul(unit_ms),
            expression: caps[0].to_string(),
        })
    }
}
