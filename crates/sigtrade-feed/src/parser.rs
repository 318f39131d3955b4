//! Signal text parsing.
//!
//! Input lines look like `03:40;EURAUD;CALL;5` but arrive from OCR and chat
//! copy-paste, so they are cleaned before validation:
//! - lowercase `i` is read as the `;` separator
//! - letter `O`/`o` next to a time digit or colon is read as digit `0`
//! - whitespace is removed
//! - when no separator survives, fields are recovered by pattern
//!
//! # Panics
//!
//! The regex statics use `expect()`. The patterns are literals, so a failure
//! is a programming error caught by the first test run.

use crate::error::{FeedError, FeedResult};
use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;
use sigtrade_core::{Direction, Signal};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

static O_BEFORE_COLON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[Oo]\s*:").expect("valid regex"));
static O_AFTER_COLON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":\s*[Oo]").expect("valid regex"));
static O_BEFORE_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[Oo](\d)").expect("valid regex"));
static O_AFTER_MINUTE_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(:\d)[Oo]").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}:\d{2}|[A-Z]{3}/?[A-Z]{3}|(?i:call|put)|\d+)").expect("valid regex")
});
static TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("valid regex"));
/// Start of one signal inside a multi-signal block, tolerating letter-O typos.
static BLOCK_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9Oo]{1,2}\s*:\s*[0-9Oo]{2}").expect("valid regex"));

/// Normalize one raw signal line into `;`-separated fields.
pub fn clean_line(raw: &str) -> String {
    let line = raw.trim().replace('i', ";");
    let line = O_BEFORE_COLON.replace_all(&line, "0:");
    let line = O_AFTER_COLON.replace_all(&line, ":0");
    let line = O_BEFORE_DIGIT.replace_all(&line, "0$1");
    let line = O_AFTER_MINUTE_DIGIT.replace_all(&line, "${1}0");
    let line = WHITESPACE.replace_all(&line, "").into_owned();

    if line.contains(';') {
        return line;
    }

    FIELD
        .find_iter(&line)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

/// Parse counters.
#[derive(Debug, Default)]
pub struct ParseStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl ParseStats {
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Parser for signal lines and multi-signal text blocks.
#[derive(Debug, Default)]
pub struct SignalParser {
    stats: ParseStats,
}

impl SignalParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Parse a single signal line.
    pub fn parse_line(&self, raw: &str) -> FeedResult<Signal> {
        let cleaned = clean_line(raw);
        let parts: Vec<&str> = cleaned.split(';').collect();
        if parts.len() < 4 {
            return Err(FeedError::TooFewFields {
                line: raw.trim().to_string(),
                found: parts.len(),
            });
        }

        let time = parse_time(parts[0])?;

        let pair = parts[1].to_uppercase().replace('/', "");
        if pair.is_empty() {
            return Err(FeedError::InvalidPair(parts[1].to_string()));
        }

        let direction = match parts[2].to_uppercase().as_str() {
            "CALL" => Direction::Call,
            "PUT" => Direction::Put,
            _ => return Err(FeedError::InvalidDirection(parts[2].to_string())),
        };

        let digits: String = parts[3].chars().filter(|c| c.is_ascii_digit()).collect();
        let expiry_minutes = digits
            .parse::<u32>()
            .map_err(|_| FeedError::InvalidExpiry(parts[3].to_string()))?;

        Ok(Signal::new(time, pair, direction, expiry_minutes))
    }

    /// Parse a text block that may hold several signals, on one line or many.
    ///
    /// Each time-of-day occurrence starts a new signal and a line break ends
    /// it; text outside those spans is ignored. Invalid signals are logged
    /// and skipped.
    pub fn parse_text(&self, text: &str) -> Vec<Signal> {
        let starts: Vec<usize> = BLOCK_START.find_iter(text).map(|m| m.start()).collect();
        if starts.is_empty() {
            debug!("No signal times found in text");
            return Vec::new();
        }

        let mut signals = Vec::with_capacity(starts.len());
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            let span = &text[start..end];
            let span = span.split(['\n', '\r']).next().unwrap_or(span);
            if let Some(signal) = self.accept(span) {
                signals.push(signal);
            }
        }
        signals
    }

    /// Parse a file with one signal per line. Blank lines are skipped.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> FeedResult<Vec<Signal>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let signals: Vec<Signal> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| self.accept(line))
            .collect();

        debug!(
            path = %path.display(),
            count = signals.len(),
            "Parsed signal file"
        );
        Ok(signals)
    }

    fn accept(&self, raw: &str) -> Option<Signal> {
        match self.parse_line(raw) {
            Ok(signal) => {
                self.stats.record_accepted();
                Some(signal)
            }
            Err(e) => {
                self.stats.record_rejected();
                warn!(line = %raw.trim(), error = %e, "Dropping invalid signal");
                None
            }
        }
    }
}

fn parse_time(field: &str) -> FeedResult<NaiveTime> {
    let caps = TIME
        .captures(field)
        .ok_or_else(|| FeedError::InvalidTime(field.to_string()))?;
    let hour: u32 = caps[1]
        .parse()
        .map_err(|_| FeedError::InvalidTime(field.to_string()))?;
    let minute: u32 = caps[2]
        .parse()
        .map_err(|_| FeedError::InvalidTime(field.to_string()))?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| FeedError::InvalidTime(field.to_string()))
}
