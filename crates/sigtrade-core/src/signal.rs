//! Parsed trading instructions.

use crate::error::{CoreError, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Option direction: CALL (price goes up) or PUT (price goes down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Call,
    Put,
}

impl Direction {
    /// Single-letter code used inside instrument ids.
    pub fn code(&self) -> char {
        match self {
            Self::Call => 'C',
            Self::Put => 'P',
        }
    }

    /// Lowercase form used by trade requests.
    pub fn as_lower(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

impl FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            _ => Err(CoreError::InvalidDirection(s.to_string())),
        }
    }
}

/// A validated trading instruction.
///
/// `time` is a wall-clock time of day without a date; the scheduler turns it
/// into an absolute instant on the current or next calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signal {
    /// Wall-clock execution time (minute precision).
    pub time: NaiveTime,
    /// Instrument code, uppercase with no separator (e.g. "EURAUD").
    pub pair: String,
    /// Trade direction.
    pub direction: Direction,
    /// Option expiry in minutes.
    pub expiry_minutes: u32,
}

impl Signal {
    pub fn new(
        time: NaiveTime,
        pair: impl Into<String>,
        direction: Direction,
        expiry_minutes: u32,
    ) -> Self {
        Self {
            time,
            pair: pair.into(),
            direction,
            expiry_minutes,
        }
    }

    /// Canonical `HH:MM;PAIR;DIRECTION;EXPIRY` rendering.
    ///
    /// Parsing this line again yields an equal `Signal`.
    pub fn to_line(&self) -> String {
        format!(
            "{};{};{};{}",
            self.time.format("%H:%M"),
            self.pair,
            self.direction,
            self.expiry_minutes
        )
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_str_is_case_insensitive() {
        assert_eq!("CALL".parse::<Direction>().unwrap(), Direction::Call);
        assert_eq!(" put ".parse::<Direction>().unwrap(), Direction::Put);
        assert_eq!("Call".parse::<Direction>().unwrap(), Direction::Call);
        assert!("BUY".parse::<Direction>().is_err());
        assert!("".parse::<Direction>().is_err());
    }

    #[test]
    fn test_direction_codes() {
        assert_eq!(Direction::Call.code(), 'C');
        assert_eq!(Direction::Put.code(), 'P');
        assert_eq!(Direction::Put.as_lower(), "put");
        assert_eq!(Direction::Call.to_string(), "CALL");
    }

    #[test]
    fn test_signal_to_line() {
        let signal = Signal::new(
            NaiveTime::from_hms_opt(3, 40, 0).unwrap(),
            "EURAUD",
            Direction::Call,
            5,
        );
        assert_eq!(signal.to_line(), "03:40;EURAUD;CALL;5");
        assert_eq!(signal.to_string(), signal.to_line());
    }
}
