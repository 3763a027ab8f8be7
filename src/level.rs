//! Severity levels understood by the hook.
//!
//! Levels follow the "smaller is more severe" convention used on the wire:
//! the numeric value of a level is what ends up in the envelope's `level`
//! field.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Defaults to [`FemtoLevel::Debug`], the minimum level a hook reports
/// unless configured otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FemtoLevel {
    Panic = 0,
    Fatal = 1,
    Error = 2,
    Warn = 3,
    Info = 4,
    #[default]
    Debug = 5,
    Trace = 6,
}

/// Returned when a level name cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(String);

impl FemtoLevel {
    /// Every level, most severe first.
    pub const ALL: [FemtoLevel; 7] = [
        Self::Panic,
        Self::Fatal,
        Self::Error,
        Self::Warn,
        Self::Info,
        Self::Debug,
        Self::Trace,
    ];

    /// Numeric severity written to the envelope.
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            FemtoLevel::Panic => "PANIC",
            FemtoLevel::Fatal => "FATAL",
            FemtoLevel::Error => "ERROR",
            FemtoLevel::Warn => "WARN",
            FemtoLevel::Info => "INFO",
            FemtoLevel::Debug => "DEBUG",
            FemtoLevel::Trace => "TRACE",
        }
    }

    /// All levels at least as severe as `threshold`.
    pub fn at_or_above(threshold: FemtoLevel) -> Vec<FemtoLevel> {
        Self::ALL
            .into_iter()
            .filter(|level| *level <= threshold)
            .collect()
    }
}

impl fmt::Display for FemtoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FemtoLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PANIC" => Ok(Self::Panic),
            "FATAL" | "CRITICAL" => Ok(Self::Fatal),
            "ERROR" => Ok(Self::Error),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "INFO" => Ok(Self::Info),
            "DEBUG" => Ok(Self::Debug),
            "TRACE" => Ok(Self::Trace),
            _ => Err(ParseLevelError(s.to_owned())),
        }
    }
}

impl From<log::Level> for FemtoLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

impl From<FemtoLevel> for log::LevelFilter {
    fn from(level: FemtoLevel) -> Self {
        match level {
            FemtoLevel::Panic | FemtoLevel::Fatal | FemtoLevel::Error => log::LevelFilter::Error,
            FemtoLevel::Warn => log::LevelFilter::Warn,
            FemtoLevel::Info => log::LevelFilter::Info,
            FemtoLevel::Debug => log::LevelFilter::Debug,
            FemtoLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("panic", FemtoLevel::Panic)]
    #[case("critical", FemtoLevel::Fatal)]
    #[case("Warning", FemtoLevel::Warn)]
    #[case(" info ", FemtoLevel::Info)]
    #[case("TRACE", FemtoLevel::Trace)]
    fn parses_level_names(#[case] input: &str, #[case] expected: FemtoLevel) {
        assert_eq!(input.parse::<FemtoLevel>(), Ok(expected));
    }

    #[rstest]
    fn unknown_level_is_an_error() {
        assert_eq!(
            "loud".parse::<FemtoLevel>(),
            Err(ParseLevelError("loud".into()))
        );
    }

    #[rstest]
    #[case(FemtoLevel::Panic, 1)]
    #[case(FemtoLevel::Error, 3)]
    #[case(FemtoLevel::Debug, 6)]
    #[case(FemtoLevel::Trace, 7)]
    fn at_or_above_counts(#[case] threshold: FemtoLevel, #[case] expected: usize) {
        let levels = FemtoLevel::at_or_above(threshold);
        assert_eq!(levels.len(), expected);
        assert!(levels.iter().all(|l| l.as_i32() <= threshold.as_i32()));
    }

    #[rstest]
    fn numeric_values_match_wire_convention() {
        assert_eq!(FemtoLevel::Panic.as_i32(), 0);
        assert_eq!(FemtoLevel::Error.as_i32(), 2);
        assert_eq!(FemtoLevel::Info.as_i32(), 4);
        assert_eq!(FemtoLevel::Trace.as_i32(), 6);
    }
}
