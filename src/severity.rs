//! The severity scale shared by events, sinks, and the facade's floor.

use std::fmt::Display;
use std::str::FromStr;

/// How severe an event is. Ordered from least to most severe so thresholds can be compared
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// Returned when a string does not name a severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSeverityError(String);

impl std::error::Error for ParseSeverityError {}

impl Display for ParseSeverityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is not a known severity", self.0)
    }
}

impl Severity {
    /// The upper case label used in both line layouts.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // `pad()` so the layouts can use width specifiers
        f.pad(self.label())
    }
}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("critical") || trimmed.eq_ignore_ascii_case("fatal") {
            return Ok(Severity::Critical);
        }
        if trimmed.eq_ignore_ascii_case("warning") {
            return Ok(Severity::Warning);
        }

        // Everything else is spelled the same way as the `log` crate's levels
        trimmed
            .parse::<log::Level>()
            .map(Severity::from)
            .map_err(|_| ParseSeverityError(s.to_owned()))
    }
}

impl From<log::Level> for Severity {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Severity::Error,
            log::Level::Warn => Severity::Warning,
            log::Level::Info => Severity::Info,
            log::Level::Debug | log::Level::Trace => Severity::Debug,
        }
    }
}

impl From<Severity> for log::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error | Severity::Critical => log::Level::Error,
        }
    }
}
