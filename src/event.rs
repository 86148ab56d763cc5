//! Trace events and the data they carry. Events are built by the facade, handed to every
//! eligible sink, and then dropped.

use once_cell::sync::Lazy;
use std::fmt::Display;
use std::panic::Location;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::severity::Severity;

/// The local UTC offset. Resolving this can fail once a process has spawned more threads, so it's
/// looked up once and falls back to UTC.
static LOCAL_OFFSET: Lazy<UtcOffset> =
    Lazy::new(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC));

/// The current local time.
pub(crate) fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(*LOCAL_OFFSET)
}

/// Formats `time` as `YYYY-MM-DD HH:MM`.
pub(crate) fn format_timestamp(time: OffsetDateTime) -> String {
    time.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| String::from("????-??-?? ??:??"))
}

/// Formats the date part of `time` as `YYYY-MM-DD`, used to name log files.
pub(crate) fn format_date(time: OffsetDateTime) -> String {
    time.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| String::from("unknown-date"))
}

/// Where an event came from: a module path and a function name. Displayed as `module.function`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Origin {
    pub module: &'static str,
    pub function: &'static str,
}

impl Origin {
    /// The origin used for events emitted outside of any traced call.
    pub const TOP_LEVEL: Origin = Origin {
        module: "",
        function: "<module>",
    };

    pub const fn new(module: &'static str, function: &'static str) -> Self {
        Self { module, function }
    }

    /// Split a fully qualified path like `my_crate::jobs::load` into its module and function.
    /// Trailing `{{closure}}` segments are skipped so closures report their enclosing function.
    pub fn from_path(path: &'static str) -> Self {
        let mut path = path;
        while let Some(stripped) = path.strip_suffix("::{{closure}}") {
            path = stripped;
        }

        match path.rsplit_once("::") {
            Some((module, function)) => Self { module, function },
            None => Self {
                module: "",
                function: path,
            },
        }
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.module.is_empty() {
            write!(f, "{}", self.function)
        } else {
            write!(f, "{}.{}", self.module, self.function)
        }
    }
}

/// The error attached to an escalation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub kind: String,
    pub description: String,
    /// The rendered call stack captured for the error.
    pub stack: String,
}

/// A single log record.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    pub severity: Severity,
    pub origin: Origin,
    /// The call site that caused the event.
    pub location: &'static Location<'static>,
    pub time: OffsetDateTime,
    pub message: String,
    pub error: Option<ErrorReport>,
}

impl TraceEvent {
    pub fn new(
        severity: Severity,
        origin: Origin,
        location: &'static Location<'static>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            origin,
            location,
            time: now(),
            message: message.into(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: ErrorReport) -> Self {
        self.error = Some(error);
        self
    }

    /// The file name component of the call site, without its directories.
    pub fn file_name(&self) -> &'static str {
        let file = self.location.file();
        file.rsplit(&['/', '\\'][..]).next().unwrap_or(file)
    }
}
