//! A builder interface for opening a logging scope.
use std::error::Error;
use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::event::{format_date, now};
use crate::logger::Logger;
use crate::scope::LifecycleScope;
use crate::severity::Severity;
use crate::sink::{Layout, Sink, SinkKind};
use crate::target::{ConsoleTarget, TargetImpl, WriteMode};

/// The environment variable that overrides the log directory.
const LOG_DIR_ENV: &str = "LOG_SCOPE_DIR";
/// The environment variable that controls the console sink. Either `off` or a severity name.
const CONSOLE_ENV: &str = "LOG_SCOPE_CONSOLE";

/// Collects the options for a [`LifecycleScope`] and opens it. Every option except the
/// destination name has a default.
#[derive(Debug)]
pub struct LoggerBuilder {
    destination_name: String,
    write_mode: WriteMode,
    log_directory: PathBuf,
    floor: Severity,
    file_floor: Severity,
    console_floor: Severity,
    enable_console: bool,
    console_target: ConsoleTarget,
}

/// An error raised when the log file can't be set up. Nothing has been attached when this is
/// returned. This can be converted back to the builder using `Into<LoggerBuilder>`.
#[derive(Debug)]
pub enum SetupError {
    CreateDirectory {
        builder: LoggerBuilder,
        path: PathBuf,
        error: std::io::Error,
    },
    OpenFile {
        builder: LoggerBuilder,
        path: PathBuf,
        error: std::io::Error,
    },
}

impl From<SetupError> for LoggerBuilder {
    fn from(value: SetupError) -> Self {
        match value {
            SetupError::CreateDirectory { builder, .. } | SetupError::OpenFile { builder, .. } => {
                builder
            }
        }
    }
}

impl SetupError {
    pub fn path(&self) -> &Path {
        match self {
            SetupError::CreateDirectory { path, .. } | SetupError::OpenFile { path, .. } => path,
        }
    }
}

impl Error for SetupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SetupError::CreateDirectory { error, .. } | SetupError::OpenFile { error, .. } => {
                Some(error)
            }
        }
    }
}

impl Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::CreateDirectory { path, error, .. } => {
                write!(
                    f,
                    "Could not create the log directory '{}' ({})",
                    path.display(),
                    error
                )
            }
            SetupError::OpenFile { path, error, .. } => {
                write!(f, "Could not open '{}' ({})", path.display(), error)
            }
        }
    }
}

impl LoggerBuilder {
    /// Start configuring a logger that writes to `{log_directory}/{date}_{destination_name}.log`.
    pub fn new(destination_name: impl Into<String>) -> Self {
        Self {
            destination_name: destination_name.into(),
            write_mode: WriteMode::Append,
            log_directory: PathBuf::from("logs"),
            floor: Severity::Debug,
            file_floor: Severity::Debug,
            console_floor: Severity::Warning,
            enable_console: true,
            console_target: ConsoleTarget::Stderr,
        }
    }

    /// Apply the `LOG_SCOPE_DIR` and `LOG_SCOPE_CONSOLE` environment variables on top of the
    /// options set so far. Values that can't be used are reported on STDERR and ignored.
    pub fn from_environment(self) -> Self {
        self.with_overrides(
            std::env::var(LOG_DIR_ENV).ok().as_deref(),
            std::env::var(CONSOLE_ENV).ok().as_deref(),
        )
    }

    fn with_overrides(mut self, log_dir: Option<&str>, console: Option<&str>) -> Self {
        if let Some(log_dir) = log_dir.filter(|dir| !dir.trim().is_empty()) {
            self.log_directory = PathBuf::from(log_dir);
        }

        match console.map(str::trim) {
            None | Some("") => (),
            Some(value)
                if ["off", "none", "0"]
                    .iter()
                    .any(|off| value.eq_ignore_ascii_case(off)) =>
            {
                self.enable_console = false;
            }
            Some(value) => match value.parse::<Severity>() {
                Ok(severity) => {
                    self.enable_console = true;
                    self.console_floor = severity;
                }
                // There is no logger yet to report this through
                Err(err) => eprintln!("Ignoring {CONSOLE_ENV}: {err}"),
            },
        }

        self
    }

    /// Whether to keep or replace an existing log file for today.
    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// The directory the log file is written to. Created when the scope is opened.
    pub fn log_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_directory = path.into();
        self
    }

    /// The global floor. Events below this are dropped regardless of the sink thresholds.
    pub fn floor(mut self, severity: Severity) -> Self {
        self.floor = severity;
        self
    }

    pub fn file_floor(mut self, severity: Severity) -> Self {
        self.file_floor = severity;
        self
    }

    pub fn console_floor(mut self, severity: Severity) -> Self {
        self.console_floor = severity;
        self
    }

    /// Whether to create a console sink at all. Without one, the escalation of an error has no
    /// console to come back to.
    pub fn enable_console(mut self, enable: bool) -> Self {
        self.enable_console = enable;
        self
    }

    /// Explicitly set where the console sink writes to. Defaults to STDERR.
    pub fn console_target(mut self, target: ConsoleTarget) -> Self {
        self.console_target = target;
        self
    }

    /// Send console output to `writer` instead of STDERR.
    pub fn console_target_writer(self, writer: impl Write + Send + 'static) -> Self {
        self.console_target(ConsoleTarget::Writer(Box::new(writer)))
    }

    /// The file the scope will write to if it's opened today.
    pub fn log_file_path(&self) -> PathBuf {
        self.log_directory.join(format!(
            "{}_{}.log",
            format_date(now()),
            self.destination_name
        ))
    }

    /// Create the log directory and file, then attach the sinks. Fails without attaching anything
    /// if either can't be created.
    pub fn open(self) -> Result<LifecycleScope, SetupError> {
        if let Err(error) = std::fs::create_dir_all(&self.log_directory) {
            return Err(SetupError::CreateDirectory {
                path: self.log_directory.clone(),
                builder: self,
                error,
            });
        }

        let log_file = self.log_file_path();
        let file_target = match TargetImpl::new_file_path(&log_file, self.write_mode) {
            Ok(target) => target,
            Err(error) => {
                return Err(SetupError::OpenFile {
                    builder: self,
                    path: log_file,
                    error,
                })
            }
        };

        let mut logger = Logger::new(self.floor, log_file);
        logger.register(Sink::new(
            SinkKind::File,
            self.file_floor,
            Layout::File,
            file_target,
        ));
        if self.enable_console {
            logger.register(Sink::new(
                SinkKind::Console,
                self.console_floor,
                Layout::Console,
                TargetImpl::for_console(self.console_target),
            ));
        }

        let mut scope = LifecycleScope::new(logger, self.enable_console);
        scope.activate();

        Ok(scope)
    }
}
