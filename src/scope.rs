//! The scope that owns a logger for the duration of a program run or a test.

use std::ops::{Deref, DerefMut};

use crate::builder::{LoggerBuilder, SetupError};
use crate::error::Reportable;
use crate::logger::Logger;
use crate::severity::Severity;
use crate::sink::SinkKind;

/// Where a [`LifecycleScope`] is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// The sinks exist but nothing has been attached yet.
    Created,
    /// The sinks are attached and the logger can be used.
    Active,
    /// Every sink has been detached and released. Terminal.
    Closed,
}

/// Owns a [`Logger`] and guarantees its sinks are flushed and released, whether the scope is
/// closed explicitly, dropped normally, or dropped while a panic unwinds through it.
///
/// The scope derefs to the logger, so the leveled methods can be called on it directly.
#[derive(Debug)]
pub struct LifecycleScope {
    logger: Logger,
    state: ScopeState,
    console_requested: bool,
}

impl LifecycleScope {
    /// Open a scope using the options from `builder`. Shorthand for [`LoggerBuilder::open()`].
    pub fn open(builder: LoggerBuilder) -> Result<Self, SetupError> {
        builder.open()
    }

    /// Take ownership of a logger whose sinks have been registered but not attached.
    pub(crate) fn new(logger: Logger, console_requested: bool) -> Self {
        Self {
            logger,
            state: ScopeState::Created,
            console_requested,
        }
    }

    /// Attach the sinks. The start of the logs only goes to the file since the console is attached
    /// afterwards.
    pub(crate) fn activate(&mut self) {
        if self.state != ScopeState::Created {
            return;
        }

        self.logger.attach(SinkKind::File);
        self.logger.debug("=== Starting of Logs ===");
        if self.console_requested {
            self.logger.attach(SinkKind::Console);
        }
        self.logger.info("Logging setup");

        self.state = ScopeState::Active;
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ScopeState::Closed
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    /// End the logs and release every sink. Does nothing if the scope has already been closed.
    #[track_caller]
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }

        self.teardown();
    }

    /// Close the scope because `error` is about to end the program. The warning about the error
    /// only goes to the file sink.
    #[track_caller]
    pub fn close_with_error<E: Reportable + ?Sized>(&mut self, error: &E) {
        if self.is_closed() {
            return;
        }

        let summary = format!("{} ({})", error.kind(), error);
        self.close_in_flight(&summary);
    }

    #[track_caller]
    fn close_in_flight(&mut self, summary: &str) {
        if self.logger.is_attached(SinkKind::Console) {
            self.logger.disable_console();
        }
        self.logger
            .emit(Severity::Warning, format!("Exception occurred: {summary}"));

        self.teardown();
    }

    #[track_caller]
    fn teardown(&mut self) {
        self.logger.disable_all();
        self.state = ScopeState::Closed;
    }
}

impl Deref for LifecycleScope {
    type Target = Logger;

    fn deref(&self) -> &Self::Target {
        &self.logger
    }
}

impl DerefMut for LifecycleScope {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.logger
    }
}

impl Drop for LifecycleScope {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }

        if std::thread::panicking() {
            self.close_in_flight("panic");
        } else {
            self.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApplicationError;
    use crate::target::SharedBuffer;
    use tempfile::TempDir;

    fn open(dir: &TempDir, console: &SharedBuffer) -> LifecycleScope {
        LoggerBuilder::new("scope_test")
            .log_directory(dir.path())
            .console_target_writer(console.clone())
            .open()
            .unwrap()
    }

    fn read_log(scope: &LifecycleScope) -> String {
        std::fs::read_to_string(scope.log_file()).unwrap()
    }

    #[test]
    fn activation_order() {
        let dir = TempDir::new().unwrap();
        let console = SharedBuffer::new();
        let scope = open(&dir, &console);
        assert_eq!(scope.state(), ScopeState::Active);

        let contents = read_log(&scope);
        let start = contents.find("=== Starting of Logs ===").unwrap();
        let console_enabled = contents.find("Console logging enabled").unwrap();
        assert!(start < console_enabled);
        assert!(!console.contents().contains("Starting of Logs"));
    }

    #[test]
    fn close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let console = SharedBuffer::new();
        let mut scope = open(&dir, &console);

        scope.close();
        scope.close();
        drop(scope);

        let path = dir
            .path()
            .read_dir()
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.matches("=== Ending of Logs ===").count(), 1);
    }

    #[test]
    fn closing_with_an_error_keeps_it_off_the_console() {
        let dir = TempDir::new().unwrap();
        let console = SharedBuffer::new();
        let mut scope = open(&dir, &console);

        scope.close_with_error(&ApplicationError::new("IoError", "disk full"));
        assert!(scope.is_closed());

        let contents = read_log(&scope);
        let warning = contents.find("Exception occurred: IoError (disk full)").unwrap();
        let ending = contents.find("=== Ending of Logs ===").unwrap();
        assert!(warning < ending);
        assert!(!console.contents().contains("disk full"));
    }

    #[test]
    fn dropping_during_a_panic_closes_the_scope() {
        let dir = TempDir::new().unwrap();
        let console = SharedBuffer::new();
        let scope = open(&dir, &console);
        let path = scope.log_file().to_owned();
        drop(scope);
        std::fs::remove_file(&path).unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = open(&dir, &console);
            panic!("unwinding");
        }));
        assert!(result.is_err());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Exception occurred: panic"));
        assert!(contents.contains("=== Ending of Logs ==="));
    }
}
