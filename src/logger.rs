//! The logger facade. Owns the sinks, applies the global floor, and carries the state the call
//! tracer needs.

use std::panic::Location;
use std::path::{Path, PathBuf};

use crate::error::SinkWriteError;
use crate::event::{Origin, TraceEvent};
use crate::severity::Severity;
use crate::sink::{Sink, SinkKind, SinkRegistry};

/// The logger. Created and owned by a [`LifecycleScope`][crate::LifecycleScope]; business code
/// gets to it through the scope or through the `&mut Logger` passed into traced functions.
#[derive(Debug)]
pub struct Logger {
    registry: SinkRegistry,
    /// Events below this severity are dropped before any sink thresholds are checked.
    floor: Severity,
    /// Set by the first escalation and never reset.
    exception_reported: bool,
    /// The file the file sink writes to. Named in the review message after an escalation.
    log_file: PathBuf,
    /// The traced calls currently running, innermost last. Used as the origin of events emitted by
    /// business code.
    call_stack: Vec<Origin>,
}

impl Logger {
    /// Create a facade without any sinks. Sinks are added with [`Logger::register()`].
    pub fn new(floor: Severity, log_file: impl Into<PathBuf>) -> Self {
        Self {
            registry: SinkRegistry::new(),
            floor,
            exception_reported: false,
            log_file: log_file.into(),
            call_stack: Vec::new(),
        }
    }

    /// Add a sink without attaching it. Replacing a sink releases the old one.
    #[track_caller]
    pub fn register(&mut self, sink: Sink) {
        if let Err(failure) = self.registry.register(sink) {
            self.report_sink_failures(self.current_origin(), Location::caller(), vec![failure]);
        }
    }

    pub fn registry(&self) -> &SinkRegistry {
        &self.registry
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    pub fn floor(&self) -> Severity {
        self.floor
    }

    /// Change the global floor. Only affects events emitted after this call.
    pub fn set_floor(&mut self, severity: Severity) {
        self.floor = severity;
    }

    /// Whether an error has already been escalated through this logger.
    pub fn exception_reported(&self) -> bool {
        self.exception_reported
    }

    pub fn is_attached(&self, kind: SinkKind) -> bool {
        self.registry.is_attached(kind)
    }

    /// The origin business code's events are attributed to: the innermost traced call.
    pub fn current_origin(&self) -> Origin {
        self.call_stack.last().copied().unwrap_or(Origin::TOP_LEVEL)
    }

    /// Emit an event attributed to the innermost traced call.
    #[track_caller]
    pub fn emit(&mut self, severity: Severity, message: impl Into<String>) {
        let origin = self.current_origin();
        self.emit_event(TraceEvent::new(
            severity,
            origin,
            Location::caller(),
            message,
        ));
    }

    /// Emit an event with an explicit origin.
    #[track_caller]
    pub fn emit_from(&mut self, severity: Severity, origin: Origin, message: impl Into<String>) {
        self.emit_event(TraceEvent::new(
            severity,
            origin,
            Location::caller(),
            message,
        ));
    }

    #[track_caller]
    pub fn debug(&mut self, message: impl Into<String>) {
        self.emit(Severity::Debug, message);
    }

    #[track_caller]
    pub fn info(&mut self, message: impl Into<String>) {
        self.emit(Severity::Info, message);
    }

    #[track_caller]
    pub fn warning(&mut self, message: impl Into<String>) {
        self.emit(Severity::Warning, message);
    }

    #[track_caller]
    pub fn error(&mut self, message: impl Into<String>) {
        self.emit(Severity::Error, message);
    }

    #[track_caller]
    pub fn critical(&mut self, message: impl Into<String>) {
        self.emit(Severity::Critical, message);
    }

    /// Send a fully built event to the attached sinks. A sink that fails to write is reported to
    /// the remaining sinks as a warning and otherwise ignored.
    pub fn emit_event(&mut self, event: TraceEvent) {
        if event.severity < self.floor {
            return;
        }

        let failures = self.registry.dispatch(&event, &[]);
        self.report_sink_failures(event.origin, event.location, failures);
    }

    /// Warn the attached sinks that did not fail about the ones that did.
    fn report_sink_failures(
        &mut self,
        origin: Origin,
        location: &'static Location<'static>,
        failures: Vec<SinkWriteError>,
    ) {
        let failed: Vec<SinkKind> = failures.iter().map(|failure| failure.sink).collect();
        for failure in failures {
            let warning = TraceEvent::new(Severity::Warning, origin, location, failure.to_string());
            // Failures while reporting a failure are dropped
            let _ = self.registry.dispatch(&warning, &failed);
        }
    }

    /// Attach a registered sink. The "enabled" event only goes to the sinks that were attached
    /// before this one. Returns `false` if nothing changed.
    #[track_caller]
    pub fn attach(&mut self, kind: SinkKind) -> bool {
        if self.registry.is_attached(kind) || !self.registry.can_attach(kind) {
            return false;
        }

        self.emit(Severity::Debug, format!("{} logging enabled", kind.label()));
        self.registry.attach(kind)
    }

    /// Detach a sink. The "disabled" event goes to the remaining sinks, if there are any. Returns
    /// `false` if the sink wasn't attached.
    #[track_caller]
    pub fn detach(&mut self, kind: SinkKind) -> bool {
        if !self.registry.detach(kind) {
            return false;
        }

        if !self.registry.is_empty() {
            self.emit(Severity::Debug, format!("{} logging disabled", kind.label()));
        }

        true
    }

    /// Detach every sink in reverse attachment order and release their destinations. Emits nothing
    /// except a warning to the sinks still attached when a final flush fails. Safe to call more
    /// than once, but the sinks can't be attached again afterwards.
    #[track_caller]
    pub fn detach_all(&mut self) {
        let location = Location::caller();
        while let Some((kind, released)) = self.registry.detach_last() {
            if let Err(error) = released {
                let failure = SinkWriteError { sink: kind, error };
                self.report_sink_failures(self.current_origin(), location, vec![failure]);
            }
        }

        // Only sinks that were never attached are left, and nothing is attached to hear about them
        let _ = self.registry.detach_all();
    }

    #[track_caller]
    pub fn enable_console(&mut self) -> bool {
        self.attach(SinkKind::Console)
    }

    #[track_caller]
    pub fn disable_console(&mut self) -> bool {
        self.detach(SinkKind::Console)
    }

    #[track_caller]
    pub fn enable_file(&mut self) -> bool {
        self.attach(SinkKind::File)
    }

    #[track_caller]
    pub fn disable_file(&mut self) -> bool {
        self.detach(SinkKind::File)
    }

    /// Log the end of the logs if anything is still listening, then detach and release every
    /// sink.
    #[track_caller]
    pub fn disable_all(&mut self) {
        if !self.registry.is_empty() {
            self.emit(Severity::Debug, "Disabling all logging ...");
            self.emit(Severity::Debug, "=== Ending of Logs ===");
        }
        self.detach_all();
    }

    /// Mark an escalation as started. Returns `true` only for the first caller.
    pub(crate) fn begin_report(&mut self) -> bool {
        !std::mem::replace(&mut self.exception_reported, true)
    }

    pub(crate) fn enter(&mut self, origin: Origin) {
        self.call_stack.push(origin);
    }

    pub(crate) fn leave(&mut self) {
        self.call_stack.pop();
    }
}
