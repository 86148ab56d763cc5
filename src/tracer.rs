//! Function tracing. Traced calls log when they start and end, and the first error to cross a
//! traced call gets escalated: the full call stack goes to the file sink only, and a short review
//! notice goes everywhere.

use std::panic::{self, AssertUnwindSafe, Location};

use crate::error::{install_panic_hook, report_for, report_for_panic, Reportable};
use crate::event::{ErrorReport, Origin, TraceEvent};
use crate::logger::Logger;
use crate::scope::LifecycleScope;
use crate::severity::Severity;

/// A function wrapped by [`wrap()`]. The function receives the logger and a single argument,
/// use a tuple to pass more than one value.
#[derive(Debug, Clone)]
pub struct Traced<F> {
    origin: Origin,
    function: F,
}

/// A top level function wrapped by [`wrap_once()`].
#[derive(Debug, Clone)]
pub struct TracedOnce<F> {
    origin: Origin,
    function: F,
    caller_closes: bool,
}

/// Wrap `function` so every call logs `Starting:` and `Ending:` lines and escalates the first
/// error that passes through it. Errors and panics are passed on to the caller unchanged.
pub fn wrap<F, A, T, E>(origin: Origin, function: F) -> Traced<F>
where
    F: Fn(&mut Logger, A) -> Result<T, E>,
    E: Reportable,
{
    Traced { origin, function }
}

/// Wrap an application's entry point. An error or a panic is logged as a one line summary and
/// swallowed, and the scope is closed afterwards unless `caller_closes` is set, in which case
/// closing the scope is left to the caller.
pub fn wrap_once<F, A, T, E>(origin: Origin, function: F, caller_closes: bool) -> TracedOnce<F>
where
    F: Fn(&mut Logger, A) -> Result<T, E>,
    E: Reportable,
{
    TracedOnce {
        origin,
        function,
        caller_closes,
    }
}

impl<F> Traced<F> {
    pub fn origin(&self) -> Origin {
        self.origin
    }

    #[track_caller]
    pub fn call<A, T, E>(&self, logger: &mut Logger, args: A) -> Result<T, E>
    where
        F: Fn(&mut Logger, A) -> Result<T, E>,
        E: Reportable,
    {
        run_traced(logger, self.origin, Location::caller(), |logger| {
            (self.function)(logger, args)
        })
    }
}

impl<F> TracedOnce<F> {
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Run the entry point. Returns `None` if it returned an error or panicked.
    #[track_caller]
    pub fn call<A, T, E>(&self, scope: &mut LifecycleScope, args: A) -> Option<T>
    where
        F: Fn(&mut Logger, A) -> Result<T, E>,
        E: Reportable,
    {
        let location = Location::caller();
        let origin = self.origin;

        install_panic_hook();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            (self.function)(scope.logger_mut(), args)
        }));
        let (result, failure) = match outcome {
            Ok(Ok(value)) => (Some(value), None),
            Ok(Err(error)) => (None, Some(error.kind().into_owned())),
            // Any traced call the panic crossed has already escalated it
            Err(_) => (None, Some(String::from("panic"))),
        };
        if let Some(kind) = failure {
            scope.emit_event(TraceEvent::new(
                Severity::Info,
                origin,
                location,
                format!("{kind} exception forced script to close ..."),
            ));
        }

        scope.emit_event(TraceEvent::new(
            Severity::Debug,
            origin,
            location,
            format!("Ending:\t{origin}"),
        ));
        if !self.caller_closes {
            scope.close();
        }

        result
    }
}

impl Logger {
    /// Run `body` as a traced call right away. Equivalent to `wrap(origin, ...).call(...)` for code
    /// that doesn't need to keep the wrapped function around.
    #[track_caller]
    pub fn trace<T, E, F>(&mut self, origin: Origin, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Logger) -> Result<T, E>,
        E: Reportable,
    {
        run_traced(self, origin, Location::caller(), body)
    }
}

fn run_traced<T, E, F>(
    logger: &mut Logger,
    origin: Origin,
    location: &'static Location<'static>,
    body: F,
) -> Result<T, E>
where
    F: FnOnce(&mut Logger) -> Result<T, E>,
    E: Reportable,
{
    logger.emit_event(TraceEvent::new(
        Severity::Debug,
        origin,
        location,
        format!("Starting:\t{origin}"),
    ));

    install_panic_hook();
    logger.enter(origin);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut *logger)));
    match &outcome {
        Ok(Ok(_)) => (),
        Ok(Err(error)) => escalate(logger, origin, location, || report_for(error)),
        Err(payload) => escalate(logger, origin, location, || {
            report_for_panic(payload.as_ref())
        }),
    }
    logger.leave();

    logger.emit_event(TraceEvent::new(
        Severity::Debug,
        origin,
        location,
        format!("Ending:\t{origin}"),
    ));

    match outcome {
        Ok(result) => result,
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// Report an error, but only if no other error has been reported through this logger yet. The
/// console sink is detached while the call stack is written so the stack only ends up in the log
/// file.
fn escalate(
    logger: &mut Logger,
    origin: Origin,
    location: &'static Location<'static>,
    report: impl FnOnce() -> ErrorReport,
) {
    if !logger.begin_report() {
        return;
    }

    let report = report();
    logger.disable_console();
    logger.emit_event(
        TraceEvent::new(
            Severity::Error,
            origin,
            location,
            format!(
                "{} exception within {origin}:\t{}",
                report.kind, report.description
            ),
        )
        .with_error(report),
    );

    // Only comes back if a console sink was configured in the first place
    logger.enable_console();
    let review = format!(
        "Log review needed!\nBe sure to check your logs:\n{}",
        logger.log_file().display()
    );
    logger.emit_event(TraceEvent::new(
        Severity::Critical,
        origin,
        location,
        review,
    ));
}
