//! Errors that pass through traced calls, and the tagging trait that makes them reportable.

use once_cell::sync::Lazy;
use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::cell::RefCell;
use std::error::Error;
use std::fmt::Display;
use std::panic;

use crate::event::ErrorReport;
use crate::sink::SinkKind;

/// An error type that can cross a traced call. The kind label is what shows up in the escalation
/// events, e.g. `ValueError exception within app.load: bad input`.
pub trait Reportable: Display {
    /// A short label naming what kind of error this is.
    fn kind(&self) -> Cow<'_, str>;

    /// The call stack captured when the error was created, if any. When this returns `None` the
    /// tracer captures the stack at the point where it catches the error instead.
    fn backtrace(&self) -> Option<&Backtrace> {
        None
    }
}

/// A general purpose error for traced functions, tagged with an explicit kind label. The call
/// stack is captured on construction regardless of `RUST_BACKTRACE`.
#[derive(Debug)]
pub struct ApplicationError {
    kind: Cow<'static, str>,
    message: String,
    backtrace: Backtrace,
}

impl ApplicationError {
    pub fn new(kind: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            backtrace: Backtrace::force_capture(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Error for ApplicationError {}

impl Display for ApplicationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Reportable for ApplicationError {
    fn kind(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.kind)
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        Some(&self.backtrace)
    }
}

impl Reportable for std::io::Error {
    fn kind(&self) -> Cow<'_, str> {
        Cow::Owned(format!("io::{:?}", std::io::Error::kind(self)))
    }
}

impl Reportable for Box<dyn Error + Send + Sync> {
    fn kind(&self) -> Cow<'_, str> {
        Cow::Borrowed("Error")
    }
}

/// Build the report attached to the escalation event for `error`.
pub(crate) fn report_for<E: Reportable + ?Sized>(error: &E) -> ErrorReport {
    let stack = match error.backtrace() {
        Some(backtrace) => backtrace.to_string(),
        None => Backtrace::force_capture().to_string(),
    };

    ErrorReport {
        kind: error.kind().into_owned(),
        description: error.to_string(),
        stack,
    }
}

thread_local! {
    /// The call stack of the last panic on this thread. It has to be captured by the panic hook,
    /// by the time `catch_unwind()` returns the panicking frames are gone.
    static PANIC_BACKTRACE: RefCell<Option<Backtrace>> = RefCell::new(None);
}

/// Runs the previously installed hook after recording the panicking call stack.
static PANIC_HOOK: Lazy<()> = Lazy::new(|| {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        // Fails only while the thread's locals are being torn down
        let _ = PANIC_BACKTRACE.try_with(|slot| {
            if let Ok(mut slot) = slot.try_borrow_mut() {
                *slot = Some(Backtrace::force_capture());
            }
        });
        previous(info);
    }));
});

/// Make sure panics record their call stack. Installing the hook only happens once per process.
pub(crate) fn install_panic_hook() {
    Lazy::force(&PANIC_HOOK);
}

/// Build a report for a panic payload caught while unwinding through a traced call. Uses the call
/// stack recorded when the panic started, or the current one if the panic hook wasn't installed.
pub(crate) fn report_for_panic(payload: &(dyn std::any::Any + Send)) -> ErrorReport {
    let description = if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("<non-string panic payload>")
    };

    ErrorReport {
        kind: String::from("panic"),
        description,
        stack: take_panic_backtrace()
            .unwrap_or_else(Backtrace::force_capture)
            .to_string(),
    }
}

fn take_panic_backtrace() -> Option<Backtrace> {
    PANIC_BACKTRACE
        .try_with(|slot| slot.try_borrow_mut().ok().and_then(|mut slot| slot.take()))
        .ok()
        .flatten()
}

/// A sink failed to write an event. This never leaves the facade, it's only turned into a warning
/// for the remaining sinks.
#[derive(Debug)]
pub struct SinkWriteError {
    pub sink: SinkKind,
    pub error: std::io::Error,
}

impl Error for SinkWriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

impl Display for SinkWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "The {} sink could not write an event ({})", self.sink, self.error)
    }
}
