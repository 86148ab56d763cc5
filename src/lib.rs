//! A scoped logger with a file sink and a console sink that can be toggled independently, call
//! tracing, and report-once error escalation.
//!
//! ```no_run
//! use log_scope::{origin, wrap, ApplicationError, Logger, LoggerBuilder};
//!
//! let mut scope = LoggerBuilder::new("nightly_job").open()?;
//! let load = wrap(origin!("load"), |logger: &mut Logger, path: String| {
//!     logger.info(format!("Loading {path}"));
//!     Err::<(), _>(ApplicationError::new("NotFound", format!("{path} does not exist")))
//! });
//!
//! // The first failure is written to the log file with its call stack, and a review notice is
//! // printed to the console
//! let _ = load.call(&mut scope, String::from("input.csv"));
//! scope.close();
//! # Ok::<(), log_scope::SetupError>(())
//! ```

mod builder;
mod error;
mod event;
mod logger;
mod scope;
mod severity;
mod sink;
mod target;
mod tracer;

pub use builder::{LoggerBuilder, SetupError};
pub use error::{ApplicationError, Reportable, SinkWriteError};
pub use event::{ErrorReport, Origin, TraceEvent};
pub use logger::Logger;
pub use scope::{LifecycleScope, ScopeState};
pub use severity::{ParseSeverityError, Severity};
pub use sink::{Layout, Sink, SinkKind, SinkRegistry};
pub use target::{ConsoleTarget, SharedBuffer, TargetImpl, WriteMode};
pub use tracer::{wrap, wrap_once, Traced, TracedOnce};

/// The [`Origin`] of the code this is expanded in. Without arguments this names the enclosing
/// function, or pass the function name explicitly.
#[macro_export]
macro_rules! origin {
    () => {{
        fn here() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let path = type_name_of(here);
        $crate::Origin::from_path(path.strip_suffix("::here").unwrap_or(path))
    }};
    ($function:expr) => {
        $crate::Origin::new(::std::module_path!(), $function)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_macro_names_the_enclosing_function() {
        assert_eq!(
            origin!(),
            Origin::new("log_scope::tests", "origin_macro_names_the_enclosing_function")
        );
        assert_eq!(origin!("load"), Origin::new("log_scope::tests", "load"));
    }

    #[test]
    fn origin_macro_inside_closures() {
        let origin = (|| origin!())();
        assert_eq!(origin.function, "origin_macro_inside_closures");
    }
}
