// End to end runs through a real log directory, covering the traced call sequences a program goes
// through: clean calls, a failing call, nested failures, and a broken setup

use log_scope::{
    origin, wrap, wrap_once, ApplicationError, LifecycleScope, Logger, LoggerBuilder, Origin,
    SetupError, SharedBuffer, SinkKind, WriteMode,
};
use tempfile::TempDir;

fn open_scope(dir: &TempDir) -> (LifecycleScope, SharedBuffer) {
    let console = SharedBuffer::new();
    let scope = LoggerBuilder::new("scenario")
        .log_directory(dir.path())
        .write_mode(WriteMode::Truncate)
        .console_target_writer(console.clone())
        .open()
        .unwrap();

    (scope, console)
}

/// The message column of every event in the log file, ignoring call stack continuation lines.
fn file_messages(scope: &LifecycleScope) -> Vec<String> {
    std::fs::read_to_string(scope.log_file())
        .unwrap()
        .lines()
        .filter(|line| line.matches(" | ").count() >= 2)
        .map(|line| line.splitn(3, " | ").nth(2).unwrap()[25..].trim_start().to_owned())
        .collect()
}

/// The messages emitted between the first `Starting:` of a traced call and the end of the file,
/// skipping the lifecycle bookkeeping before it.
fn traced_messages(scope: &LifecycleScope) -> Vec<String> {
    let messages = file_messages(scope);
    let start = messages
        .iter()
        .position(|m| m.starts_with("Starting:"))
        .unwrap();

    messages[start..].to_vec()
}

#[test]
fn clean_call_logs_start_and_end() {
    let dir = TempDir::new().unwrap();
    let (mut scope, console) = open_scope(&dir);
    let f = wrap(Origin::new("pkg", "f"), |_: &mut Logger, ()| {
        Ok::<_, ApplicationError>(42)
    });

    assert_eq!(f.call(&mut scope, ()).unwrap(), 42);
    assert_eq!(traced_messages(&scope), ["Starting:\tpkg.f", "Ending:\tpkg.f"]);
    assert!(console.contents().is_empty());
}

#[test]
fn failing_call_escalates_then_reraises() {
    let dir = TempDir::new().unwrap();
    let (mut scope, console) = open_scope(&dir);
    let f = wrap(Origin::new("pkg", "f"), |_: &mut Logger, ()| {
        Err::<i32, _>(ApplicationError::new("ValueError", "boom"))
    });

    let error = f.call(&mut scope, ()).unwrap_err();
    assert_eq!(error.message(), "boom");
    assert_eq!(
        traced_messages(&scope),
        [
            "Starting:\tpkg.f",
            "Console logging disabled",
            "ValueError exception within pkg.f:\tboom",
            "Console logging enabled",
            "Log review needed!",
            "Ending:\tpkg.f",
        ]
    );

    // The stack trace follows the error line in the file
    let contents = std::fs::read_to_string(scope.log_file()).unwrap();
    let error_line = contents
        .lines()
        .position(|line| line.ends_with("ValueError exception within pkg.f:\tboom"))
        .unwrap();
    let next = contents.lines().nth(error_line + 1).unwrap();
    assert!(next.matches(" | ").count() < 2, "expected a stack frame, got {next:?}");

    let console = console.contents();
    assert!(!console.contains("boom"));
    assert_eq!(console.matches("[CRITICAL] Log review needed!").count(), 1);
    assert!(console.contains(&scope.log_file().display().to_string()));
    assert!(scope.is_attached(SinkKind::Console));
}

#[test]
fn nested_failure_escalates_exactly_once() {
    for depth in 1..=4 {
        let dir = TempDir::new().unwrap();
        let (mut scope, console) = open_scope(&dir);

        fn descend(logger: &mut Logger, remaining: usize) -> Result<(), ApplicationError> {
            let level = wrap(Origin::new("pkg", "level"), |logger: &mut Logger, remaining: usize| {
                if remaining == 0 {
                    Err(ApplicationError::new("ValueError", "boom"))
                } else {
                    descend(logger, remaining - 1)
                }
            });
            level.call(logger, remaining)
        }

        assert!(descend(&mut scope, depth - 1).is_err());

        let messages = traced_messages(&scope);
        assert_eq!(
            messages.iter().filter(|m| *m == "Log review needed!").count(),
            1
        );
        assert_eq!(
            messages
                .iter()
                .filter(|m| m.starts_with("ValueError exception within"))
                .count(),
            1
        );
        assert_eq!(
            messages.iter().filter(|m| *m == "Starting:\tpkg.level").count(),
            depth
        );
        assert_eq!(
            messages.iter().filter(|m| *m == "Ending:\tpkg.level").count(),
            depth
        );
        assert_eq!(console.contents().matches("Log review needed!").count(), 1);
    }
}

#[test]
fn inner_catch_escalates_before_the_outer_ends() {
    let dir = TempDir::new().unwrap();
    let (mut scope, _) = open_scope(&dir);
    let inner = wrap(Origin::new("pkg", "inner"), |_: &mut Logger, ()| {
        Err::<(), _>(ApplicationError::new("ValueError", "boom"))
    });
    let outer = wrap(Origin::new("pkg", "outer"), |logger: &mut Logger, ()| {
        inner.call(logger, ())
    });

    assert!(outer.call(&mut scope, ()).is_err());
    assert_eq!(
        traced_messages(&scope),
        [
            "Starting:\tpkg.outer",
            "Starting:\tpkg.inner",
            "Console logging disabled",
            "ValueError exception within pkg.inner:\tboom",
            "Console logging enabled",
            "Log review needed!",
            "Ending:\tpkg.inner",
            "Ending:\tpkg.outer",
        ]
    );
}

#[test]
fn business_events_sit_between_start_and_end() {
    let dir = TempDir::new().unwrap();
    let (mut scope, console) = open_scope(&dir);
    let f = wrap(origin!("work"), |logger: &mut Logger, ()| {
        logger.debug("debugging");
        logger.warning("careful");
        Ok::<_, ApplicationError>(())
    });

    f.call(&mut scope, ()).unwrap();
    let messages = traced_messages(&scope);
    assert_eq!(messages.first().unwrap(), "Starting:\tscenarios.work");
    assert_eq!(messages.last().unwrap(), "Ending:\tscenarios.work");
    assert_eq!(&messages[1..3], ["debugging", "careful"]);

    // Only the warning clears the console threshold
    let console = console.contents();
    assert!(console.contains("[WARNING ] careful"));
    assert!(!console.contains("debugging"));
}

#[test]
fn console_toggles_do_not_affect_the_file() {
    let dir = TempDir::new().unwrap();
    let (mut scope, console) = open_scope(&dir);

    scope.disable_console();
    scope.error("file only");
    scope.enable_console();
    scope.disable_file();
    scope.error("console only");
    scope.enable_file();

    let messages = file_messages(&scope);
    assert!(messages.iter().any(|m| m == "file only"));
    assert!(!messages.iter().any(|m| m == "console only"));

    let console = console.contents();
    assert!(console.contains("console only"));
    assert!(!console.contains("file only"));
}

#[test]
fn closing_twice_ends_the_logs_once() {
    let dir = TempDir::new().unwrap();
    let (mut scope, _) = open_scope(&dir);

    scope.close();
    scope.close();
    drop(scope);

    let path = std::fs::read_dir(dir.path())
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let contents = std::fs::read_to_string(path).unwrap();
    assert_eq!(contents.matches("=== Ending of Logs ===").count(), 1);
    assert_eq!(contents.matches("=== Starting of Logs ===").count(), 1);
}

#[test]
fn uncreatable_directory_fails_setup() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();

    let result = LoggerBuilder::new("scenario")
        .log_directory(blocker.join("logs"))
        .open();

    match result {
        Err(SetupError::CreateDirectory { path, .. }) => assert_eq!(path, blocker.join("logs")),
        other => panic!("expected a setup error, got {other:?}"),
    }
    // Nothing was written anywhere
    assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "");
}

#[test]
fn entry_point_failure_is_summarized_and_closes_the_scope() {
    let dir = TempDir::new().unwrap();
    let (mut scope, console) = open_scope(&dir);
    let main = wrap_once(
        Origin::new("app", "main"),
        |logger: &mut Logger, ()| {
            let step = wrap(Origin::new("app", "step"), |_: &mut Logger, ()| {
                Err::<(), _>(ApplicationError::new("AssertionError", "just testing failure"))
            });
            step.call(logger, ())
        },
        false,
    );

    assert_eq!(main.call(&mut scope, ()), None);
    assert!(scope.is_closed());

    let messages = file_messages(&scope);
    let summary = messages
        .iter()
        .position(|m| m == "AssertionError exception forced script to close ...")
        .unwrap();
    assert_eq!(messages[summary + 1], "Ending:\tapp.main");
    assert_eq!(messages.last().unwrap(), "=== Ending of Logs ===");
    assert_eq!(console.contents().matches("Log review needed!").count(), 1);
}

#[test]
fn entry_point_can_leave_closing_to_the_caller() {
    let dir = TempDir::new().unwrap();
    let (mut scope, _) = open_scope(&dir);
    let main = wrap_once(
        Origin::new("app", "main"),
        |_: &mut Logger, ()| Ok::<_, ApplicationError>("done"),
        true,
    );

    assert_eq!(main.call(&mut scope, ()), Some("done"));
    assert!(!scope.is_closed());

    scope.close();
    let messages = file_messages(&scope);
    assert_eq!(messages.iter().filter(|m| *m == "=== Ending of Logs ===").count(), 1);
}

#[test]
fn entry_point_panic_is_summarized_and_closes_the_scope() {
    let dir = TempDir::new().unwrap();
    let (mut scope, console) = open_scope(&dir);
    let main = wrap_once(
        Origin::new("app", "main"),
        |_: &mut Logger, ()| -> Result<(), ApplicationError> { panic!("boom") },
        false,
    );

    assert_eq!(main.call(&mut scope, ()), None);
    assert!(scope.is_closed());

    let messages = file_messages(&scope);
    let summary = messages
        .iter()
        .position(|m| m == "panic exception forced script to close ...")
        .unwrap();
    assert_eq!(messages[summary + 1], "Ending:\tapp.main");
    assert_eq!(messages.last().unwrap(), "=== Ending of Logs ===");
    assert!(!console.contents().contains("boom"));
}

#[inline(never)]
fn parse_header(_: &mut Logger, (): ()) -> Result<(), ApplicationError> {
    panic!("kaboom")
}

#[test]
fn panic_stack_names_the_panicking_function() {
    let dir = TempDir::new().unwrap();
    let (mut scope, _) = open_scope(&dir);
    let parse = wrap(Origin::new("pkg", "parse"), parse_header);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        parse.call(&mut scope, ())
    }));
    assert!(result.is_err());

    let contents = std::fs::read_to_string(scope.log_file()).unwrap();
    let error_line = contents
        .lines()
        .position(|line| line.ends_with("panic exception within pkg.parse:\tkaboom"))
        .unwrap();
    let stack: Vec<&str> = contents
        .lines()
        .skip(error_line + 1)
        .take_while(|line| line.matches(" | ").count() < 2)
        .collect();
    assert!(stack.iter().any(|frame| frame.contains("parse_header")));
}
