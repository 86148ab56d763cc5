use log_scope::{LoggerBuilder, Severity};

fn main() {
    // `LOG_SCOPE_DIR` and `LOG_SCOPE_CONSOLE` can be used to redirect the output without
    // recompiling
    let mut scope = LoggerBuilder::new("basic_demo")
        .console_floor(Severity::Info)
        .from_environment()
        .open()
        // Without a log file there is nothing useful this demo can do
        .expect("Could not set up logging");

    // Depending on the floors chosen above some of these messages only show up in the log file
    scope.debug("This is a debug message, only written to the log file by default");
    scope.info("This is a regular log message");
    scope.warning("This is a warning");
    scope.error("This is an error");
    scope.critical("This is critical");

    eprintln!("Logs written to '{}'", scope.log_file().display());
}
