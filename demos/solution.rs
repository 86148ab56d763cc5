use log_scope::{origin, wrap, wrap_once, ApplicationError, Logger, LoggerBuilder, WriteMode};

fn debug_test(logger: &mut Logger) -> Result<(), ApplicationError> {
    logger.trace(origin!(), |logger| {
        logger.debug("TEST:\tDebug function");
        Ok(())
    })
}

fn info_test(logger: &mut Logger) -> Result<(), ApplicationError> {
    logger.trace(origin!(), |logger| {
        logger.info("TEST:\tInfo function");
        logger.warning("Testing warning message ...");
        Ok(())
    })
}

fn crit_test(logger: &mut Logger) -> Result<(), ApplicationError> {
    logger.trace(origin!(), |logger| {
        logger.info("Final test - a failure!");
        logger.critical("TEST:\tCritical function - about to fail ...");

        Err(ApplicationError::new(
            "AssertionError",
            "Just testing failure! Does it still finish the solution wrapper?",
        ))
    })
}

fn main() {
    let mut scope = LoggerBuilder::new("solution_demo")
        .write_mode(WriteMode::Truncate)
        .from_environment()
        .open()
        .expect("Could not set up logging");

    let run = wrap(origin!("run"), |logger: &mut Logger, ()| {
        logger.info("Here we go!");
        debug_test(logger)?;
        info_test(logger)?;
        crit_test(logger)
    });
    let solution = wrap_once(origin!("main"), |logger: &mut Logger, ()| run.call(logger, ()), false);

    // The failure is logged and summarized, and the scope is closed by the wrapper
    if solution.call(&mut scope, ()).is_none() {
        std::process::exit(1);
    }
}
