mod books;
mod limits;
mod memberships;
mod samples;
mod transaction;

use crate::{
    books::books,
    limits::limits,
    memberships::memberships,
    samples::{samples, tallies},
};
use log::LevelFilter;
use std::env;
use tabula::{Connection, Registry};
#[cfg(not(feature = "disable-transactions"))]
use transaction::transaction;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Register every mapper of the suite in the global registry, then freeze it.
pub fn register_mappers() {
    books::register();
    limits::register();
    memberships::register();
    samples::register();
    transaction::register();
    Registry::global().freeze();
}

pub fn execute_tests<C: Connection>(mut connection: C) {
    register_mappers();
    books(&mut connection);
    samples(&mut connection);
    tallies(&mut connection);
    limits(&mut connection);
    memberships(&mut connection);
    #[cfg(not(feature = "disable-transactions"))]
    transaction(&mut connection);
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}

/// Run raw statements, the suite creates its own tables.
pub(crate) fn execute_sql<E: tabula::Executor>(executor: &mut E, statements: &[&str]) {
    for sql in statements {
        executor
            .execute(&tabula::Statement::new(*sql))
            .unwrap_or_else(|e| panic!("Failed to execute `{sql}`: {e:#}"));
    }
}
