//! Command implementations for injector-cli

pub mod apply;
pub mod check;
pub mod watch;

pub use apply::run_apply;
pub use check::{run_check, run_drift_check};
pub use watch::run_watch;
