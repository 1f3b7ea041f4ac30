//! CLI command handlers.

mod progress;
mod run;

pub use progress::run_progress_command;
pub use run::run_harvest_command;
pub use self_test::run_self_test_command;
