//! CLI command handlers. Each command is in its own file.

mod add;
mod remove;
mod requeue;
mod run;
mod status;
mod watch;

pub use add::run_add;
pub use remove::run_remove;
pub use requeue::run_requeue;
pub use run::run_queue;
pub use status::run_status;
pub use watch::run_watch;
