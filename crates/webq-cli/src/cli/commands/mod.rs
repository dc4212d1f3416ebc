//! CLI command handlers. Each command is in its own file.

mod batch;
mod probe;
mod run;
mod send;

pub use batch::run_batch;
pub use probe::run_probe;
pub use send::{run_send, SendArgs};
