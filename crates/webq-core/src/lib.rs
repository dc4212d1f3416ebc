pub mod config;
pub mod logging;

pub mod encoder;
pub mod event;
pub mod probe;
pub mod request;
pub mod retry;
pub mod scheduler;
pub mod transport;

pub use event::{FailureKind, Outcome, RequestEvent};
pub use request::{CachePolicy, Priority, RequestDescriptor, Target, Verb};
pub use scheduler::{Scheduler, SchedulerClosed, SchedulerOptions};
