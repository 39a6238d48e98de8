pub mod interval;
pub mod scheduler;

pub use interval::request_interval;
pub use scheduler::{OutgoingScheduler, ResultSink, SchedulerCounters};
