pub mod config;
pub mod orchestrator;
pub mod provider;
pub mod report;

pub use orchestrator::{process_instance, Orchestrator, RunOptions};
pub use provider::Provider;
pub use report::{Action, Failure, InstanceReport, RunReport};
