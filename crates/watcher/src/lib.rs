pub mod cli;
pub mod orchestrator;

pub use orchestrator::{Orchestrator, RunReport};
