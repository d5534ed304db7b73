pub mod agent;
pub mod backoff;
pub mod config;
pub mod rpc;

pub use agent::{Agent, AgentOptions, RunSummary, TaskError};
pub use config::WorkerConfig;
pub use rpc::{CoordinatorRpc, HttpCoordinator};
