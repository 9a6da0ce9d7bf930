pub mod config;
pub mod context;
pub mod errors;
pub mod logging;
pub mod models;
pub mod shutdown;
pub mod traits;

pub use config::RunnerConfig;
pub use context::RunContext;
pub use errors::*;
pub use logging::StructuredLogger;
pub use models::{JobResult, JobSpec, JobStatus, RunConfig, RunState, RunSummary};
pub use shutdown::ShutdownManager;
pub use traits::JobExecutor;
