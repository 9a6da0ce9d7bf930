pub mod app_config;
pub mod observability;
pub mod runner_executor;

pub use app_config::RunnerConfig;
pub use observability::{LogFormat, LoggingConfig};
pub use runner_executor::{ExecutorConfig, RunnerDefaults};
