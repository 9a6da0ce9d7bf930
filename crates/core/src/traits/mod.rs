pub mod job_executor;

pub use job_executor::JobExecutor;
