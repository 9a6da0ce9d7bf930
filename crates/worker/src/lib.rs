pub mod executors;
pub mod output;

pub use executors::ShellExecutor;
pub use output::{CaptureBuffer, OutputTee, StreamTarget};
