//! # 数据模型
//!
//! - [`JobSpec`] - 单个任务描述，由 `JobPlan` 生成
//! - [`JobResult`] - 单个任务的执行结果
//! - [`RunConfig`] - 一次运行的参数
//! - [`RunSummary`] - 运行汇总
//! - [`RunState`] - 运行状态机
//!
//! ```text
//! IDLE → BUILDING → RUNNING → DRAINING → DONE
//! ```

pub mod job;
pub mod run;

pub use job::*;
pub use run::*;
