//! 任务执行器接口
//!
//! 调度器只通过 [`JobExecutor`] 与外部进程交互。实现方负责启动进程、
//! 收集输出并返回 [`JobResult`]；任何单任务错误都必须折叠进结果里，
//! 而不是向上传播。

use async_trait::async_trait;

use crate::context::RunContext;
use crate::models::{JobResult, JobSpec};

#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// 执行单个任务
    ///
    /// 实现必须遵守 `context` 中的超时设置，并在收到关闭信号时
    /// 终止子进程，以 `CANCELLED` 状态返回。
    async fn execute(&self, job: &JobSpec, context: &RunContext) -> JobResult;

    /// 执行器名称
    fn name(&self) -> &str;
}
