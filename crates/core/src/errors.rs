use thiserror::Error;

/// 运行器错误类型定义
///
/// `InvalidRange` 与 `InvalidTemplate` 属于预检错误，在任何子进程启动之前返回。
/// 单个任务的失败不会出现在这里，而是记录在 `JobResult` 中。
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("无效的区间: start={start} 大于 end={end}")]
    InvalidRange { start: i64, end: i64 },

    #[error("无效的命令模板: 缺少 {{N}} 占位符 - {template}")]
    InvalidTemplate { template: String },

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl RunnerError {
    /// 是否为预检错误（运行开始前即可判定）
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            RunnerError::InvalidRange { .. } | RunnerError::InvalidTemplate { .. }
        )
    }
}

/// 统一的Result类型
pub type RunnerResult<T> = std::result::Result<T, RunnerError>;
