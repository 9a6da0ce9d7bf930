use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单个任务描述：模板中的 `{N}` 已被替换为 `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub id: i64,
    pub command: String,
}

impl JobSpec {
    pub fn new(id: i64, command: impl Into<String>) -> Self {
        Self {
            id,
            command: command.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum JobStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILURE")]
    Failure,
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[serde(rename = "SPAWN_ERROR")]
    SpawnError,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
            JobStatus::Timeout => "TIMEOUT",
            JobStatus::SpawnError => "SPAWN_ERROR",
            JobStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个任务的执行结果，由执行器产生，之后归汇总器所有
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub id: i64,
    pub command: String,
    /// 进程未正常退出（启动失败、超时、取消、被信号终止）时为空
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub status: JobStatus,
}

impl JobResult {
    /// 进程无法启动时的结果
    pub fn spawn_error(job: &JobSpec, started_at: DateTime<Utc>, message: String) -> Self {
        Self {
            id: job.id,
            command: job.command.clone(),
            exit_code: None,
            stdout: String::new(),
            stderr: message,
            started_at,
            ended_at: Utc::now(),
            status: JobStatus::SpawnError,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }

    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }
}
