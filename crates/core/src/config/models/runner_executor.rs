use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 运行默认值，命令行未给出时使用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerDefaults {
    pub default_delay_seconds: f64,
    pub default_max_parallel: usize,
    /// 单个任务超时（秒），为空表示不限制
    pub job_timeout_seconds: Option<f64>,
    pub fail_fast: bool,
}

impl Default for RunnerDefaults {
    fn default() -> Self {
        Self {
            default_delay_seconds: 0.0,
            default_max_parallel: 3,
            job_timeout_seconds: None,
            fail_fast: false,
        }
    }
}

impl RunnerDefaults {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.default_delay_seconds.is_finite() || self.default_delay_seconds < 0.0 {
            return Err(anyhow::anyhow!(
                "默认等待时间必须是非负数: {}",
                self.default_delay_seconds
            ));
        }
        if Duration::try_from_secs_f64(self.default_delay_seconds).is_err() {
            return Err(anyhow::anyhow!(
                "默认等待时间超出可表示范围: {}",
                self.default_delay_seconds
            ));
        }

        if self.default_max_parallel == 0 {
            return Err(anyhow::anyhow!("默认最大并行数必须大于0"));
        }

        if let Some(timeout) = self.job_timeout_seconds {
            if !timeout.is_finite() || timeout <= 0.0 {
                return Err(anyhow::anyhow!("任务超时时间必须大于0: {}", timeout));
            }
            if Duration::try_from_secs_f64(timeout).is_err() {
                return Err(anyhow::anyhow!("任务超时时间超出可表示范围: {}", timeout));
            }
        }

        Ok(())
    }
}

/// 进程执行器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// 用于解释命令字符串的shell程序
    pub shell: String,
    pub shell_arg: String,
    /// 是否把子进程输出实时转发到终端
    pub stream_output: bool,
    /// 终止进程组后等待输出管道关闭的时间（毫秒）
    pub kill_grace_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        #[cfg(windows)]
        let (shell, shell_arg) = ("cmd", "/C");
        #[cfg(not(windows))]
        let (shell, shell_arg) = ("sh", "-c");

        Self {
            shell: shell.to_string(),
            shell_arg: shell_arg.to_string(),
            stream_output: true,
            kill_grace_ms: 1000,
        }
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.shell.trim().is_empty() {
            return Err(anyhow::anyhow!("shell程序不能为空"));
        }

        Ok(())
    }
}
