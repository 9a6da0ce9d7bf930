use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{RunnerError, RunnerResult};

/// 一次运行的参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// 含 `{N}` 占位符的命令模板
    pub template: String,
    pub start: i64,
    pub end: i64,
    /// 顺序模式下任务之间、并行模式下批次之间的等待秒数
    pub delay_seconds: f64,
    pub parallel: bool,
    /// 仅在 `parallel` 为 true 时生效
    pub max_parallel: usize,
    /// 首个失败后停止派发后续任务
    #[serde(default)]
    pub fail_fast: bool,
}

impl RunConfig {
    pub fn sequential(template: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            template: template.into(),
            start,
            end,
            delay_seconds: 0.0,
            parallel: false,
            max_parallel: 1,
            fail_fast: false,
        }
    }

    pub fn parallel(template: impl Into<String>, start: i64, end: i64, max_parallel: usize) -> Self {
        Self {
            parallel: true,
            max_parallel,
            ..Self::sequential(template, start, end)
        }
    }

    pub fn with_delay(mut self, delay_seconds: f64) -> Self {
        self.delay_seconds = delay_seconds;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// 实际生效的并发上限，顺序模式恒为1
    pub fn effective_max_parallel(&self) -> usize {
        if self.parallel {
            self.max_parallel.max(1)
        } else {
            1
        }
    }

    /// 为0时返回None，表示不做任何等待
    pub fn delay(&self) -> Option<Duration> {
        if self.delay_seconds > 0.0 {
            Duration::try_from_secs_f64(self.delay_seconds).ok()
        } else {
            None
        }
    }

    /// 校验数值参数，区间和模板由 `JobPlan` 负责校验
    pub fn validate(&self) -> RunnerResult<()> {
        if !self.delay_seconds.is_finite() || self.delay_seconds < 0.0 {
            return Err(RunnerError::Configuration(format!(
                "等待时间必须是非负数: {}",
                self.delay_seconds
            )));
        }
        if Duration::try_from_secs_f64(self.delay_seconds).is_err() {
            return Err(RunnerError::Configuration(format!(
                "等待时间超出可表示范围: {}",
                self.delay_seconds
            )));
        }

        if self.parallel && self.max_parallel == 0 {
            return Err(RunnerError::Configuration(
                "最大并行数必须大于0".to_string(),
            ));
        }

        Ok(())
    }
}

/// 运行状态机: IDLE → BUILDING → RUNNING → DRAINING → DONE
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RunState {
    #[serde(rename = "IDLE")]
    Idle,
    #[serde(rename = "BUILDING")]
    Building,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "DRAINING")]
    Draining,
    #[serde(rename = "DONE")]
    Done,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "IDLE",
            RunState::Building => "BUILDING",
            RunState::Running => "RUNNING",
            RunState::Draining => "DRAINING",
            RunState::Done => "DONE",
        }
    }

    /// 状态只能沿固定顺序前进；BUILDING 可直接结束（没有任何任务被派发时）
    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Idle, RunState::Building)
                | (RunState::Building, RunState::Running)
                | (RunState::Building, RunState::Draining)
                | (RunState::Running, RunState::Draining)
                | (RunState::Draining, RunState::Done)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 运行汇总，仅由任务结果推导得出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// 已得到结果的任务数 (succeeded + failed)
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 升序排列
    pub failed_ids: Vec<i64>,
    /// 因 fail-fast 或中断而未派发的任务，升序排列
    pub skipped_ids: Vec<i64>,
    pub wall_time_seconds: f64,
    pub interrupted: bool,
}

impl RunSummary {
    /// 所有任务都已执行且成功
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.skipped_ids.is_empty() && !self.interrupted
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "运行汇总")?;
        writeln!(f, "{}", "-".repeat(50))?;
        writeln!(f, "总任务数: {}", self.total)?;
        writeln!(f, "成功: {}", self.succeeded)?;
        writeln!(f, "失败: {}", self.failed)?;
        if !self.failed_ids.is_empty() {
            writeln!(f, "失败任务: {}", join_ids(&self.failed_ids))?;
        }
        if !self.skipped_ids.is_empty() {
            writeln!(f, "未执行任务: {}", join_ids(&self.skipped_ids))?;
        }
        if self.interrupted {
            writeln!(f, "运行被中断")?;
        }
        write!(f, "耗时: {:.2}秒", self.wall_time_seconds)
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_max_parallel_ignored_when_sequential() {
        let mut config = RunConfig::sequential("echo {N}", 1, 5);
        config.max_parallel = 8;
        assert_eq!(config.effective_max_parallel(), 1);

        let config = RunConfig::parallel("echo {N}", 1, 5, 8);
        assert_eq!(config.effective_max_parallel(), 8);
    }

    #[test]
    fn test_zero_delay_disables_pause() {
        let config = RunConfig::sequential("echo {N}", 1, 5);
        assert!(config.delay().is_none());

        let config = config.with_delay(0.25);
        assert_eq!(config.delay(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        let config = RunConfig::sequential("echo {N}", 1, 5).with_delay(-1.0);
        assert!(config.validate().is_err());

        let config = RunConfig::sequential("echo {N}", 1, 5).with_delay(f64::NAN);
        assert!(config.validate().is_err());

        let config = RunConfig::parallel("echo {N}", 1, 5, 0);
        assert!(config.validate().is_err());

        let config = RunConfig::parallel("echo {N}", 1, 5, 2).with_delay(1.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unrepresentable_delay() {
        let config = RunConfig::sequential("echo {N}", 1, 2).with_delay(1e20);
        assert!(matches!(config.validate(), Err(RunnerError::Configuration(_))));
        assert!(config.delay().is_none());
    }

    #[test]
    fn test_state_transitions() {
        assert!(RunState::Idle.can_transition_to(RunState::Building));
        assert!(RunState::Building.can_transition_to(RunState::Running));
        assert!(RunState::Running.can_transition_to(RunState::Draining));
        assert!(RunState::Draining.can_transition_to(RunState::Done));

        assert!(!RunState::Done.can_transition_to(RunState::Running));
        assert!(!RunState::Idle.can_transition_to(RunState::Done));
        assert!(!RunState::Running.can_transition_to(RunState::Building));
    }

    #[test]
    fn test_summary_rendering_lists_failed_ids() {
        let summary = RunSummary {
            total: 4,
            succeeded: 2,
            failed: 2,
            failed_ids: vec![2, 4],
            skipped_ids: Vec::new(),
            wall_time_seconds: 1.5,
            interrupted: false,
        };

        let rendered = summary.to_string();
        assert!(rendered.contains("总任务数: 4"));
        assert!(rendered.contains("失败任务: 2, 4"));
        assert!(!rendered.contains("未执行任务"));
        assert!(!summary.all_succeeded());
    }

    #[test]
    fn test_all_succeeded() {
        let mut summary = RunSummary {
            total: 3,
            succeeded: 3,
            failed: 0,
            failed_ids: Vec::new(),
            skipped_ids: Vec::new(),
            wall_time_seconds: 0.1,
            interrupted: false,
        };
        assert!(summary.all_succeeded());

        summary.interrupted = true;
        assert!(!summary.all_succeeded());
    }
}
