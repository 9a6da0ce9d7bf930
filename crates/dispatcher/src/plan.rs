//! 任务描述生成：把命令模板和整数区间展开为有序的 [`JobSpec`] 序列

use std::ops::RangeInclusive;

use runner_core::{JobSpec, RunConfig, RunnerError, RunnerResult};

/// 模板中的替换占位符
pub const PLACEHOLDER: &str = "{N}";

/// 已校验的任务计划
///
/// 不预先生成任务列表；每次调用 [`JobPlan::iter`] 都从 `start` 重新开始。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan {
    template: String,
    start: i64,
    end: i64,
}

impl JobPlan {
    pub fn new(template: impl Into<String>, start: i64, end: i64) -> RunnerResult<Self> {
        let template = template.into();
        if start > end {
            return Err(RunnerError::InvalidRange { start, end });
        }
        if !template.contains(PLACEHOLDER) {
            return Err(RunnerError::InvalidTemplate { template });
        }

        Ok(Self {
            template,
            start,
            end,
        })
    }

    pub fn from_config(config: &RunConfig) -> RunnerResult<Self> {
        Self::new(config.template.clone(), config.start, config.end)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn ids(&self) -> RangeInclusive<i64> {
        self.start..=self.end
    }

    /// 任务数量 `end - start + 1`，超出 `usize` 时取 `usize::MAX`
    pub fn len(&self) -> usize {
        let count = i128::from(self.end) - i128::from(self.start) + 1;
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// 合法计划至少包含一个任务
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 所有 `{N}` 都替换为 `id` 的十进制表示
    pub fn job(&self, id: i64) -> JobSpec {
        JobSpec::new(id, self.template.replace(PLACEHOLDER, &id.to_string()))
    }

    /// 按 `id` 升序惰性生成任务
    pub fn iter(&self) -> impl Iterator<Item = JobSpec> + '_ {
        self.ids().map(move |id| self.job(id))
    }

    /// 按固定大小切分为连续批次，最后一批可能更小
    pub fn batches(&self, size: usize) -> impl Iterator<Item = Vec<JobSpec>> + '_ {
        let size = size.max(1);
        let mut jobs = self.iter();
        std::iter::from_fn(move || {
            let batch: Vec<JobSpec> = jobs.by_ref().take(size).collect();
            (!batch.is_empty()).then_some(batch)
        })
    }
}
