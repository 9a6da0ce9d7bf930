use std::collections::BTreeSet;
use std::time::Duration;

use runner_core::{JobResult, RunSummary};
use serde::Serialize;
use tracing::warn;

/// 运行报告：汇总加上全部任务结果（按 `id` 升序）
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub summary: RunSummary,
    pub results: Vec<JobResult>,
}

/// 结果汇总器
///
/// 只做计数，不判定整次运行是否成功。由调度器的单一消费路径独占更新，
/// 结果按到达顺序记录（并行模式下可能不是 `id` 顺序）。
#[derive(Debug, Default)]
pub struct ResultAggregator {
    succeeded: usize,
    failed: usize,
    seen_ids: BTreeSet<i64>,
    failed_ids: BTreeSet<i64>,
    skipped_ids: BTreeSet<i64>,
    interrupted: bool,
    results: Vec<JobResult>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: JobResult) {
        if !self.seen_ids.insert(result.id) {
            warn!("忽略重复的任务结果: job_id={}", result.id);
            return;
        }

        if result.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
            self.failed_ids.insert(result.id);
        }
        self.results.push(result);
    }

    /// 记录未被派发的任务
    pub fn record_skipped(&mut self, ids: impl IntoIterator<Item = i64>) {
        self.skipped_ids.extend(ids);
    }

    pub fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn summary(&self, wall_time: Duration) -> RunSummary {
        RunSummary {
            total: self.total(),
            succeeded: self.succeeded,
            failed: self.failed,
            failed_ids: self.failed_ids.iter().copied().collect(),
            skipped_ids: self.skipped_ids.iter().copied().collect(),
            wall_time_seconds: wall_time.as_secs_f64(),
            interrupted: self.interrupted,
        }
    }

    pub fn finish(mut self, run_id: String, wall_time: Duration) -> RunReport {
        let summary = self.summary(wall_time);
        self.results.sort_by_key(|result| result.id);
        RunReport {
            run_id,
            summary,
            results: self.results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use runner_core::JobStatus;

    fn result(id: i64, status: JobStatus) -> JobResult {
        let now = Utc::now();
        JobResult {
            id,
            command: format!("job {id}"),
            exit_code: (status == JobStatus::Success).then_some(0),
            stdout: String::new(),
            stderr: String::new(),
            started_at: now,
            ended_at: now,
            status,
        }
    }

    #[test]
    fn test_failed_ids_sorted_regardless_of_arrival() {
        let mut aggregator = ResultAggregator::new();
        aggregator.record(result(4, JobStatus::Failure));
        aggregator.record(result(1, JobStatus::Success));
        aggregator.record(result(3, JobStatus::Timeout));
        aggregator.record(result(2, JobStatus::SpawnError));

        let summary = aggregator.summary(Duration::from_millis(1500));
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.failed_ids, vec![2, 3, 4]);
        assert_eq!(summary.wall_time_seconds, 1.5);
    }

    #[test]
    fn test_every_non_success_status_counts_as_failed() {
        let mut aggregator = ResultAggregator::new();
        for (id, status) in [
            (1, JobStatus::Failure),
            (2, JobStatus::Timeout),
            (3, JobStatus::SpawnError),
            (4, JobStatus::Cancelled),
        ] {
            aggregator.record(result(id, status));
        }

        let summary = aggregator.summary(Duration::ZERO);
        assert_eq!(summary.failed_ids, vec![1, 2, 3, 4]);
        assert_eq!(summary.succeeded, 0);
    }

    #[test]
    fn test_duplicate_results_are_not_double_counted() {
        let mut aggregator = ResultAggregator::new();
        aggregator.record(result(1, JobStatus::Failure));
        aggregator.record(result(1, JobStatus::Failure));

        let summary = aggregator.summary(Duration::ZERO);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.failed_ids, vec![1]);
    }

    #[test]
    fn test_finish_orders_results_and_keeps_skipped() {
        let mut aggregator = ResultAggregator::new();
        aggregator.record(result(2, JobStatus::Success));
        aggregator.record(result(1, JobStatus::Failure));
        aggregator.record_skipped([5, 3, 4]);
        aggregator.mark_interrupted();

        let report = aggregator.finish("run-1".to_string(), Duration::from_secs(2));
        let ids: Vec<i64> = report.results.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(report.summary.skipped_ids, vec![3, 4, 5]);
        assert!(report.summary.interrupted);
        assert!(!report.summary.all_succeeded());
        assert_eq!(report.run_id, "run-1");
    }
}
