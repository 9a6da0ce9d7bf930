use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use runner_core::{RunConfig, RunContext, RunSummary, RunnerConfig, ShutdownManager};
use runner_dispatcher::{JobPlan, RangeScheduler, RunReport};
use runner_worker::ShellExecutor;
use tracing::info;

/// 全部任务成功
pub const EXIT_SUCCESS: u8 = 0;
/// 存在失败、未执行的任务或运行被中断
pub const EXIT_JOBS_FAILED: u8 = 1;
/// 预检或配置错误，没有任何任务被执行
pub const EXIT_PREFLIGHT: u8 = 2;

/// 根据汇总决定进程退出码
pub fn exit_code_for(summary: &RunSummary) -> u8 {
    if summary.all_succeeded() {
        EXIT_SUCCESS
    } else {
        EXIT_JOBS_FAILED
    }
}

/// 应用程序：把配置、执行器和调度器组装起来完成一次运行
pub struct Application {
    config: RunnerConfig,
    shutdown: ShutdownManager,
}

impl Application {
    pub fn new(config: RunnerConfig, shutdown: ShutdownManager) -> Self {
        Self { config, shutdown }
    }

    pub async fn run(&self, run_config: &RunConfig, report_path: Option<&Path>) -> Result<RunReport> {
        // 预检通过后才打印横幅，失败时不会有任何输出或子进程
        run_config.validate()?;
        let plan = JobPlan::from_config(run_config)?;
        print!("{}", banner(run_config, &plan));

        let context = RunContext::new(self.shutdown.clone()).with_job_timeout(self.config.job_timeout());
        info!("运行ID: {}", context.run_id());

        let executor = Arc::new(ShellExecutor::new(self.config.executor.clone()));
        let scheduler = RangeScheduler::new(executor);
        let report = scheduler.run(run_config, &context).await?;

        println!("\n{}", report.summary);

        if let Some(path) = report_path {
            write_report(&report, path)?;
            info!("运行报告已写入: {}", path.display());
        }

        Ok(report)
    }
}

/// 运行横幅，并行数与调度器实际使用的批大小一致
fn banner(run_config: &RunConfig, plan: &JobPlan) -> String {
    let mut text = format!(
        "\n按区间执行命令: {} 到 {}\n命令模板: {}\n命令间等待: {} 秒\n",
        run_config.start,
        run_config.end,
        plan.template(),
        run_config.delay_seconds
    );
    if run_config.parallel {
        let batch_size = run_config.effective_max_parallel().min(plan.len());
        text.push_str(&format!("并行执行: 开启 (最多同时 {batch_size} 个)\n"));
    } else {
        text.push_str("并行执行: 关闭\n");
    }
    text
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("序列化运行报告失败")?;
    std::fs::write(path, json).with_context(|| format!("写入运行报告失败: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(failed: usize, skipped: Vec<i64>, interrupted: bool) -> RunSummary {
        RunSummary {
            total: 3,
            succeeded: 3 - failed,
            failed,
            failed_ids: (1..=failed as i64).collect(),
            skipped_ids: skipped,
            wall_time_seconds: 0.0,
            interrupted,
        }
    }

    #[test]
    fn test_exit_code_policy() {
        assert_eq!(exit_code_for(&summary(0, vec![], false)), EXIT_SUCCESS);
        assert_eq!(exit_code_for(&summary(1, vec![], false)), EXIT_JOBS_FAILED);
        assert_eq!(exit_code_for(&summary(0, vec![4], false)), EXIT_JOBS_FAILED);
        assert_eq!(exit_code_for(&summary(0, vec![], true)), EXIT_JOBS_FAILED);
    }

    #[test]
    fn test_banner_reports_clamped_parallelism() {
        let config = RunConfig::parallel("echo {N}", 1, 2, 8);
        let plan = JobPlan::from_config(&config).unwrap();
        let text = banner(&config, &plan);
        assert!(text.contains("最多同时 2 个"), "{text}");

        let config = RunConfig::sequential("echo {N}", 1, 2);
        let plan = JobPlan::from_config(&config).unwrap();
        assert!(banner(&config, &plan).contains("并行执行: 关闭"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_application_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("report.json");

        let mut config = RunnerConfig::default();
        config.executor.stream_output = false;
        let app = Application::new(config, ShutdownManager::new());

        let report = app
            .run(&RunConfig::parallel("echo {N}", 1, 3, 2), Some(&report_path))
            .await
            .unwrap();
        assert_eq!(report.summary.succeeded, 3);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(written["summary"]["total"], 3);
        assert_eq!(written["results"][0]["status"], "SUCCESS");
        assert_eq!(written["results"][2]["stdout"], "3\n");
    }
}
