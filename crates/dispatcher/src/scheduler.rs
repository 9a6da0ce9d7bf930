use std::sync::Arc;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use runner_core::{
    JobExecutor, JobSpec, RunConfig, RunContext, RunState, RunnerError, RunnerResult,
    StructuredLogger,
};
use tracing::{info, warn, Instrument};

use crate::aggregator::{ResultAggregator, RunReport};
use crate::plan::JobPlan;

/// 区间调度器
///
/// 顺序模式等价于批大小为1的并行模式：每批内所有任务并发派发，
/// 整批结束后才进入等待和下一批，因此未完成的执行器调用数永远不超过批大小。
pub struct RangeScheduler {
    executor: Arc<dyn JobExecutor>,
}

impl RangeScheduler {
    pub fn new(executor: Arc<dyn JobExecutor>) -> Self {
        Self { executor }
    }

    /// 执行一次完整运行
    ///
    /// 预检错误（区间、模板、数值参数）在任何任务启动前返回；
    /// 单个任务的失败只会体现在报告中。
    pub async fn run(&self, config: &RunConfig, context: &RunContext) -> RunnerResult<RunReport> {
        if context.state() != RunState::Idle {
            return Err(RunnerError::Internal(format!(
                "运行上下文已被使用: run_id={}, state={}",
                context.run_id(),
                context.state()
            )));
        }
        config.validate()?;

        let span = tracing::info_span!("run", run.id = %context.run_id());
        self.run_plan(config, context).instrument(span).await
    }

    async fn run_plan(&self, config: &RunConfig, context: &RunContext) -> RunnerResult<RunReport> {
        context.transition(RunState::Building);
        let plan = JobPlan::from_config(config)?;
        let batch_size = config.effective_max_parallel().min(plan.len());

        info!(
            "开始运行: template={}, range={}..={}, jobs={}, parallel={}, max_parallel={}, delay={}s, executor={}",
            plan.template(),
            config.start,
            config.end,
            plan.len(),
            config.parallel,
            batch_size,
            config.delay_seconds,
            self.executor.name()
        );

        let mut aggregator = ResultAggregator::new();
        let mut shutdown_rx = context.shutdown().subscribe().await;
        let mut batches = plan.batches(batch_size).peekable();

        while let Some(batch) = batches.next() {
            if context.shutdown().is_shutdown().await {
                warn!("收到关闭信号，停止派发剩余任务");
                aggregator.record_skipped(batch.iter().map(|job| job.id));
                aggregator.record_skipped(batches.by_ref().flatten().map(|job| job.id));
                break;
            }

            if context.state() == RunState::Building {
                context.transition(RunState::Running);
            }
            let is_last = batches.peek().is_none();
            let batch_failed = self
                .run_batch(batch, context, &mut aggregator, is_last)
                .await;
            if is_last {
                break;
            }

            if config.fail_fast && batch_failed {
                warn!("检测到失败任务，fail-fast 已开启，停止派发剩余任务");
                aggregator.record_skipped(batches.by_ref().flatten().map(|job| job.id));
                break;
            }

            if let Some(delay) = config.delay() {
                info!("等待 {:.2} 秒后派发下一批任务", delay.as_secs_f64());
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown_rx.recv() => {
                        info!("等待期间收到关闭信号");
                    }
                }
            }
        }

        if context.shutdown().is_shutdown().await {
            aggregator.mark_interrupted();
        }
        if context.state() != RunState::Draining {
            context.transition(RunState::Draining);
        }
        context.transition(RunState::Done);

        let report = aggregator.finish(context.run_id().to_string(), context.elapsed());
        StructuredLogger::log_run_summary(context.run_id(), &report.summary);
        Ok(report)
    }

    /// 并发派发一批任务并等待全部结束，返回本批是否有失败
    async fn run_batch(
        &self,
        batch: Vec<JobSpec>,
        context: &RunContext,
        aggregator: &mut ResultAggregator,
        is_last: bool,
    ) -> bool {
        let mut in_flight = FuturesUnordered::new();
        for job in batch {
            StructuredLogger::log_job_dispatched(context.run_id(), job.id, &job.command, Utc::now());
            let executor = Arc::clone(&self.executor);
            in_flight.push(async move { executor.execute(&job, context).await });
        }
        if is_last {
            context.transition(RunState::Draining);
        }

        // 单一消费者：结果按完成顺序逐个写入汇总器
        let mut batch_failed = false;
        while let Some(result) = in_flight.next().await {
            StructuredLogger::log_job_resolved(context.run_id(), &result);
            batch_failed |= !result.is_success();
            aggregator.record(result);
        }
        batch_failed
    }
}
