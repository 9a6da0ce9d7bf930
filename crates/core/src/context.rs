use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::warn;
use uuid::Uuid;

use crate::logging::StructuredLogger;
use crate::models::RunState;
use crate::shutdown::ShutdownManager;

/// 运行级上下文
///
/// 一次运行的所有共享状态都挂在这里并显式传递给各组件：
/// 运行ID、状态机、起始时间、关闭信号、单任务超时。克隆开销很小。
#[derive(Clone)]
pub struct RunContext {
    run_id: Uuid,
    shutdown: ShutdownManager,
    job_timeout: Option<Duration>,
    inner: Arc<Mutex<RunProgress>>,
}

#[derive(Debug)]
struct RunProgress {
    state: RunState,
    building_at: Option<Instant>,
    done_at: Option<Instant>,
}

impl RunContext {
    pub fn new(shutdown: ShutdownManager) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            shutdown,
            job_timeout: None,
            inner: Arc::new(Mutex::new(RunProgress {
                state: RunState::Idle,
                building_at: None,
                done_at: None,
            })),
        }
    }

    pub fn with_job_timeout(mut self, job_timeout: Option<Duration>) -> Self {
        self.job_timeout = job_timeout;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn shutdown(&self) -> &ShutdownManager {
        &self.shutdown
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout
    }

    pub fn state(&self) -> RunState {
        self.lock().state
    }

    /// 推进状态机，非法跳转会被拒绝并返回false
    pub fn transition(&self, next: RunState) -> bool {
        let mut progress = self.lock();
        let current = progress.state;
        if !current.can_transition_to(next) {
            warn!(
                "拒绝非法的运行状态跳转: run_id={}, {} -> {}",
                self.run_id, current, next
            );
            return false;
        }

        let now = Instant::now();
        match next {
            RunState::Building => progress.building_at = Some(now),
            RunState::Done => progress.done_at = Some(now),
            _ => {}
        }
        progress.state = next;
        drop(progress);

        StructuredLogger::log_run_state_changed(self.run_id, current, next);
        true
    }

    /// 从进入 BUILDING 到进入 DONE 的耗时；运行未结束时按当前时间计算
    pub fn elapsed(&self) -> Duration {
        let progress = self.lock();
        match progress.building_at {
            Some(start) => progress.done_at.unwrap_or_else(Instant::now) - start,
            None => Duration::ZERO,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RunProgress> {
        // 锁内不会panic，中毒时沿用内部数据
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
