use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use runner_core::config::ExecutorConfig;
use runner_core::{JobExecutor, JobResult, JobSpec, JobStatus, RunContext};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::output::{CaptureBuffer, OutputTee, StreamTarget};

/// 子进程的结束方式
enum ProcessOutcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Shell任务执行器
///
/// 命令字符串原样交给 `shell shell_arg <command>`，不做任何解析或转义。
/// 在unix上每个任务独占一个进程组，超时或取消时整组终止。
pub struct ShellExecutor {
    config: ExecutorConfig,
}

impl ShellExecutor {
    /// 创建新的Shell执行器
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, job: &JobSpec) -> Command {
        let mut std_cmd = std::process::Command::new(&self.config.shell);
        std_cmd.arg(&self.config.shell_arg);

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            std_cmd.raw_arg(&job.command);
        }
        #[cfg(not(windows))]
        std_cmd.arg(&job.command);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_cmd.process_group(0);
        }

        let mut cmd = Command::from(std_cmd);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_reader(
        &self,
        job_id: i64,
        target: StreamTarget,
        reader: Option<impl tokio::io::AsyncRead + Unpin + Send + 'static>,
        buffer: &CaptureBuffer,
    ) -> Option<JoinHandle<()>> {
        let tee = OutputTee::new(job_id, target, self.config.stream_output, buffer.clone());
        reader.map(|reader| {
            tokio::spawn(async move {
                if let Err(e) = tee.pump(reader).await {
                    warn!("读取任务输出失败: job_id={}, stream={:?}, error={}", job_id, target, e);
                }
            })
        })
    }

    /// 等待输出读取结束；超过宽限时间说明还有后台进程占用管道，整组清理
    async fn drain_readers(&self, job_id: i64, pid: Option<u32>, readers: Vec<JoinHandle<()>>) {
        let grace = Duration::from_millis(self.config.kill_grace_ms);
        for mut reader in readers {
            if tokio::time::timeout(grace, &mut reader).await.is_err() {
                warn!("任务输出管道未关闭，终止残留进程: job_id={}", job_id);
                if let Some(pid) = pid {
                    kill_process_group(pid).await;
                }
                if tokio::time::timeout(grace, &mut reader).await.is_err() {
                    reader.abort();
                }
            }
        }
    }
}

#[async_trait]
impl JobExecutor for ShellExecutor {
    async fn execute(&self, job: &JobSpec, context: &RunContext) -> JobResult {
        let started_at = Utc::now();
        let mut shutdown_rx = context.shutdown().subscribe().await;

        debug!("执行Shell任务: job_id={}, command={}", job.id, job.command);

        let mut child = match self.build_command(job).spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("启动Shell命令失败: job_id={}, error={}", job.id, e);
                return JobResult::spawn_error(job, started_at, format!("启动Shell命令失败: {e}"));
            }
        };
        let pid = child.id();

        let stdout_buf = CaptureBuffer::new();
        let stderr_buf = CaptureBuffer::new();
        let readers: Vec<JoinHandle<()>> = [
            self.spawn_reader(job.id, StreamTarget::Stdout, child.stdout.take(), &stdout_buf),
            self.spawn_reader(job.id, StreamTarget::Stderr, child.stderr.take(), &stderr_buf),
        ]
        .into_iter()
        .flatten()
        .collect();

        let outcome = tokio::select! {
            status = child.wait() => ProcessOutcome::Exited(status),
            _ = wait_timeout(context.job_timeout()) => ProcessOutcome::TimedOut,
            _ = shutdown_rx.recv() => ProcessOutcome::Cancelled,
        };

        if !matches!(outcome, ProcessOutcome::Exited(_)) {
            terminate(&mut child, pid).await;
        }
        self.drain_readers(job.id, pid, readers).await;

        let mut stderr = stderr_buf.contents();
        let (status, exit_code) = match outcome {
            ProcessOutcome::Exited(Ok(exit_status)) if exit_status.success() => {
                (JobStatus::Success, exit_status.code())
            }
            ProcessOutcome::Exited(Ok(exit_status)) => (JobStatus::Failure, exit_status.code()),
            ProcessOutcome::Exited(Err(e)) => {
                error!("等待进程结束失败: job_id={}, error={}", job.id, e);
                stderr.push_str(&format!("等待进程结束失败: {e}"));
                (JobStatus::Failure, None)
            }
            ProcessOutcome::TimedOut => {
                warn!("任务执行超时，已终止: job_id={}, timeout={:?}", job.id, context.job_timeout());
                (JobStatus::Timeout, None)
            }
            ProcessOutcome::Cancelled => {
                info!("任务因运行关闭被取消: job_id={}", job.id);
                (JobStatus::Cancelled, None)
            }
        };

        JobResult {
            id: job.id,
            command: job.command.clone(),
            exit_code,
            stdout: stdout_buf.contents(),
            stderr,
            started_at,
            ended_at: Utc::now(),
            status,
        }
    }

    fn name(&self) -> &str {
        "shell"
    }
}

async fn wait_timeout(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}

/// 终止子进程及其所在进程组，并回收子进程
async fn terminate(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid {
        kill_process_group(pid).await;
    }
    // 进程可能已经退出
    if let Err(e) = child.start_kill() {
        debug!("终止子进程: {}", e);
    }
    if let Err(e) = child.wait().await {
        warn!("回收子进程失败: pid={:?}, error={}", pid, e);
    }
}

#[cfg(unix)]
async fn kill_process_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    // 子进程以 process_group(0) 启动，进程组ID等于其pid
    let Ok(raw) = i32::try_from(pid) else {
        error!("进程ID超出范围，无法终止进程组: pid={}", pid);
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => debug!("已终止进程组: pgid={}", pid),
        Err(Errno::ESRCH) => debug!("进程组已不存在: pgid={}", pid),
        Err(e) => error!("终止进程组失败: pgid={}, error={}", pid, e),
    }
}

#[cfg(windows)]
async fn kill_process_group(pid: u32) {
    let pid_arg = pid.to_string();
    match Command::new("taskkill")
        .args(["/PID", pid_arg.as_str(), "/T", "/F"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        Ok(status) if status.success() => debug!("已终止进程树: pid={}", pid),
        Ok(_) => debug!("进程树已不存在: pid={}", pid),
        Err(e) => error!("执行taskkill命令失败: pid={}, error={}", pid, e),
    }
}
