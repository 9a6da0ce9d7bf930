use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use runner_core::config::RunnerDefaults;
use runner_core::{RunConfig, RunnerConfig};
use tracing::warn;

/// 命令行入口
#[derive(Parser, Debug)]
#[command(name = "command-runner")]
#[command(version)]
#[command(about = "按数值区间批量执行命令模板")]
#[command(long_about = "把模板中的 {N} 依次替换为区间内的每个编号并执行，支持顺序与分批并行两种模式")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// 日志级别
    #[arg(short = 'l', long, global = true, value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: Option<String>,

    /// 日志格式
    #[arg(long, global = true, value_parser = ["json", "pretty"])]
    pub log_format: Option<String>,

    /// 日志文件目录
    #[arg(long, global = true)]
    pub log_dir: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 对区间内的每个编号执行一次命令模板
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// 递归执行（必需）
    #[arg(long, required = true)]
    pub recursive: bool,

    /// 分批并行执行
    #[arg(long)]
    pub parallel: bool,

    /// 单个任务超时（秒）
    #[arg(long)]
    pub timeout: Option<f64>,

    /// 出现失败后停止派发剩余任务
    #[arg(long)]
    pub fail_fast: bool,

    /// 不把任务输出转发到终端
    #[arg(short, long)]
    pub quiet: bool,

    /// 运行结束后写入JSON报告
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// 命令模板，必须包含 {N}
    pub template: String,

    /// 起始编号
    #[arg(allow_negative_numbers = true)]
    pub start: i64,

    /// 结束编号（包含）
    #[arg(allow_negative_numbers = true)]
    pub end: i64,

    /// 任务（或批次）之间的等待秒数
    pub delay: Option<f64>,

    /// 最大并行数，仅在 --parallel 时生效
    pub max_parallel: Option<usize>,
}

impl Cli {
    /// 用命令行参数覆盖配置
    pub fn apply_overrides(&self, config: &mut RunnerConfig) -> Result<()> {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.parse()?;
        }
        if let Some(dir) = &self.log_dir {
            config.logging.log_dir = Some(dir.clone());
        }

        let Commands::Run(args) = &self.command;
        if let Some(timeout) = args.timeout {
            config.runner.job_timeout_seconds = Some(timeout);
        }
        if args.quiet {
            config.executor.stream_output = false;
        }

        config.validate()
    }
}

impl RunArgs {
    pub fn to_run_config(&self, defaults: &RunnerDefaults) -> RunConfig {
        if !self.parallel && self.max_parallel.is_some() {
            warn!("未开启 --parallel，忽略 max_parallel 参数");
        }

        RunConfig {
            template: self.template.clone(),
            start: self.start,
            end: self.end,
            delay_seconds: self.delay.unwrap_or(defaults.default_delay_seconds),
            parallel: self.parallel,
            max_parallel: if self.parallel {
                self.max_parallel.unwrap_or(defaults.default_max_parallel)
            } else {
                1
            },
            fail_fast: self.fail_fast || defaults.fail_fast,
        }
    }
}
