use std::fs::{self, File};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use command_runner::app::{exit_code_for, Application, EXIT_PREFLIGHT};
use command_runner::cli::{Cli, Commands};
use runner_core::config::{LogFormat, LoggingConfig};
use runner_core::{RunnerConfig, RunnerError, ShutdownManager};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            match e.downcast_ref::<RunnerError>() {
                Some(err) if err.is_preflight() => error!("预检失败，未启动任何任务: {err}"),
                _ => error!("运行失败: {e:#}"),
            }
            eprintln!("错误: {e:#}");
            ExitCode::from(EXIT_PREFLIGHT)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    // 加载配置并应用命令行覆盖
    let mut config = RunnerConfig::load(cli.config.as_deref()).context("加载配置失败")?;
    cli.apply_overrides(&mut config)?;

    init_logging(&config.logging)?;

    let Commands::Run(args) = &cli.command;
    let run_config = args.to_run_config(&config.runner);

    info!("启动命令调度器");
    if let Some(path) = &cli.config {
        info!("配置文件: {path}");
    }

    let shutdown_manager = ShutdownManager::new();
    let signal_handle = {
        let shutdown_manager = shutdown_manager.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            warn!("收到关闭信号，停止派发并终止运行中的任务...");
            shutdown_manager.shutdown().await;
        })
    };

    let app = Application::new(config, shutdown_manager);
    let result = app.run(&run_config, args.report.as_deref()).await;
    signal_handle.abort();

    let report = result?;
    info!("命令调度器已退出");
    Ok(exit_code_for(&report.summary))
}

/// 初始化日志系统
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = match &logging.log_dir {
        Some(dir) => {
            let file = open_log_file(Path::new(dir))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let console_layer = match logging.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("初始化日志系统失败")?;

    Ok(())
}

/// 在日志目录中创建带时间戳的日志文件
fn open_log_file(dir: &Path) -> Result<File> {
    fs::create_dir_all(dir).with_context(|| format!("创建日志目录失败: {}", dir.display()))?;
    let name = format!(
        "command_runner_{}.log",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(name);
    File::create(&path).with_context(|| format!("创建日志文件失败: {}", path.display()))
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
