use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::{observability::LoggingConfig, runner_executor::{ExecutorConfig, RunnerDefaults}};

/// 默认配置文件查找路径
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["config/runner.toml", "runner.toml"];

/// 运行器配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub runner: RunnerDefaults,
    pub executor: ExecutorConfig,
    pub logging: LoggingConfig,
}

impl RunnerConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Default configuration
    /// 2. Config file (TOML format)
    /// 3. Environment variable overrides (prefix: RUNNER_, nesting: `__`)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if !Path::new(path).exists() {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        // 环境变量覆盖，优先级最高
        builder = builder.add_source(
            Environment::with_prefix("RUNNER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: RunnerConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: RunnerConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> Result<()> {
        self.runner.validate().context("运行默认值验证失败")?;
        self.executor.validate().context("执行器配置验证失败")?;
        self.logging.validate().context("日志配置验证失败")?;
        Ok(())
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.runner
            .job_timeout_seconds
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.runner.default_max_parallel, 3);
        assert_eq!(config.runner.default_delay_seconds, 0.0);
        assert!(config.job_timeout().is_none());
        assert!(config.executor.stream_output);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RunnerConfig::from_toml(
            r#"
            [runner]
            default_max_parallel = 8
            job_timeout_seconds = 2.5

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.runner.default_max_parallel, 8);
        assert_eq!(config.job_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.executor, ExecutorConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(RunnerConfig::from_toml("[runner]\ndefault_max_parallel = 0").is_err());
        assert!(RunnerConfig::from_toml("[runner]\njob_timeout_seconds = 0.0").is_err());
        assert!(RunnerConfig::from_toml("[logging]\nlevel = \"loud\"").is_err());
        assert!(RunnerConfig::from_toml("[executor]\nshell = \"  \"").is_err());
    }

    #[test]
    fn test_huge_durations_are_rejected() {
        assert!(RunnerConfig::from_toml("[runner]\njob_timeout_seconds = 1e20").is_err());
        assert!(RunnerConfig::from_toml("[runner]\ndefault_delay_seconds = 1e20").is_err());

        let mut config = RunnerConfig::default();
        config.runner.job_timeout_seconds = Some(1e20);
        assert!(config.validate().is_err());
        assert_eq!(config.job_timeout(), None);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = RunnerConfig::default();
        config.runner.fail_fast = true;
        config.logging.log_dir = Some("logs".to_string());

        let text = config.to_toml().unwrap();
        let parsed = RunnerConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[runner]\ndefault_delay_seconds = 1.5\nfail_fast = true").unwrap();

        let config = RunnerConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.runner.default_delay_seconds, 1.5);
        assert!(config.runner.fail_fast);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = RunnerConfig::load(Some("/definitely/not/here/runner.toml"));
        assert!(result.is_err());
    }
}
