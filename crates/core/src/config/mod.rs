//! 配置管理
//!
//! 加载顺序：默认值 → TOML配置文件 → 环境变量（前缀 `RUNNER_`，层级分隔符 `__`）。
//! 命令行参数的覆盖在二进制中完成。

pub mod models;

pub use models::*;
