//! 从环境变量读取实验设置.

use crate::cpus;
use iva_berry::config::{ConfigError, ExperimentConfig};
use log::{info, warn};
use std::env;
use std::path::PathBuf;

/// 配置文件路径的环境变量.
pub const CONFIG_VAR: &str = "IVA_CONFIG";

/// 结果目录的环境变量.
pub const OUTPUT_DIR_VAR: &str = "IVA_OUTPUT_DIR";

/// worker 数的环境变量.
pub const WORKERS_VAR: &str = "IVA_WORKERS";

/// 日志级别的环境变量.
pub const LOG_VAR: &str = "IVA_LOG";

/// 获取实验配置.
///
/// 1. 若环境变量 `$IVA_CONFIG` 非空, 则从该 JSON 文件读取;
/// 2. 否则, 返回默认配置.
pub fn config_from_env_or_default() -> Result<ExperimentConfig, ConfigError> {
    match env::var(CONFIG_VAR) {
        Ok(p) if !p.is_empty() => {
            info!("Loading config from {p}");
            ExperimentConfig::from_json_file(p)
        }
        _ => Ok(ExperimentConfig::default()),
    }
}

/// 获取结果目录.
///
/// 1. 若环境变量 `$IVA_OUTPUT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `./data`.
pub fn output_dir_from_env_or_default() -> PathBuf {
    match env::var(OUTPUT_DIR_VAR) {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => PathBuf::from("data"),
    }
}

/// 获取 worker 数.
///
/// 1. 若环境变量 `$IVA_WORKERS` 为正整数, 则返回其值;
/// 2. 否则, 返回可并行核心数.
pub fn workers_from_env_or_cpus() -> usize {
    match env::var(WORKERS_VAR) {
        Ok(s) => match s.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                warn!("Ignoring invalid ${WORKERS_VAR}={s:?}");
                cpus()
            }
        },
        Err(_) => cpus(),
    }
}

/// 获取日志级别, 默认为 `Info`.
pub fn log_level_from_env() -> log::LevelFilter {
    env::var(LOG_VAR)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(log::LevelFilter::Info)
}
