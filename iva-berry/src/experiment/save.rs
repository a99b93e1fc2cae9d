//! 结果持久化.
//!
//! 所有结果保存在单个 `.npz` 文件中:
//!
//! - `config.npy`: 以 JSON 字节 (`u8`) 保存的完整配置;
//! - `isr_{场景}_{算法}.npy`, `cost_{场景}_{算法}.npy`: `(重复次数, 检查点数)` 的 `f64` 数组;
//! - `failed.npy`: `(失败数, 2)` 的 `u64` 数组, 每行为 `(场景, 重复序号)`.

use super::ExperimentResult;
use crate::config::ExperimentConfig;
use crate::consts::{DATE_FORMAT, RESULT_FILE_SUFFIX};
use chrono::{DateTime, TimeZone};
use ndarray::{Array1, Array2};
use ndarray_npy::{NpzWriter, WriteNpzError};
use std::fmt;
use std::fs::File;
use std::path::Path;

/// 保存结果错误.
#[derive(Debug)]
pub enum SaveError {
    /// 无法创建文件.
    Io(std::io::Error),

    /// 写入 npz 失败.
    Npz(WriteNpzError),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot create result file: {e}"),
            Self::Npz(e) => write!(f, "cannot write npz: {e}"),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Npz(e) => Some(e),
        }
    }
}

impl From<WriteNpzError> for SaveError {
    #[inline]
    fn from(e: WriteNpzError) -> Self {
        Self::Npz(e)
    }
}

/// 结果文件名, 形如 `20200101-120000_experiment_iva_results.npz`.
pub fn default_filename<Tz>(now: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("{}_{RESULT_FILE_SUFFIX}", now.format(DATE_FORMAT))
}

/// 将配置与结果写入 `path`.
pub fn save_npz<P: AsRef<Path>>(
    path: P,
    config: &ExperimentConfig,
    result: &ExperimentResult,
) -> Result<(), SaveError> {
    let file = File::create(path).map_err(SaveError::Io)?;
    let mut npz = NpzWriter::new(file);

    npz.add_array("config", &Array1::from(config.to_json().into_bytes()))?;

    for (s, algo, isr, cost) in result.tables.cells() {
        npz.add_array(format!("isr_{s}_{algo}"), &isr)?;
        npz.add_array(format!("cost_{s}_{algo}"), &cost)?;
    }

    let failed = Array2::from_shape_fn((result.failed.len(), 2), |(i, j)| {
        let f = &result.failed[i];
        (if j == 0 { f.scenario } else { f.repetition }) as u64
    });
    npz.add_array("failed", &failed)?;

    npz.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_default_filename() {
        let t = Utc.with_ymd_and_hms(2020, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            default_filename(t),
            "20200304-050607_experiment_iva_results.npz"
        );
    }
}
