//! 运行时错误.

use crate::metric::MetricError;
use std::fmt;

/// 分离算法与白化的运行时错误. 对所在的试验而言是致命的.
#[derive(Debug, Clone, PartialEq)]
pub enum BssError {
    /// 第一个参数 (频点) 上出现奇异矩阵.
    Singular(usize),

    /// 第一个参数 (频点) 上的协方差矩阵不满秩, 无法白化.
    RankDeficient(usize),

    /// 第一个参数 (迭代次数) 之后分离矩阵出现 NaN 或 inf.
    Diverged(usize),

    /// 算法参数不合法.
    InvalidParam(&'static str),

    /// 检查点回调失败.
    Checkpoint(MetricError),
}

impl fmt::Display for BssError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singular(freq) => write!(f, "singular matrix at frequency {freq}"),
            Self::RankDeficient(freq) => {
                write!(f, "rank deficient covariance at frequency {freq}")
            }
            Self::Diverged(it) => write!(f, "diverged after iteration {it}"),
            Self::InvalidParam(why) => write!(f, "invalid parameter: {why}"),
            Self::Checkpoint(e) => write!(f, "checkpoint failed: {e}"),
        }
    }
}

impl std::error::Error for BssError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Checkpoint(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MetricError> for BssError {
    #[inline]
    fn from(e: MetricError) -> Self {
        Self::Checkpoint(e)
    }
}
