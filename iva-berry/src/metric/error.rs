//! 运行时错误.

use std::fmt;

/// 指派问题的数值错误.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentError {
    /// 代价矩阵 `(行, 列)` 处含 NaN 或 `-inf`.
    InvalidEntry(usize, usize),

    /// 不存在代价有限的完整指派.
    Infeasible,
}

impl fmt::Display for AssignmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEntry(r, c) => write!(f, "cost matrix has an invalid entry at ({r}, {c})"),
            Self::Infeasible => write!(f, "cost matrix is infeasible"),
        }
    }
}

impl std::error::Error for AssignmentError {}

/// 分离质量指标的数值退化.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricError {
    /// 置换校正后, 第一个参数 (频点) 上第二个参数 (通道) 的对角项为零, ISR 无定义.
    ZeroDiagonal(usize, usize),

    /// `W @ A` 在第一个参数 (频点) 上第二个参数 (行) 全为零, 无法做尺度归一化.
    DegenerateRow(usize, usize),

    /// 第一个参数 (频点) 上第二个参数 (通道) 的估计信号能量为零, 无法投影回参考通道.
    ZeroEnergy(usize, usize),

    /// 置换求解失败.
    Assignment(AssignmentError),
}

impl fmt::Display for MetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroDiagonal(freq, ch) => {
                write!(f, "zero diagonal term at frequency {freq}, channel {ch}")
            }
            Self::DegenerateRow(freq, row) => {
                write!(f, "all-zero row {row} of the global system at frequency {freq}")
            }
            Self::ZeroEnergy(freq, ch) => {
                write!(f, "estimated source {ch} is silent at frequency {freq}")
            }
            Self::Assignment(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for MetricError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Assignment(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AssignmentError> for MetricError {
    #[inline]
    fn from(e: AssignmentError) -> Self {
        Self::Assignment(e)
    }
}
