//! 分离质量评估.
//!
//! 分离结果与真值之间存在未知的通道置换和逐通道的复尺度. 本模块先用最优指派
//! 消除这两种歧义, 再计算误差.

pub mod assignment;
mod error;
mod isr;
mod separation;

pub use assignment::linear_sum_assignment;
pub use error::{AssignmentError, MetricError};
pub use isr::{isr, scale_permute, ScalePermuted};
pub use separation::{project_back, separation_error, SeparationError};

/// 指派问题求解结果.
pub type AssignmentResult<T> = Result<T, AssignmentError>;

/// 指标计算结果.
pub type MetricResult<T> = Result<T, MetricError>;
