//! ISR (Interference-to-Signal Ratio).

use super::assignment::assignment_cols;
use super::{MetricError, MetricResult};
use crate::linalg::batch_dot;
use crate::{Filters, C64};
use ndarray::{Array2, ArrayView3, Axis};
use ordered_float::OrderedFloat;

/// 消除尺度与置换歧义后的全局系统.
#[derive(Debug, Clone)]
pub struct ScalePermuted {
    /// 校正后的全局系统 `P = W @ A`, 理想情况下每个频点均为单位阵.
    pub global: Filters,

    /// 第 `i` 个元素为被指派到第 `i` 个真实源的原输出通道.
    pub perm: Vec<usize>,
}

/// 消除 `demix` 相对于真实混合矩阵 `mix_mat` 的尺度与置换歧义.
///
/// 1. 对每个频点计算 `P = W @ A`, 并以每行绝对值最大的元素为 1 归一化该行;
/// 2. 以 "与单位阵模式的均方偏差" 为代价求解最优指派, 得到对所有频点统一的置换.
///
/// 某一行全为零 (或含 NaN) 时无法归一化, 返回 [`MetricError::DegenerateRow`].
///
/// `demix` 与 `mix_mat` 频点数不一致, 或不是方阵组时 panic.
pub fn scale_permute(
    demix: ArrayView3<C64>,
    mix_mat: ArrayView3<C64>,
) -> MetricResult<ScalePermuted> {
    let (n_freq, n_chan, n_chan2) = demix.dim();
    assert_eq!(n_chan, n_chan2, "分离矩阵必须是方阵");
    assert_eq!(mix_mat.dim(), (n_freq, n_chan, n_chan), "混合矩阵形状不一致");

    let mut global = batch_dot(demix, mix_mat);

    // 尺度
    for f in 0..n_freq {
        for r in 0..n_chan {
            let scale = global
                .slice(ndarray::s![f, r, ..])
                .iter()
                .map(|z| OrderedFloat(z.norm()))
                .max()
                .map_or(0.0, |m| m.0);
            if !(scale.is_finite() && scale > 0.0) {
                return Err(MetricError::DegenerateRow(f, r));
            }
            global.slice_mut(ndarray::s![f, r, ..]).mapv_inplace(|z| z / scale);
        }
    }

    // 置换: err[a, b] 为输出通道 b 与真实源 a 的单位阵模式的均方偏差
    let denom = (n_freq * n_chan) as f64;
    let err = Array2::from_shape_fn((n_chan, n_chan), |(a, b)| {
        let mut acc = 0.0;
        for f in 0..n_freq {
            for k in 0..n_chan {
                let target = if a == k { 1.0 } else { 0.0 };
                let d = target - global[(f, b, k)].norm();
                acc += d * d;
            }
        }
        acc / denom
    });
    let perm = assignment_cols(err.view())?;

    Ok(ScalePermuted {
        global: global.select(Axis(1), &perm),
        perm,
    })
}

/// 计算分离矩阵 `demix` 相对于真实混合矩阵 `mix_mat` 的 ISR (dB).
///
/// 消除尺度与置换后, 对每个频点的每个非对角位置 `(r, c)` 计算
/// `|P[r, c]|^2 / |P[r, r]|^2`, 在所有非对角位置与所有频点上求平均,
/// 再取 `10 log10`. 完美分离时结果为 `-inf`.
///
/// 该值与 `demix` 的逐行 (复) 缩放和通道重标号无关.
///
/// 对角项为零时比值无定义, 返回 [`MetricError::ZeroDiagonal`].
pub fn isr(demix: ArrayView3<C64>, mix_mat: ArrayView3<C64>) -> MetricResult<f64> {
    let ScalePermuted { global, .. } = scale_permute(demix, mix_mat)?;
    let (n_freq, n_chan, _) = global.dim();

    let mut acc = 0.0;
    let mut count = 0usize;
    for f in 0..n_freq {
        for r in 0..n_chan {
            let target = global[(f, r, r)].norm_sqr();
            if target == 0.0 {
                return Err(MetricError::ZeroDiagonal(f, r));
            }
            for c in (0..n_chan).filter(|&c| c != r) {
                acc += global[(f, r, c)].norm_sqr() / target;
                count += 1;
            }
        }
    }

    if count == 0 {
        // 单通道不存在干扰.
        return Ok(f64::NEG_INFINITY);
    }
    Ok(10.0 * (acc / count as f64).log10())
}
