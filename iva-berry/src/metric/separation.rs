//! 基于输出信号 (而非滤波器) 的分离误差.

use super::assignment::assignment_cols;
use super::{MetricError, MetricResult};
use crate::{Signals, C64};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use num::Zero;

/// [`separation_error`] 的结果.
#[derive(Debug, Clone)]
pub struct SeparationError {
    /// 最优指派下的平均误差 (时频域均方误差).
    pub error: f64,

    /// 第 `i` 个元素为被指派到第 `i` 个参考源的估计通道.
    pub perm: Vec<usize>,

    /// 尺度校正并按 `perm` 重排后的估计信号.
    pub est_hat: Signals,
}

/// 投影回参考通道 (project back).
///
/// 对每个频点 `f` 与每个通道 `k`, 以最小二乘求复系数
/// `z = Σ_t conj(y[f, k, t]) r[f, t] / Σ_t |y[f, k, t]|^2`, 并返回 `z * y[f, k, :]`.
/// `reference` 的形状为 `(频点, 帧)`.
///
/// 若某通道能量为零, 返回 [`MetricError::ZeroEnergy`].
pub fn project_back(y: ArrayView3<C64>, reference: ArrayView2<C64>) -> MetricResult<Signals> {
    let (n_freq, n_chan, n_frames) = y.dim();
    assert_eq!(reference.dim(), (n_freq, n_frames), "参考信号形状不一致");

    let mut out = Array3::zeros(y.raw_dim());
    for f in 0..n_freq {
        let r = reference.row(f);
        for k in 0..n_chan {
            let yk = y.slice(ndarray::s![f, k, ..]);
            let (num, den) = yk
                .iter()
                .zip(r.iter())
                .fold((C64::zero(), 0.0), |(num, den), (a, b)| {
                    (num + a.conj() * b, den + a.norm_sqr())
                });
            if den == 0.0 {
                return Err(MetricError::ZeroEnergy(f, k));
            }
            let z = num / den;
            out.slice_mut(ndarray::s![f, k, ..])
                .assign(&yk.mapv(|v| v * z));
        }
    }
    Ok(out)
}

/// 计算分离信号 `est` 相对于参考源 `refs` 的误差.
///
/// 1. 将 `est` 的每个通道投影回混合信号 `mix` 的第 `ref_ch` 个通道以固定尺度;
/// 2. 以 `E[a, b] = mean_{f, t} |est_hat[f, b, t] - refs[f, a, t]|^2` 为代价求解最优指派;
/// 3. 返回被指派位置的平均代价, 置换以及重排后的估计信号.
///
/// 所有张量为 `(频点, 通道, 帧)`. 形状不一致或 `ref_ch` 越界时 panic.
pub fn separation_error(
    est: ArrayView3<C64>,
    mix: ArrayView3<C64>,
    refs: ArrayView3<C64>,
    ref_ch: usize,
) -> MetricResult<SeparationError> {
    assert_eq!(est.dim(), refs.dim(), "估计信号与参考源形状不一致");
    assert_eq!(est.dim().0, mix.dim().0, "频点数不一致");
    assert_eq!(est.dim().2, mix.dim().2, "帧数不一致");
    assert!(ref_ch < mix.dim().1, "参考通道越界");

    let est_hat = project_back(est, mix.index_axis(Axis(1), ref_ch))?;

    let (n_freq, n_src, n_frames) = refs.dim();
    let denom = (n_freq * n_frames) as f64;
    let err = Array2::from_shape_fn((n_src, n_src), |(a, b)| {
        let mut acc = 0.0;
        for f in 0..n_freq {
            for t in 0..n_frames {
                acc += (est_hat[(f, b, t)] - refs[(f, a, t)]).norm_sqr();
            }
        }
        acc / denom
    });

    let perm = assignment_cols(err.view())?;
    let error = perm
        .iter()
        .enumerate()
        .map(|(a, &b)| err[(a, b)])
        .sum::<f64>()
        / n_src as f64;

    Ok(SeparationError {
        error,
        est_hat: est_hat.select(Axis(1), &perm),
        perm,
    })
}
