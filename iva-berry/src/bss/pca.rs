//! 主成分分析 (PCA) 白化.

use super::{BssError, BssResult};
use crate::linalg::{batch_dot, eigh_desc};
use crate::{Filters, Signals, C64};
use ndarray::{Array2, Array3, ArrayView3, Axis};

/// 逐频点白化 `x` (`(频点, 通道, 帧)`).
///
/// 对每个频点的协方差 `C = X X^H / T` 做特征分解, 特征值降序排列,
/// 得到白化矩阵 `W = Λ^{-1/2} E^H`. 返回 `(W @ X, W)`.
///
/// 协方差不满秩时返回 [`BssError::RankDeficient`].
pub fn pca(x: ArrayView3<C64>) -> BssResult<(Signals, Filters)> {
    let (n_freq, n_chan, n_frames) = x.dim();
    let mut filters = Array3::zeros((n_freq, n_chan, n_chan));

    for (f, (xf, mut wf)) in x
        .axis_iter(Axis(0))
        .zip(filters.axis_iter_mut(Axis(0)))
        .enumerate()
    {
        let cov: Array2<C64> = xf.dot(&xf.t().mapv(|z| z.conj())) / C64::from(n_frames as f64);
        let (values, vectors) = eigh_desc(cov.view());

        // 条件数超过 1e12 视为不满秩
        let floor = values[0].abs() * 1e-12;
        for (i, &lambda) in values.iter().enumerate() {
            if !(lambda > floor) {
                return Err(BssError::RankDeficient(f));
            }
            let s = lambda.sqrt();
            for j in 0..n_chan {
                wf[(i, j)] = vectors[(j, i)].conj() / s;
            }
        }
    }

    Ok((batch_dot(filters.view(), x), filters))
}
