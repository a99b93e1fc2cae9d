//! 随机混合信号生成.

use super::Distribution;
use crate::linalg::batch_dot;
use crate::{Filters, Signals, C64};
use ndarray::{Array2, Array3};
use rand::Rng;
use rand_distr::{Exp1, StandardNormal};
use std::f64::consts::FRAC_1_SQRT_2;

/// 一次随机试验的数据: 混合信号, 参考源与真实混合矩阵.
///
/// 生成后不再修改, 试验结束即丢弃.
#[derive(Debug, Clone)]
pub struct RandMixture {
    /// 观测到的混合信号, `(频点, 通道, 帧)`.
    pub mix: Signals,

    /// 参考源信号, `(频点, 源, 帧)`.
    pub refs: Signals,

    /// 真实混合矩阵, `(频点, 通道, 源)`.
    pub mix_mat: Filters,
}

/// 单位方差的圆对称复高斯样本.
#[inline]
fn crandn<R: Rng + ?Sized>(rng: &mut R) -> C64 {
    let re: f64 = rng.sample(StandardNormal);
    let im: f64 = rng.sample(StandardNormal);
    C64::new(re, im) * FRAC_1_SQRT_2
}

/// 生成 `n_chan` 个源经 `n_chan` 个通道观测的随机混合.
///
/// 每个 (源, 帧) 共享一个跨频点的激活值 `v`: `Laplace` 时 `v ~ Exp(1)`,
/// `Gauss` 时 `v = 1`. 源信号为 `sqrt(v)` 缩放的复高斯;
/// 混合矩阵各元素为独立复高斯. 相同的 `rng` 状态总是得到相同的结果.
pub fn rand_mixture<R: Rng + ?Sized>(
    n_freq: usize,
    n_chan: usize,
    n_frames: usize,
    distrib: Distribution,
    rng: &mut R,
) -> RandMixture {
    let activations: Array2<f64> = match distrib {
        Distribution::Laplace => {
            Array2::from_shape_simple_fn((n_chan, n_frames), || rng.sample::<f64, _>(Exp1).sqrt())
        }
        Distribution::Gauss => Array2::ones((n_chan, n_frames)),
    };

    let refs = Array3::from_shape_fn((n_freq, n_chan, n_frames), |(_, k, t)| {
        crandn(rng) * activations[(k, t)]
    });
    let mix_mat = Array3::from_shape_simple_fn((n_freq, n_chan, n_chan), || crandn(rng));
    let mix = batch_dot(mix_mat.view(), refs.view());

    RandMixture { mix, refs, mix_mat }
}
