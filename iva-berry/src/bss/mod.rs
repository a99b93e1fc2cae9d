//! 盲源分离的外部协作接口, 以及一套参考实现.
//!
//! 评测框架只依赖三种能力 (见 [`Toolbox`]):
//!
//! 1. 为给定维度和源分布生成随机混合与真值;
//! 2. 白化 (PCA) 初始化;
//! 3. 按名称运行分离算法, 并在指定的迭代检查点回调当前估计.
//!
//! 本模块的 [`Bss`] 提供了这三种能力的参考实现, 仅供评测框架和测试使用.

mod auxiva;
mod error;
mod mixture;
mod model;
mod ng;
mod pca;
pub mod registry;

use crate::config::AlgoParams;
use crate::metric::MetricResult;
use crate::{Filters, Signals, C64};
use ndarray::ArrayView3;
use rand::rngs::StdRng;

pub use auxiva::AuxIva;
pub use error::BssError;
pub use mixture::{rand_mixture, RandMixture};
pub use model::{score, source_norms, weights, Distribution};
pub use ng::NaturalGradient;
pub use pca::pca;

/// 分离算法运行结果.
pub type BssResult<T> = Result<T, BssError>;

/// 检查点回调, 参数依次为当前分离信号 `Y` 与当前分离矩阵 `W`.
///
/// 回调返回 `Err` 时算法应立即停止并将错误向上传递.
pub type Checkpoint<'a> = dyn FnMut(ArrayView3<C64>, ArrayView3<C64>) -> MetricResult<()> + 'a;

/// 一个迭代式分离算法.
pub trait Separator: Send + Sync {
    /// 一次迭代是否同时更新一对通道. 这类算法只在偶数次迭代时采样.
    fn is_dual_update(&self) -> bool {
        false
    }

    /// 检查算法参数. 返回的字符串描述了不合法的原因.
    fn check_params(&self, params: &AlgoParams) -> Result<(), &'static str> {
        if params.n_iter == 0 {
            return Err("n_iter 必须为正");
        }
        Ok(())
    }

    /// 从初始信号 `x` (`(频点, 通道, 帧)`) 出发运行 `params.n_iter` 次迭代.
    ///
    /// 在 `checkpoints` (升序) 中列出的每次迭代结束后, 以当前 `(Y, W)` 调用
    /// `callback`, 其中 `Y = W @ x`. 返回最终的 `(Y, W)`.
    fn separate(
        &self,
        x: ArrayView3<C64>,
        params: &AlgoParams,
        model: Distribution,
        checkpoints: &[usize],
        callback: &mut Checkpoint<'_>,
    ) -> BssResult<(Signals, Filters)>;
}

/// 评测框架所需的全部外部能力.
pub trait Toolbox: Sync {
    /// 生成一次随机混合.
    fn rand_mixture(
        &self,
        n_freq: usize,
        n_chan: usize,
        n_frames: usize,
        distrib: Distribution,
        rng: &mut StdRng,
    ) -> RandMixture;

    /// 白化 `x`, 返回 `(白化后的信号, 白化矩阵)`.
    fn whiten(&self, x: ArrayView3<C64>) -> BssResult<(Signals, Filters)>;

    /// 按名称查找分离算法.
    fn algorithm(&self, name: &str) -> Option<&dyn Separator>;
}

/// 参考实现.
#[derive(Copy, Clone, Debug, Default)]
pub struct Bss;

impl Toolbox for Bss {
    #[inline]
    fn rand_mixture(
        &self,
        n_freq: usize,
        n_chan: usize,
        n_frames: usize,
        distrib: Distribution,
        rng: &mut StdRng,
    ) -> RandMixture {
        rand_mixture(n_freq, n_chan, n_frames, distrib, rng)
    }

    #[inline]
    fn whiten(&self, x: ArrayView3<C64>) -> BssResult<(Signals, Filters)> {
        pca(x)
    }

    #[inline]
    fn algorithm(&self, name: &str) -> Option<&dyn Separator> {
        registry::lookup(name)
    }
}

/// 第 `it` 次迭代结束后, 若 `it` 是检查点则回调.
pub(crate) fn at_checkpoint(
    it: usize,
    checkpoints: &[usize],
    y: &Signals,
    w: &Filters,
    callback: &mut Checkpoint<'_>,
) -> BssResult<()> {
    if checkpoints.binary_search(&it).is_ok() {
        callback(y.view(), w.view())?;
    }
    Ok(())
}

/// 分离矩阵出现 NaN 或 inf 时视为发散.
pub(crate) fn ensure_finite(w: &Filters, it: usize) -> BssResult<()> {
    if w.iter().all(|z| z.re.is_finite() && z.im.is_finite()) {
        Ok(())
    } else {
        Err(BssError::Diverged(it))
    }
}
