//! 单次试验: 一个场景的一次随机实例, 运行全部算法并记录收敛轨迹.

use crate::bss::{BssError, Distribution, Toolbox};
use crate::config::AlgoSpec;
use crate::linalg::{batch_dot, identity_filters, sum_log_abs_det};
use crate::metric::{isr, MetricError};
use crate::C64;
use ndarray::{ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 一个完整的场景. 由配置中的下标标识, 定义后不再改变.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// 频点数.
    pub n_freq: usize,

    /// 通道数.
    pub n_chan: usize,

    /// 帧数.
    pub n_frames: usize,

    /// 源分布.
    pub distrib: Distribution,

    /// 是否以 PCA 白化初始化.
    pub pca: bool,
}

/// 一个算法在一次试验中的收敛轨迹. 第一个点对应第 0 次迭代 (原始混合).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trajectory {
    /// 各检查点的 ISR (dB).
    pub isr: Vec<f64>,

    /// 各检查点的代价函数值.
    pub cost: Vec<f64>,
}

impl Trajectory {
    fn with_capacity(n: usize) -> Self {
        Self {
            isr: Vec::with_capacity(n),
            cost: Vec::with_capacity(n),
        }
    }

    /// 追加一个采样点. ISR 以合成后的滤波器 `w @ w_init` 计算.
    fn record(
        &mut self,
        y: ArrayView3<C64>,
        w: ArrayView3<C64>,
        w_init: ArrayView3<C64>,
        mix_mat: ArrayView3<C64>,
    ) -> Result<(), MetricError> {
        let combined = batch_dot(w, w_init);
        self.isr.push(isr(combined.view(), mix_mat)?);
        self.cost.push(cost(y, w));
        Ok(())
    }

    /// 采样点数.
    #[inline]
    pub fn len(&self) -> usize {
        self.isr.len()
    }

    /// 是否没有采样点.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.isr.is_empty()
    }
}

/// 一次试验的输出, 按配置中的算法顺序排列.
pub type TrialOutput = Vec<(String, Trajectory)>;

/// 试验失败. 只影响所在任务.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialError {
    /// 白化或分离算法失败.
    Bss(BssError),

    /// 计算指标失败.
    Metric(MetricError),

    /// 工具箱中找不到该算法.
    UnknownAlgorithm(String),

    /// 算法结束时采样点数与检查点数不符.
    Truncated {
        /// 算法名称.
        algo: String,

        /// 应有的采样点数 (含第 0 次迭代).
        expected: usize,

        /// 实际的采样点数.
        got: usize,
    },

    /// 工具箱 panic.
    Panicked(String),
}

impl fmt::Display for TrialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bss(BssError::Checkpoint(e)) | Self::Metric(e) => write!(f, "metric: {e}"),
            Self::Bss(e) => write!(f, "separation: {e}"),
            Self::UnknownAlgorithm(name) => write!(f, "unknown algorithm `{name}`"),
            Self::Truncated {
                algo,
                expected,
                got,
            } => write!(f, "`{algo}` recorded {got} of {expected} checkpoints"),
            Self::Panicked(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

impl std::error::Error for TrialError {}

impl From<BssError> for TrialError {
    #[inline]
    fn from(e: BssError) -> Self {
        Self::Bss(e)
    }
}

impl From<MetricError> for TrialError {
    #[inline]
    fn from(e: MetricError) -> Self {
        Self::Metric(e)
    }
}

/// 检查点 (不含第 0 次迭代).
///
/// "双通道更新" 算法一次迭代更新一对通道, 只在偶数次迭代采样: `2, 4, …, n_iter`;
/// 其它算法每次迭代都采样: `1, 2, …, n_iter`.
pub fn checkpoints(n_iter: usize, dual_update: bool) -> Vec<usize> {
    if dual_update {
        (2..=n_iter).step_by(2).collect()
    } else {
        (1..=n_iter).collect()
    }
}

/// 代价函数 `Σ_{c, t} ||Y[:, c, t]||_2 - 2 T Σ_f log|det W_f|`.
///
/// 仅用于诊断. 正确收敛的算法上它应单调下降.
pub fn cost(y: ArrayView3<C64>, w: ArrayView3<C64>) -> f64 {
    let n_frames = y.dim().2 as f64;
    let norms: f64 = y
        .mapv(|z| z.norm_sqr())
        .sum_axis(Axis(0))
        .iter()
        .map(|v| v.sqrt())
        .sum();
    norms - 2.0 * n_frames * sum_log_abs_det(w)
}

/// 运行一次试验.
///
/// 相同的 `seed` 与场景总是得到逐位相同的结果. 任一算法或指标失败,
/// 或算法提前结束而未到达全部检查点时, 立即返回错误.
pub fn run_trial(
    scenario: &Scenario,
    algos: &[AlgoSpec],
    seed: u32,
    toolbox: &dyn Toolbox,
) -> Result<TrialOutput, TrialError> {
    let Scenario {
        n_freq,
        n_chan,
        n_frames,
        distrib,
        pca,
    } = *scenario;

    let mut rng = StdRng::seed_from_u64(u64::from(seed));
    let mixture = toolbox.rand_mixture(n_freq, n_chan, n_frames, distrib, &mut rng);
    let mix_mat = mixture.mix_mat.view();

    let eye = identity_filters(n_freq, n_chan);
    let (y_init, w_init) = if pca {
        toolbox.whiten(mixture.mix.view())?
    } else {
        (mixture.mix.clone(), eye.clone())
    };

    let mut out = Vec::with_capacity(algos.len());
    for spec in algos {
        let algo = toolbox
            .algorithm(&spec.algo)
            .ok_or_else(|| TrialError::UnknownAlgorithm(spec.algo.clone()))?;
        let points = checkpoints(spec.kwargs.n_iter, algo.is_dual_update());

        let mut traj = Trajectory::with_capacity(points.len() + 1);

        // 第 0 次迭代: 原始混合
        traj.record(mixture.mix.view(), eye.view(), w_init.view(), mix_mat)?;

        algo.separate(
            y_init.view(),
            &spec.kwargs,
            distrib,
            &points,
            &mut |y, w| traj.record(y, w, w_init.view(), mix_mat),
        )?;

        if traj.len() != points.len() + 1 {
            return Err(TrialError::Truncated {
                algo: spec.name.clone(),
                expected: points.len() + 1,
                got: traj.len(),
            });
        }

        out.push((spec.name.clone(), traj));
    }

    Ok(out)
}
