//! 源模型 (source model).

use crate::consts::EPS_NORM;
use crate::C64;
use ndarray::{Array2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 源信号分布. 同时决定随机混合的生成方式和分离算法使用的源模型.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    /// 球对称 Laplace 分布: 复高斯的方差服从指数分布, 且在所有频点间共享.
    Laplace,

    /// 时变高斯分布 (生成时方差恒为 1).
    Gauss,
}

impl Distribution {
    /// 配置文件中的名称.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Laplace => "laplace",
            Self::Gauss => "gauss",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 每个源在每一帧的向量范数 `r[k, t] = sqrt(Σ_f |y[f, k, t]|^2)`, 下限截断为 [`EPS_NORM`].
pub fn source_norms(y: ArrayView3<C64>) -> Array2<f64> {
    y.mapv(|z| z.norm_sqr())
        .sum_axis(Axis(0))
        .mapv(|v| v.sqrt().max(EPS_NORM))
}

/// 辅助函数法的权重 `G'(r) / (2 r)`, 形状为 `(源, 帧)`.
///
/// - `Laplace`: `G(r) = r`, 权重为 `1 / (2 r)`;
/// - `Gauss`: `G(r) = F log r^2`, 权重为 `F / r^2`.
///
/// IP 与 ISS 都按 `w^H V w = 1` 归一化, 只有此权重能保证代价函数不增.
pub fn weights(model: Distribution, y: ArrayView3<C64>) -> Array2<f64> {
    let n_freq = y.dim().0 as f64;
    let r = source_norms(y);
    match model {
        Distribution::Laplace => r.mapv(|v| 0.5 / v),
        Distribution::Gauss => r.mapv(|v| n_freq / (v * v)),
    }
}

/// 得分函数的系数 `G'(r) / r`, 形状为 `(源, 帧)`. 用于自然梯度.
///
/// - `Laplace`: `1 / r`;
/// - `Gauss`: `2 F / r^2`.
pub fn score(model: Distribution, y: ArrayView3<C64>) -> Array2<f64> {
    let mut phi = weights(model, y);
    phi.mapv_inplace(|v| 2.0 * v);
    phi
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_serde_names() {
        let d: Distribution = serde_json::from_str("\"laplace\"").unwrap();
        assert_eq!(d, Distribution::Laplace);
        assert_eq!(serde_json::to_string(&Distribution::Gauss).unwrap(), "\"gauss\"");
        assert_eq!(Distribution::Laplace.to_string(), "laplace");
    }

    #[test]
    fn test_weights() {
        // 两个频点, 每个元素模为 1 => r = sqrt(2)
        let y = Array3::from_elem((2, 3, 4), C64::new(0.6, 0.8));
        let w = weights(Distribution::Laplace, y.view());
        assert_eq!(w.dim(), (3, 4));
        assert!(w.iter().all(|v| (v - 0.5 / 2f64.sqrt()).abs() < 1e-12));

        let w = weights(Distribution::Gauss, y.view());
        assert!(w.iter().all(|v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_score() {
        let y = Array3::from_elem((2, 3, 4), C64::new(0.6, 0.8));
        let phi = score(Distribution::Laplace, y.view());
        assert_eq!(phi.dim(), (3, 4));
        assert!(phi.iter().all(|v| (v - 1.0 / 2f64.sqrt()).abs() < 1e-12));

        let phi = score(Distribution::Gauss, y.view());
        assert!(phi.iter().all(|v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_zero_signal_is_clamped() {
        let y = Array3::from_elem((2, 1, 2), C64::new(0.0, 0.0));
        assert!(weights(Distribution::Laplace, y.view())
            .iter()
            .all(|v| v.is_finite()));
    }
}
