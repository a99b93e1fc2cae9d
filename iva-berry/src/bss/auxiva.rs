//! 基于辅助函数法的 IVA (AuxIVA).
//!
//! - `Ip`: iterative projection, 每次迭代逐个源求解 `w_k = (W V_k)^{-1} e_k`;
//! - `Iss`: iterative source steering, 每次迭代对每个源做一次秩一更新, 无需求逆.

use super::{
    at_checkpoint, ensure_finite, weights, BssError, BssResult, Checkpoint, Distribution, Separator,
};
use crate::config::AlgoParams;
use crate::linalg::{batch_dot, hermitian, identity_filters, solve};
use crate::{Filters, Signals, C64};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, ArrayView3, Axis};
use num::{One, Zero};

/// AuxIVA 的更新规则.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AuxIva {
    /// Iterative projection.
    Ip,

    /// Iterative source steering.
    Iss,
}

impl Separator for AuxIva {
    fn separate(
        &self,
        x: ArrayView3<C64>,
        params: &AlgoParams,
        model: Distribution,
        checkpoints: &[usize],
        callback: &mut Checkpoint<'_>,
    ) -> BssResult<(Signals, Filters)> {
        self.check_params(params).map_err(BssError::InvalidParam)?;
        match self {
            Self::Ip => ip(x, params.n_iter, model, checkpoints, callback),
            Self::Iss => iss(x, params.n_iter, model, checkpoints, callback),
        }
    }
}

/// 加权协方差 `V = Σ_t φ[t] x_t x_t^H / T`.
fn weighted_cov(x: ArrayView2<C64>, phi: ArrayView1<f64>) -> Array2<C64> {
    let n_frames = x.ncols() as f64;
    let xw = Array2::from_shape_fn(x.dim(), |(m, t)| x[(m, t)] * phi[t]);
    xw.dot(&hermitian(x)) / C64::from(n_frames)
}

/// 二次型 `Re(w^H V w)`.
fn quad_form(w: ArrayView1<C64>, v: ArrayView2<C64>) -> f64 {
    let vw = v.dot(&w);
    w.iter().zip(vw.iter()).map(|(a, b)| (a.conj() * b).re).sum()
}

fn ip(
    x: ArrayView3<C64>,
    n_iter: usize,
    model: Distribution,
    checkpoints: &[usize],
    callback: &mut Checkpoint<'_>,
) -> BssResult<(Signals, Filters)> {
    let (n_freq, n_chan, _) = x.dim();
    let mut w = identity_filters(n_freq, n_chan);
    let mut y = x.to_owned();

    for it in 1..=n_iter {
        let phi = weights(model, y.view());

        for f in 0..n_freq {
            let xf = x.index_axis(Axis(0), f);
            for k in 0..n_chan {
                let v = weighted_cov(xf, phi.row(k));
                let wv = w.index_axis(Axis(0), f).dot(&v);

                let mut e = Array1::zeros(n_chan);
                e[k] = C64::one();
                let mut wk = solve(wv.view(), e.view()).ok_or(BssError::Singular(f))?;

                let norm = quad_form(wk.view(), v.view()).sqrt();
                if !(norm > 0.0) {
                    return Err(BssError::Singular(f));
                }
                wk.mapv_inplace(|z| z / norm);
                w.slice_mut(s![f, k, ..]).assign(&wk.mapv(|z| z.conj()));
            }
        }

        y = batch_dot(w.view(), x);
        ensure_finite(&w, it)?;
        at_checkpoint(it, checkpoints, &y, &w, callback)?;
    }

    Ok((y, w))
}

fn iss(
    x: ArrayView3<C64>,
    n_iter: usize,
    model: Distribution,
    checkpoints: &[usize],
    callback: &mut Checkpoint<'_>,
) -> BssResult<(Signals, Filters)> {
    let (n_freq, n_chan, n_frames) = x.dim();
    let mut w = identity_filters(n_freq, n_chan);
    let mut y = x.to_owned();
    let mut v = vec![C64::zero(); n_chan];

    for it in 1..=n_iter {
        let phi = weights(model, y.view());

        for k in 0..n_chan {
            for f in 0..n_freq {
                let yk = y.slice(s![f, k, ..]).to_owned();
                let wk = w.slice(s![f, k, ..]).to_owned();

                for (m, vm) in v.iter_mut().enumerate() {
                    let phi_m = phi.row(m);
                    let ym = y.slice(s![f, m, ..]);
                    let (num, den) = izip_fold(phi_m, ym, yk.view());
                    if !(den > 0.0) {
                        return Err(BssError::Singular(f));
                    }
                    *vm = if m == k {
                        C64::one() - C64::from((den / n_frames as f64).sqrt().recip())
                    } else {
                        num / den
                    };
                }

                for (m, &vm) in v.iter().enumerate() {
                    y.slice_mut(s![f, m, ..])
                        .zip_mut_with(&yk, |a, &b| *a -= vm * b);
                    w.slice_mut(s![f, m, ..])
                        .zip_mut_with(&wk, |a, &b| *a -= vm * b);
                }
            }
        }

        ensure_finite(&w, it)?;
        at_checkpoint(it, checkpoints, &y, &w, callback)?;
    }

    Ok((y, w))
}

/// `(Σ_t φ[t] y_m[t] conj(y_k[t]), Σ_t φ[t] |y_k[t]|^2)`.
#[inline]
fn izip_fold(phi: ArrayView1<f64>, ym: ArrayView1<C64>, yk: ArrayView1<C64>) -> (C64, f64) {
    itertools::izip!(phi.iter(), ym.iter(), yk.iter()).fold(
        (C64::zero(), 0.0),
        |(num, den), (&p, a, b)| (num + a * b.conj() * p, den + p * b.norm_sqr()),
    )
}
