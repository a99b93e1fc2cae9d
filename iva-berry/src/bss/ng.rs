//! 自然梯度 IVA.

use super::{
    at_checkpoint, ensure_finite, score, BssError, BssResult, Checkpoint, Distribution, Separator,
};
use crate::config::AlgoParams;
use crate::linalg::{batch_dot, identity_filters};
use crate::{Filters, Signals, C64};
use ndarray::{Array2, ArrayView3, Axis, Zip};

/// 自然梯度 IVA. 每次迭代对所有频点做
/// `W_f <- W_f + μ (I - Σ_t φ[k, t] y_t y_t^H / T) W_f`,
/// 其中 `φ` 由源模型给出 (见 [`score`]).
///
/// 步长 `μ` 取自 `step_size`, 必须给出.
#[derive(Copy, Clone, Debug, Default)]
pub struct NaturalGradient;

impl Separator for NaturalGradient {
    fn check_params(&self, params: &AlgoParams) -> Result<(), &'static str> {
        if params.n_iter == 0 {
            return Err("n_iter 必须为正");
        }
        match params.step_size {
            Some(mu) if mu.is_finite() && mu > 0.0 => Ok(()),
            Some(_) => Err("step_size 必须为有限正数"),
            None => Err("iva-ng 需要 step_size"),
        }
    }

    fn separate(
        &self,
        x: ArrayView3<C64>,
        params: &AlgoParams,
        model: Distribution,
        checkpoints: &[usize],
        callback: &mut Checkpoint<'_>,
    ) -> BssResult<(Signals, Filters)> {
        self.check_params(params).map_err(BssError::InvalidParam)?;
        let step = params.step_size.unwrap_or_default();

        let (n_freq, n_chan, n_frames) = x.dim();
        let mut w = identity_filters(n_freq, n_chan);
        let mut y = x.to_owned();

        for it in 1..=params.n_iter {
            let phi = score(model, y.view());

            for (yf, mut wf) in y.axis_iter(Axis(0)).zip(w.axis_iter_mut(Axis(0))) {
                // Σ_t φ y y^H / T
                let mut corr = Array2::<C64>::zeros((n_chan, n_chan));
                for ((r, c), v) in corr.indexed_iter_mut() {
                    *v = itertools::izip!(phi.row(r), yf.row(r), yf.row(c))
                        .map(|(&p, a, b)| a * b.conj() * p)
                        .sum::<C64>()
                        / n_frames as f64;
                }

                let mut grad = corr.mapv(|z| -z);
                grad.diag_mut().mapv_inplace(|z| z + 1.0);
                let delta = grad.dot(&wf) * step;
                Zip::from(&mut wf).and(&delta).for_each(|a, &d| *a += d);
            }

            y = batch_dot(w.view(), x);
            ensure_finite(&w, it)?;
            at_checkpoint(it, checkpoints, &y, &w, callback)?;
        }

        Ok((y, w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bss::rand_mixture;
    use crate::metric::isr;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params(n_iter: usize, step_size: Option<f64>) -> AlgoParams {
        AlgoParams {
            n_iter,
            step_size,
            tol: None,
        }
    }

    #[test]
    fn test_step_size_required() {
        let ng = NaturalGradient;
        assert!(ng.check_params(&params(10, None)).is_err());
        assert!(ng.check_params(&params(10, Some(0.0))).is_err());
        assert!(ng.check_params(&params(10, Some(f64::NAN))).is_err());
        assert!(ng.check_params(&params(0, Some(0.1))).is_err());
        assert!(ng.check_params(&params(10, Some(0.3))).is_ok());
    }

    #[test]
    fn test_separates_whitened_mixture() {
        let mut rng = StdRng::seed_from_u64(21);
        let m = rand_mixture(4, 2, 2000, Distribution::Laplace, &mut rng);
        let (y0, w0) = crate::bss::pca(m.mix.view()).unwrap();
        let before = isr(w0.view(), m.mix_mat.view()).unwrap();

        let (_, w) = NaturalGradient
            .separate(
                y0.view(),
                &params(100, Some(0.3)),
                Distribution::Laplace,
                &[],
                &mut |_, _| Ok(()),
            )
            .unwrap();
        let after = isr(batch_dot(w.view(), w0.view()).view(), m.mix_mat.view()).unwrap();
        assert!(after < before - 5.0, "{before} -> {after}");
    }

    #[test]
    fn test_huge_step_diverges_or_fails() {
        let mut rng = StdRng::seed_from_u64(22);
        let m = rand_mixture(2, 2, 200, Distribution::Laplace, &mut rng);
        let res = NaturalGradient.separate(
            m.mix.view(),
            &params(200, Some(1e6)),
            Distribution::Laplace,
            &[],
            &mut |_, _| Ok(()),
        );
        assert!(matches!(res, Err(BssError::Diverged(_))));
    }
}
