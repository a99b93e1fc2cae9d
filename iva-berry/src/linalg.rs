//! 逐频点的小规模复矩阵运算.
//!
//! 张量本身用 `ndarray` 存储; 求逆, 行列式和 Hermitian 特征分解借助 `nalgebra` 完成.

use crate::{Filters, C64};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use num::{One, Zero};

/// 将 `ndarray` 方阵视图复制为 `nalgebra` 矩阵.
#[inline]
pub fn to_matrix(a: ArrayView2<C64>) -> DMatrix<C64> {
    let (r, c) = a.dim();
    DMatrix::from_fn(r, c, |i, j| a[(i, j)])
}

/// 将 `nalgebra` 矩阵复制为 `ndarray` 矩阵.
#[inline]
pub fn from_matrix(m: &DMatrix<C64>) -> Array2<C64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// 生成 `n_freq` 个 `n_chan * n_chan` 的单位阵.
pub fn identity_filters(n_freq: usize, n_chan: usize) -> Filters {
    Array3::from_shape_fn((n_freq, n_chan, n_chan), |(_, i, j)| {
        if i == j {
            C64::one()
        } else {
            C64::zero()
        }
    })
}

/// 逐频点矩阵乘法: `out[f] = a[f] @ b[f]`.
///
/// `a` 与 `b` 的频点数或内维不一致时 panic.
pub fn batch_dot(a: ArrayView3<C64>, b: ArrayView3<C64>) -> Array3<C64> {
    let (n_freq, n_rows, inner) = a.dim();
    let (n_freq_b, inner_b, n_cols) = b.dim();
    assert_eq!(n_freq, n_freq_b, "频点数不一致");
    assert_eq!(inner, inner_b, "矩阵内维不一致");

    let mut out = Array3::zeros((n_freq, n_rows, n_cols));
    for (mut o, (x, y)) in out
        .outer_iter_mut()
        .zip(a.outer_iter().zip(b.outer_iter()))
    {
        o.assign(&x.dot(&y));
    }
    out
}

/// 方阵求逆. 奇异时返回 `None`.
pub fn inv(a: ArrayView2<C64>) -> Option<Array2<C64>> {
    to_matrix(a).try_inverse().map(|m| from_matrix(&m))
}

/// 解线性方程组 `a x = b`. 奇异时返回 `None`.
pub fn solve(a: ArrayView2<C64>, b: ArrayView1<C64>) -> Option<Array1<C64>> {
    let rhs = DVector::from_iterator(b.len(), b.iter().copied());
    let x = to_matrix(a).lu().solve(&rhs)?;
    Some(x.iter().copied().collect())
}

/// `log|det(a)|`. 奇异阵返回 `-inf`.
pub fn log_abs_det(a: ArrayView2<C64>) -> f64 {
    let lu = to_matrix(a).lu();
    lu.u().diagonal().iter().map(|d| d.norm().ln()).sum()
}

/// 所有频点上 `log|det|` 之和.
pub fn sum_log_abs_det(a: ArrayView3<C64>) -> f64 {
    a.axis_iter(Axis(0)).map(log_abs_det).sum()
}

/// Hermitian 矩阵的特征分解.
///
/// 返回按特征值 **降序** 排列的 `(特征值, 特征向量)`, 特征向量按列存放.
/// 仅使用 `a` 的下三角部分.
pub fn eigh_desc(a: ArrayView2<C64>) -> (Vec<f64>, Array2<C64>) {
    let n = a.nrows();
    let eig = SymmetricEigen::new(to_matrix(a));

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| eig.eigenvalues[j].total_cmp(&eig.eigenvalues[i]));

    let values = order.iter().map(|&i| eig.eigenvalues[i]).collect();
    let vectors = Array2::from_shape_fn((n, n), |(r, c)| eig.eigenvectors[(r, order[c])]);
    (values, vectors)
}

/// 共轭转置.
#[inline]
pub fn hermitian(a: ArrayView2<C64>) -> Array2<C64> {
    a.t().mapv(|z| z.conj())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn c(re: f64, im: f64) -> C64 {
        C64::new(re, im)
    }

    fn c64_eq(a: C64, b: C64) -> bool {
        (a - b).norm() < 1e-10
    }

    #[test]
    fn test_inv_and_dot() {
        let a = array![[c(2.0, 1.0), c(0.5, 0.0)], [c(-1.0, 0.3), c(1.0, -2.0)]];
        let a_inv = inv(a.view()).unwrap();
        let eye = a.dot(&a_inv);
        for ((i, j), &v) in eye.indexed_iter() {
            let expect = if i == j { C64::one() } else { C64::zero() };
            assert!(c64_eq(v, expect));
        }
    }

    #[test]
    fn test_singular() {
        let a = array![[c(1.0, 0.0), c(2.0, 0.0)], [c(2.0, 0.0), c(4.0, 0.0)]];
        assert!(inv(a.view()).is_none());
        assert_eq!(log_abs_det(a.view()), f64::NEG_INFINITY);
    }

    #[test]
    fn test_log_abs_det() {
        let a = array![[c(0.0, 2.0), c(0.0, 0.0)], [c(5.0, 1.0), c(3.0, 0.0)]];
        assert!((log_abs_det(a.view()) - 6.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_eigh_desc() {
        let a = array![[c(2.0, 0.0), c(0.0, 1.0)], [c(0.0, -1.0), c(2.0, 0.0)]];
        let (values, vectors) = eigh_desc(a.view());
        assert!((values[0] - 3.0).abs() < 1e-12);
        assert!((values[1] - 1.0).abs() < 1e-12);

        // a v = λ v
        for k in 0..2 {
            let v = vectors.column(k);
            let av = a.dot(&v);
            for i in 0..2 {
                assert!(c64_eq(av[i], v[i] * values[k]));
            }
        }
    }

    #[test]
    fn test_batch_dot_identity() {
        let eye = identity_filters(3, 2);
        let x = Array3::from_shape_fn((3, 2, 4), |(f, c, t)| C64::new((f + c) as f64, t as f64));
        assert_eq!(batch_dot(eye.view(), x.view()), x);
    }
}
