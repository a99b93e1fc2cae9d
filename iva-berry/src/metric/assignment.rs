//! 线性指派问题 (二分图最小权完美匹配) 的最短增广路解法.
//!
//! 算法与 SciPy `linear_sum_assignment` 相同 (Crouse, 2016), 因此平局时的选择也一致:
//! 列按索引逆序扫描, 代价相同时优先选择尚未指派的列.

use super::{AssignmentError, AssignmentResult};
use ndarray::{Array2, ArrayView2};

/// 求解最小代价指派.
///
/// 对 `cost` 的形状为 `(nr, nc)` 的代价矩阵, 返回长度为 `min(nr, nc)` 的
/// `(行, 列)` 对, 按行索引升序排列.
///
/// 若 `cost` 含 NaN 或 `-inf`, 返回 [`AssignmentError::InvalidEntry`];
/// 若不存在有限代价的完整指派, 返回 [`AssignmentError::Infeasible`].
pub fn linear_sum_assignment(cost: ArrayView2<f64>) -> AssignmentResult<Vec<(usize, usize)>> {
    if let Some(((r, c), _)) = cost
        .indexed_iter()
        .find(|(_, v)| v.is_nan() || **v == f64::NEG_INFINITY)
    {
        return Err(AssignmentError::InvalidEntry(r, c));
    }

    let (nr, nc) = cost.dim();
    if nr == 0 || nc == 0 {
        return Ok(Vec::new());
    }

    // 行数多于列数时转置求解, 再交换回来.
    if nc < nr {
        let t: Array2<f64> = cost.t().to_owned();
        let mut ans: Vec<(usize, usize)> = Lsap::new(t.view())
            .solve()?
            .into_iter()
            .map(|(r, c)| (c, r))
            .collect();
        ans.sort_unstable();
        return Ok(ans);
    }

    Lsap::new(cost).solve()
}

/// 仅返回列索引: 第 `i` 个元素为第 `i` 行被指派到的列.
///
/// 只对 `nr <= nc` 的情况有意义.
pub fn assignment_cols(cost: ArrayView2<f64>) -> AssignmentResult<Vec<usize>> {
    Ok(linear_sum_assignment(cost)?
        .into_iter()
        .map(|(_, c)| c)
        .collect())
}

/// 求解器状态, 要求 `nr <= nc`.
struct Lsap<'a> {
    cost: ArrayView2<'a, f64>,

    /// 行对偶变量.
    u: Vec<f64>,

    /// 列对偶变量.
    v: Vec<f64>,
    shortest: Vec<f64>,
    path: Vec<usize>,
    col4row: Vec<Option<usize>>,
    row4col: Vec<Option<usize>>,
    sr: Vec<bool>,
    sc: Vec<bool>,
    remaining: Vec<usize>,
}

impl<'a> Lsap<'a> {
    fn new(cost: ArrayView2<'a, f64>) -> Self {
        let (nr, nc) = cost.dim();
        debug_assert!(nr <= nc);
        Self {
            cost,
            u: vec![0.0; nr],
            v: vec![0.0; nc],
            shortest: vec![f64::INFINITY; nc],
            path: vec![usize::MAX; nc],
            col4row: vec![None; nr],
            row4col: vec![None; nc],
            sr: vec![false; nr],
            sc: vec![false; nc],
            remaining: vec![0; nc],
        }
    }

    fn solve(mut self) -> AssignmentResult<Vec<(usize, usize)>> {
        let (nr, nc) = self.cost.dim();

        for cur_row in 0..nr {
            let (sink, min_val) = self.augmenting_path(cur_row)?;

            // 更新对偶变量
            self.u[cur_row] += min_val;
            for i in 0..nr {
                if self.sr[i] && i != cur_row {
                    // 已访问的非当前行必然已被指派.
                    if let Some(j) = self.col4row[i] {
                        self.u[i] += min_val - self.shortest[j];
                    }
                }
            }
            for j in 0..nc {
                if self.sc[j] {
                    self.v[j] -= min_val - self.shortest[j];
                }
            }

            // 沿路径增广
            let mut j = sink;
            loop {
                let i = self.path[j];
                self.row4col[j] = Some(i);
                let prev = self.col4row[i].replace(j);
                if i == cur_row {
                    break;
                }
                // 非当前行在增广前必然有指派
                j = prev.ok_or(AssignmentError::Infeasible)?;
            }
        }

        self.col4row
            .iter()
            .enumerate()
            .map(|(i, c)| c.map(|c| (i, c)).ok_or(AssignmentError::Infeasible))
            .collect()
    }

    /// 从 `start` 行出发寻找一条到未指派列的最短增广路.
    ///
    /// 返回 `(汇点列, 最短路长度)`.
    fn augmenting_path(&mut self, start: usize) -> AssignmentResult<(usize, f64)> {
        let nc = self.cost.ncols();
        let mut min_val = 0.0;
        let mut num_remaining = nc;

        // 逆序填充以保证与参考实现一致的平局处理
        for (it, r) in self.remaining.iter_mut().enumerate() {
            *r = nc - it - 1;
        }
        self.sr.fill(false);
        self.sc.fill(false);
        self.shortest.fill(f64::INFINITY);

        let mut i = start;
        loop {
            let mut index = usize::MAX;
            let mut lowest = f64::INFINITY;
            self.sr[i] = true;

            for it in 0..num_remaining {
                let j = self.remaining[it];
                let r = min_val + self.cost[(i, j)] - self.u[i] - self.v[j];
                if r < self.shortest[j] {
                    self.path[j] = i;
                    self.shortest[j] = r;
                }
                if self.shortest[j] < lowest
                    || (self.shortest[j] == lowest && self.row4col[j].is_none())
                {
                    lowest = self.shortest[j];
                    index = it;
                }
            }

            min_val = lowest;
            if min_val == f64::INFINITY || index == usize::MAX {
                return Err(AssignmentError::Infeasible);
            }

            let j = self.remaining[index];
            self.sc[j] = true;
            num_remaining -= 1;
            self.remaining[index] = self.remaining[num_remaining];

            match self.row4col[j] {
                None => return Ok((j, min_val)),
                Some(row) => i = row,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use ndarray::{array, Array2};

    fn total(cost: &Array2<f64>, ans: &[(usize, usize)]) -> f64 {
        ans.iter().map(|&p| cost[p]).sum()
    }

    /// 暴力枚举所有置换, 得到最小总代价.
    fn brute_force(cost: &Array2<f64>) -> f64 {
        let n = cost.nrows();
        (0..n)
            .permutations(n)
            .map(|p| p.iter().enumerate().map(|(r, &c)| cost[(r, c)]).sum::<f64>())
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_two_by_two_off_diagonal() {
        let cost = array![[10.0, 1.0], [1.0, 10.0]];
        let ans = linear_sum_assignment(cost.view()).unwrap();
        assert_eq!(ans, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_two_by_two_diagonal() {
        let cost = array![[0.1, 0.9], [0.8, 0.2]];
        assert_eq!(assignment_cols(cost.view()).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_scipy_doc_example() {
        let cost = array![[4.0, 1.0, 3.0], [2.0, 0.0, 5.0], [3.0, 2.0, 2.0]];
        let ans = linear_sum_assignment(cost.view()).unwrap();
        assert_eq!(ans, vec![(0, 1), (1, 0), (2, 2)]);
        assert_eq!(total(&cost, &ans), 5.0);
    }

    #[test]
    fn test_ties_are_deterministic() {
        let cost = Array2::<f64>::ones((3, 3));
        let a = linear_sum_assignment(cost.view()).unwrap();
        let b = linear_sum_assignment(cost.view()).unwrap();
        assert_eq!(a, b);
        let mut cols: Vec<usize> = a.iter().map(|p| p.1).collect();
        cols.sort_unstable();
        assert_eq!(cols, vec![0, 1, 2]);
    }

    #[test]
    fn test_optimal_against_brute_force() {
        // 确定性的伪随机代价矩阵
        let mut state = 12345u64;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) as f64 / (1u64 << 31) as f64
        };
        for n in 1..=6 {
            for _ in 0..20 {
                let cost = Array2::from_shape_simple_fn((n, n), &mut next);
                let ans = linear_sum_assignment(cost.view()).unwrap();
                assert_eq!(ans.len(), n);
                assert!((total(&cost, &ans) - brute_force(&cost)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_rectangular() {
        let cost = array![[5.0, 1.0], [1.0, 5.0], [0.5, 0.5]];
        let ans = linear_sum_assignment(cost.view()).unwrap();
        assert_eq!(ans.len(), 2);
        assert!((total(&cost, &ans) - 1.5).abs() < 1e-12);
        assert!(ans.windows(2).all(|w| w[0].0 < w[1].0));

        let wide = cost.t().to_owned();
        let ans = linear_sum_assignment(wide.view()).unwrap();
        assert_eq!(ans.len(), 2);
        assert!((total(&wide, &ans) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_entries() {
        let cost = array![[1.0, f64::NAN], [0.0, 1.0]];
        assert_eq!(
            linear_sum_assignment(cost.view()).unwrap_err(),
            AssignmentError::InvalidEntry(0, 1)
        );

        let cost = array![[f64::INFINITY, f64::INFINITY], [0.0, 1.0]];
        assert_eq!(
            linear_sum_assignment(cost.view()).unwrap_err(),
            AssignmentError::Infeasible
        );
    }
}
