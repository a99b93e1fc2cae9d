//! 结果表.

use crate::trial::Trajectory;
use ndarray::{Array2, ArrayView1, ArrayView2};
use std::fmt;

/// 试验输出与结果表的列不符. 此时结果表不做任何修改.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ColumnMismatch {
    /// 算法数目不同.
    Count {
        /// 结果表中的算法数.
        expected: usize,

        /// 输出中的算法数.
        got: usize,
    },

    /// 第 `index` 个算法的名称不同.
    Name {
        /// 位置.
        index: usize,

        /// 结果表中的名称.
        expected: String,

        /// 输出中的名称.
        got: String,
    },

    /// 轨迹长度与列数不同.
    Length {
        /// 算法名称.
        algo: String,

        /// 列数.
        expected: usize,

        /// ISR 与 cost 中较短者的长度.
        got: usize,
    },
}

impl fmt::Display for ColumnMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count { expected, got } => {
                write!(f, "expected {expected} algorithms, got {got}")
            }
            Self::Name {
                index,
                expected,
                got,
            } => write!(f, "algorithm #{index} is `{got}`, expected `{expected}`"),
            Self::Length {
                algo,
                expected,
                got,
            } => write!(f, "`{algo}` has {got} samples, expected {expected}"),
        }
    }
}

impl std::error::Error for ColumnMismatch {}

/// 结果表: 场景下标 -> 算法名称 -> `(重复次数, 检查点数)` 的数组.
///
/// 行号即重复序号, 与任务的完成顺序无关. 未回填的行 (任务失败) 保持为 NaN.
#[derive(Clone, Debug)]
pub struct ResultTables {
    algos: Vec<String>,
    isr: Vec<Vec<Array2<f64>>>,
    cost: Vec<Vec<Array2<f64>>>,
    filled: Vec<Vec<bool>>,
}

impl ResultTables {
    /// 创建全为 NaN 的结果表. `columns` 依次给出每个算法的名称和采样点数.
    pub fn new(n_scenarios: usize, n_repeat: usize, columns: &[(String, usize)]) -> Self {
        let blank = || -> Vec<Vec<Array2<f64>>> {
            (0..n_scenarios)
                .map(|_| {
                    columns
                        .iter()
                        .map(|&(_, n)| Array2::from_elem((n_repeat, n), f64::NAN))
                        .collect()
                })
                .collect()
        };
        Self {
            algos: columns.iter().map(|(name, _)| name.clone()).collect(),
            isr: blank(),
            cost: blank(),
            filled: vec![vec![false; n_repeat]; n_scenarios],
        }
    }

    /// 场景数.
    #[inline]
    pub fn n_scenarios(&self) -> usize {
        self.filled.len()
    }

    /// 每个场景的重复次数.
    #[inline]
    pub fn n_repeat(&self) -> usize {
        self.filled.first().map_or(0, Vec::len)
    }

    /// 算法名称, 按配置顺序.
    #[inline]
    pub fn algos(&self) -> &[String] {
        &self.algos
    }

    /// 回填一次试验的结果.
    ///
    /// `output` 中的算法顺序与采样点数必须与创建时一致, 否则返回错误且不写入任何值.
    pub fn insert(
        &mut self,
        scenario: usize,
        repetition: usize,
        output: &[(String, Trajectory)],
    ) -> Result<(), ColumnMismatch> {
        if output.len() != self.algos.len() {
            return Err(ColumnMismatch::Count {
                expected: self.algos.len(),
                got: output.len(),
            });
        }
        for (index, (name, traj)) in output.iter().enumerate() {
            if name != &self.algos[index] {
                return Err(ColumnMismatch::Name {
                    index,
                    expected: self.algos[index].clone(),
                    got: name.clone(),
                });
            }
            let expected = self.isr[scenario][index].ncols();
            if traj.isr.len() != expected || traj.cost.len() != expected {
                return Err(ColumnMismatch::Length {
                    algo: name.clone(),
                    expected,
                    got: traj.isr.len().min(traj.cost.len()),
                });
            }
        }

        for (a, (_, traj)) in output.iter().enumerate() {
            self.isr[scenario][a]
                .row_mut(repetition)
                .assign(&ArrayView1::from(traj.isr.as_slice()));
            self.cost[scenario][a]
                .row_mut(repetition)
                .assign(&ArrayView1::from(traj.cost.as_slice()));
        }
        self.filled[scenario][repetition] = true;
        Ok(())
    }

    /// 该 (场景, 重复) 是否已回填.
    #[inline]
    pub fn is_filled(&self, scenario: usize, repetition: usize) -> bool {
        self.filled[scenario][repetition]
    }

    fn position(&self, algo: &str) -> Option<usize> {
        self.algos.iter().position(|a| a == algo)
    }

    /// ISR 表.
    pub fn isr(&self, scenario: usize, algo: &str) -> Option<ArrayView2<f64>> {
        let a = self.position(algo)?;
        self.isr.get(scenario).map(|row| row[a].view())
    }

    /// 代价函数表.
    pub fn cost(&self, scenario: usize, algo: &str) -> Option<ArrayView2<f64>> {
        let a = self.position(algo)?;
        self.cost.get(scenario).map(|row| row[a].view())
    }

    /// 按 (场景, 算法) 遍历 `(场景, 算法名称, ISR, cost)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, &str, ArrayView2<f64>, ArrayView2<f64>)> {
        self.isr
            .iter()
            .zip(self.cost.iter())
            .enumerate()
            .flat_map(move |(s, (isr, cost))| {
                self.algos
                    .iter()
                    .zip(isr.iter().zip(cost.iter()))
                    .map(move |(name, (i, c))| (s, name.as_str(), i.view(), c.view()))
            })
    }
}
