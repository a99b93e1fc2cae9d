//! 任务生成.

use crate::config::ExperimentConfig;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// 一个任务: 某个场景的第 `repetition` 次重复.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Task {
    /// 场景下标.
    pub scenario: usize,

    /// 重复序号, `0..n_repeat`.
    pub repetition: usize,

    /// 该任务独有的种子.
    pub seed: u32,
}

/// 任务生成器. 持有一条由主种子初始化的随机数流.
///
/// 先 [`generate`](Self::generate) 再 [`shuffle`](Self::shuffle);
/// 打乱只影响调度顺序, 不影响任何任务的种子.
#[derive(Clone, Debug)]
pub struct TaskGenerator {
    rng: StdRng,
}

impl TaskGenerator {
    /// 以主种子初始化.
    pub fn new(master_seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(master_seed),
        }
    }

    /// 按 "场景优先, 重复其次" 的顺序为每个 (场景, 重复) 生成一个任务.
    ///
    /// 结果只取决于主种子和配置, 与 worker 数无关.
    pub fn generate(&mut self, config: &ExperimentConfig) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(config.n_tasks());
        for scenario in 0..config.params.len() {
            for repetition in 0..config.n_repeat {
                tasks.push(Task {
                    scenario,
                    repetition,
                    seed: self.rng.random(),
                });
            }
        }
        tasks
    }

    /// 原地打乱任务顺序.
    #[inline]
    pub fn shuffle(&mut self, tasks: &mut [Task]) {
        tasks.shuffle(&mut self.rng);
    }
}
