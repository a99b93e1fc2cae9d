//! 实验驱动与结果汇总.
//!
//! 1. 提前检查配置, 生成并打乱任务;
//! 2. 在线程池中并行执行试验, 每个任务向进度线程发送一个完成信号,
//!   并向汇总端发送一个带 `(场景, 重复序号)` 标签的结果;
//! 3. 汇总端按完成顺序接收结果, 回填到对应的行. 失败的任务被记录, 不影响其它任务.

mod save;
mod table;

pub use save::{default_filename, save_npz, SaveError};
pub use table::{ColumnMismatch, ResultTables};

use crate::bss::Toolbox;
use crate::config::{ConfigError, ExperimentConfig};
use crate::progress::{self, Done, ProgressTracker};
use crate::task::{Task, TaskGenerator};
use crate::trial::{checkpoints, run_trial, Scenario, TrialError, TrialOutput};
use crossbeam_channel::{unbounded, Sender};
use log::{debug, info, warn};
use std::fmt;
use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
    }
}

/// 实验无法启动.
#[derive(Debug)]
pub enum ExperimentError {
    /// 配置不合法.
    Config(ConfigError),

    /// 无法创建线程池.
    #[cfg(feature = "rayon")]
    ThreadPool(ThreadPoolBuildError),
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            #[cfg(feature = "rayon")]
            Self::ThreadPool(e) => write!(f, "cannot build thread pool: {e}"),
        }
    }
}

impl std::error::Error for ExperimentError {}

impl From<ConfigError> for ExperimentError {
    #[inline]
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// 一个失败的任务.
#[derive(Clone, Debug, PartialEq)]
pub struct FailedTask {
    /// 场景下标.
    pub scenario: usize,

    /// 重复序号.
    pub repetition: usize,

    /// 任务种子, 可用于复现.
    pub seed: u32,

    /// 失败原因.
    pub reason: String,
}

/// 一个任务的结果, 带有其 `(场景, 重复序号)` 标签.
#[derive(Debug)]
pub struct TaskOutcome {
    /// 对应的任务.
    pub task: Task,

    /// 试验输出.
    pub result: Result<TrialOutput, TrialError>,
}

/// 整个实验的结果.
#[derive(Clone, Debug)]
pub struct ExperimentResult {
    /// 结果表.
    pub tables: ResultTables,

    /// 失败的任务, 按 `(场景, 重复序号)` 排序.
    pub failed: Vec<FailedTask>,

    /// 总耗时.
    pub elapsed: Duration,
}

/// 默认 worker 数: 可用的并行度.
pub fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, usize::from)
}

/// panic 携带的消息.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// 实验驱动.
pub struct Experiment<'a> {
    config: ExperimentConfig,
    toolbox: &'a dyn Toolbox,
    workers: usize,
}

impl<'a> Experiment<'a> {
    /// 创建实验. worker 数默认为可用的并行度.
    pub fn new(config: ExperimentConfig, toolbox: &'a dyn Toolbox) -> Self {
        Self {
            config,
            toolbox,
            workers: default_workers(),
        }
    }

    /// 指定 worker 数. 0 视为 1.
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n.max(1);
        self
    }

    /// 实验配置.
    #[inline]
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// 每个算法的名称与采样点数 (含第 0 次迭代).
    fn columns(&self) -> Vec<(String, usize)> {
        self.config
            .algos
            .iter()
            .map(|spec| {
                let dual = self
                    .toolbox
                    .algorithm(&spec.algo)
                    .is_some_and(|a| a.is_dual_update());
                (spec.name.clone(), checkpoints(spec.kwargs.n_iter, dual).len() + 1)
            })
            .collect()
    }

    fn execute(
        &self,
        task: Task,
        scenarios: &[Scenario],
        done: &Sender<Done>,
        out: &Sender<TaskOutcome>,
    ) {
        let scenario = &scenarios[task.scenario];
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            run_trial(scenario, &self.config.algos, task.seed, self.toolbox)
        }))
        .unwrap_or_else(|payload| Err(TrialError::Panicked(panic_message(payload.as_ref()))));
        debug!(
            "Task ({}, {}) finished: {}",
            task.scenario,
            task.repetition,
            if result.is_ok() { "ok" } else { "failed" }
        );
        // 汇总端先于进度线程收到结果
        let _ = out.send(TaskOutcome { task, result });
        progress::notify(done);
    }

    /// 运行全部任务. 进度写入 `progress`.
    ///
    /// 配置错误在任何任务开始之前返回; 单个任务的失败 (包括工具箱 panic) 只会被记录.
    pub fn run<W: Write + Send>(&self, progress: W) -> Result<ExperimentResult, ExperimentError> {
        self.config.validate(self.toolbox)?;
        let dispatcher = Dispatcher::new(self.workers)?;

        let mut generator = TaskGenerator::new(self.config.master_seed);
        let mut tasks = generator.generate(&self.config);
        generator.shuffle(&mut tasks);
        let n_tasks = tasks.len();

        let scenarios: Vec<Scenario> = self.config.scenarios().collect();
        let mut tables = ResultTables::new(scenarios.len(), self.config.n_repeat, &self.columns());
        let mut failed = Vec::new();

        info!(
            "Running {n_tasks} tasks ({} scenarios x {} repeats, {} algorithms) on {} workers",
            scenarios.len(),
            self.config.n_repeat,
            self.config.algos.len(),
            dispatcher.workers(),
        );
        let start = Instant::now();

        let (done_tx, done_rx) = unbounded();
        let (out_tx, out_rx) = unbounded();

        thread::scope(|s| {
            let tracker = s.spawn(move || ProgressTracker::new(n_tasks).run(&done_rx, progress));

            let scenarios = scenarios.as_slice();
            s.spawn(move || {
                dispatcher.dispatch(tasks, |task| {
                    self.execute(task, scenarios, &done_tx, &out_tx)
                });
            });

            // 所有发送端关闭后结束
            for TaskOutcome { task, result } in out_rx.iter() {
                let reason = match result {
                    Ok(output) => match tables.insert(task.scenario, task.repetition, &output) {
                        Ok(()) => continue,
                        Err(e) => e.to_string(),
                    },
                    Err(e) => e.to_string(),
                };
                warn!(
                    "Task ({}, {}) with seed {} failed: {reason}",
                    task.scenario, task.repetition, task.seed
                );
                failed.push(FailedTask {
                    scenario: task.scenario,
                    repetition: task.repetition,
                    seed: task.seed,
                    reason,
                });
            }

            match tracker.join() {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Progress output failed: {e}"),
                Err(_) => warn!("Progress tracker panicked"),
            }
        });

        let elapsed = start.elapsed();
        failed.sort_unstable_by_key(|f: &FailedTask| (f.scenario, f.repetition));
        info!(
            "Processing finished in {:.3} seconds, {} of {n_tasks} tasks failed",
            elapsed.as_secs_f64(),
            failed.len()
        );

        Ok(ExperimentResult {
            tables,
            failed,
            elapsed,
        })
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        /// 基于 `rayon` 线程池的任务分发.
        struct Dispatcher(ThreadPool);

        impl Dispatcher {
            fn new(workers: usize) -> Result<Self, ExperimentError> {
                ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("iva-worker-{i}"))
                    .build()
                    .map(Self)
                    .map_err(ExperimentError::ThreadPool)
            }

            #[inline]
            fn workers(&self) -> usize {
                self.0.current_num_threads()
            }

            /// 阻塞直到所有任务结束.
            fn dispatch<F>(&self, tasks: Vec<Task>, job: F)
            where
                F: Fn(Task) + Sync,
            {
                let job = &job;
                self.0.scope(|s| {
                    for task in tasks {
                        s.spawn(move |_| job(task));
                    }
                });
            }
        }
    } else {
        /// 在 [`Experiment::run`] 启动的单个分发线程上依次执行.
        struct Dispatcher;

        impl Dispatcher {
            fn new(workers: usize) -> Result<Self, ExperimentError> {
                if workers > 1 {
                    warn!("Feature `rayon` is disabled, running tasks sequentially");
                }
                Ok(Self)
            }

            #[inline]
            fn workers(&self) -> usize {
                1
            }

            fn dispatch<F>(&self, tasks: Vec<Task>, job: F)
            where
                F: Fn(Task) + Sync,
            {
                tasks.into_iter().for_each(job);
            }
        }
    }
}
