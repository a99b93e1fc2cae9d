//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Filters, Signals, C64};

pub use crate::bss::{Bss, BssError, Checkpoint, Distribution, RandMixture, Separator, Toolbox};
pub use crate::config::{AlgoParams, AlgoSpec, ConfigError, ExperimentConfig, ScenarioParams};
pub use crate::metric::{isr, linear_sum_assignment, separation_error, MetricError};

pub use crate::experiment::{
    default_filename, save_npz, ColumnMismatch, Experiment, ExperimentError, ExperimentResult,
    FailedTask, ResultTables, SaveError,
};
pub use crate::progress::{Done, ProgressTracker};
pub use crate::task::{Task, TaskGenerator};
pub use crate::trial::{run_trial, Scenario, Trajectory, TrialError};
