//! 通用常量.

/// 默认主种子.
pub const DEFAULT_MASTER_SEED: u64 = 8856641;

/// 每个场景默认的重复次数.
pub const DEFAULT_N_REPEAT: usize = 1000;

/// 默认帧数.
pub const DEFAULT_N_FRAMES: usize = 5000;

/// 默认迭代次数.
pub const DEFAULT_N_ITER: usize = 100;

/// 源模型权重计算时, 对源向量范数的下限截断, 防止除零.
pub const EPS_NORM: f64 = 1e-15;

/// 结果存档文件名的后缀.
pub const RESULT_FILE_SUFFIX: &str = "experiment_iva_results.npz";

/// 时间戳格式, 用于进度输出和存档文件名.
pub const DATE_FORMAT: &str = "%Y%m%d-%H%M%S";
