//! 实验配置.
//!
//! 配置以 JSON 形式存储, 字段与持久化结果中的 `config.npy` 一致.

use crate::bss::{Distribution, Toolbox};
use crate::consts::{DEFAULT_MASTER_SEED, DEFAULT_N_FRAMES, DEFAULT_N_ITER, DEFAULT_N_REPEAT};
use crate::trial::Scenario;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// 配置错误. 均在任务分发之前检出.
#[derive(Debug)]
pub enum ConfigError {
    /// 读取配置文件失败.
    Io(std::io::Error),

    /// JSON 解析失败.
    Parse(serde_json::Error),

    /// 没有任何场景.
    NoScenario,

    /// 没有任何算法.
    NoAlgorithm,

    /// 重复次数为 0.
    ZeroRepeat,

    /// 帧数为 0.
    ZeroFrames,

    /// 第 `index` 个场景不合法.
    InvalidScenario {
        /// 场景序号.
        index: usize,
        /// 原因.
        reason: &'static str,
    },

    /// 算法名称重复.
    DuplicateAlgoName(String),

    /// 第二个参数 (算法标识) 未注册; 第一个参数为配置中的名称.
    UnknownAlgorithm(String, String),

    /// 算法参数不合法.
    InvalidParam {
        /// 配置中的算法名称.
        name: String,
        /// 原因.
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read config: {e}"),
            Self::Parse(e) => write!(f, "malformed config: {e}"),
            Self::NoScenario => f.write_str("no scenario configured"),
            Self::NoAlgorithm => f.write_str("no algorithm configured"),
            Self::ZeroRepeat => f.write_str("n_repeat must be positive"),
            Self::ZeroFrames => f.write_str("n_frames must be positive"),
            Self::InvalidScenario { index, reason } => {
                write!(f, "scenario #{index}: {reason}")
            }
            Self::DuplicateAlgoName(name) => write!(f, "duplicate algorithm name `{name}`"),
            Self::UnknownAlgorithm(name, algo) => {
                write!(f, "algorithm `{name}`: unknown identifier `{algo}`")
            }
            Self::InvalidParam { name, reason } => write!(f, "algorithm `{name}`: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

/// 场景参数 (不含所有场景共享的帧数和分布).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParams {
    /// 频点数.
    pub n_freq: usize,

    /// 通道数 (等于源数).
    pub n_chan: usize,

    /// 是否以 PCA 白化初始化.
    pub pca: bool,
}

/// 算法参数.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlgoParams {
    /// 迭代次数.
    pub n_iter: usize,

    /// 步长 (梯度类算法).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_size: Option<f64>,

    /// 收敛阈值. 参考实现中的算法不使用该字段, 但会原样保存.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tol: Option<f64>,
}

impl AlgoParams {
    /// 仅指定迭代次数.
    #[inline]
    pub fn with_n_iter(n_iter: usize) -> Self {
        Self {
            n_iter,
            step_size: None,
            tol: None,
        }
    }
}

/// 一个待评测的算法.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlgoSpec {
    /// 结果表中使用的名称, 在配置内唯一.
    pub name: String,

    /// 注册表中的算法标识.
    pub algo: String,

    /// 算法参数.
    pub kwargs: AlgoParams,
}

impl AlgoSpec {
    /// 创建算法描述.
    pub fn new(name: impl Into<String>, algo: impl Into<String>, kwargs: AlgoParams) -> Self {
        Self {
            name: name.into(),
            algo: algo.into(),
            kwargs,
        }
    }
}

/// 完整的实验配置.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// 主种子, 派生所有任务的种子.
    pub master_seed: u64,

    /// 每个场景的重复次数.
    pub n_repeat: usize,

    /// 场景列表, 以下标标识.
    pub params: Vec<ScenarioParams>,

    /// 帧数.
    pub n_frames: usize,

    /// 源分布.
    pub distrib: Distribution,

    /// 算法列表, 结果按此顺序排列.
    pub algos: Vec<AlgoSpec>,
}

impl Default for ExperimentConfig {
    /// 6 个频点, 4/6/8 通道, 分别以 PCA 与单位阵初始化, 共 6 个场景.
    fn default() -> Self {
        let params = [true, false]
            .into_iter()
            .flat_map(|pca| {
                [4, 6, 8].map(|n_chan| ScenarioParams {
                    n_freq: 6,
                    n_chan,
                    pca,
                })
            })
            .collect();

        let ng = AlgoParams {
            step_size: Some(0.3),
            ..AlgoParams::with_n_iter(DEFAULT_N_ITER)
        };
        let algos = vec![
            AlgoSpec::new("iva-ng-0.3", "iva-ng", ng),
            AlgoSpec::new("auxiva", "auxiva", AlgoParams::with_n_iter(DEFAULT_N_ITER)),
            AlgoSpec::new(
                "auxiva-iss",
                "auxiva-iss",
                AlgoParams::with_n_iter(DEFAULT_N_ITER),
            ),
        ];

        Self {
            master_seed: DEFAULT_MASTER_SEED,
            n_repeat: DEFAULT_N_REPEAT,
            params,
            n_frames: DEFAULT_N_FRAMES,
            distrib: Distribution::Laplace,
            algos,
        }
    }
}

impl ExperimentConfig {
    /// 从 JSON 字符串解析.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Parse)
    }

    /// 从 JSON 文件解析.
    pub fn from_json_file<P: AsRef<Path>>(p: P) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(p).map_err(ConfigError::Io)?;
        Self::from_json_str(&s)
    }

    /// 序列化为 JSON.
    pub fn to_json(&self) -> String {
        // 所有字段均可无损序列化
        serde_json::to_string(self).unwrap_or_default()
    }

    /// 按下标顺序展开的完整场景.
    pub fn scenarios(&self) -> impl Iterator<Item = Scenario> + '_ {
        self.params.iter().map(|p| Scenario {
            n_freq: p.n_freq,
            n_chan: p.n_chan,
            n_frames: self.n_frames,
            distrib: self.distrib,
            pca: p.pca,
        })
    }

    /// 任务总数.
    #[inline]
    pub fn n_tasks(&self) -> usize {
        self.params.len() * self.n_repeat
    }

    /// 检查配置. 所有算法必须能在 `toolbox` 中找到, 且参数合法.
    pub fn validate(&self, toolbox: &dyn Toolbox) -> Result<(), ConfigError> {
        if self.params.is_empty() {
            return Err(ConfigError::NoScenario);
        }
        if self.algos.is_empty() {
            return Err(ConfigError::NoAlgorithm);
        }
        if self.n_repeat == 0 {
            return Err(ConfigError::ZeroRepeat);
        }
        if self.n_frames == 0 {
            return Err(ConfigError::ZeroFrames);
        }

        for (index, p) in self.params.iter().enumerate() {
            let reason = if p.n_freq == 0 {
                "n_freq must be positive"
            } else if p.n_chan < 2 {
                "at least 2 channels are required"
            } else if self.n_frames < p.n_chan {
                "fewer frames than channels"
            } else {
                continue;
            };
            return Err(ConfigError::InvalidScenario { index, reason });
        }

        let mut seen = HashSet::with_capacity(self.algos.len());
        for spec in self.algos.iter() {
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::DuplicateAlgoName(spec.name.clone()));
            }
            let algo = toolbox
                .algorithm(&spec.algo)
                .ok_or_else(|| ConfigError::UnknownAlgorithm(spec.name.clone(), spec.algo.clone()))?;
            if spec.kwargs.tol.is_some_and(|t| !(t.is_finite() && t >= 0.0)) {
                return Err(ConfigError::InvalidParam {
                    name: spec.name.clone(),
                    reason: "tol 必须为非负有限数",
                });
            }
            algo.check_params(&spec.kwargs)
                .map_err(|reason| ConfigError::InvalidParam {
                    name: spec.name.clone(),
                    reason,
                })?;
        }
        Ok(())
    }
}
