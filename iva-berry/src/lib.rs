#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 在合成的多通道频域混合信号上, 对多种 IVA (Independent Vector Analysis)
//! 盲源分离算法的收敛过程做蒙特卡洛评测.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 所有信号张量按 `(频点, 通道, 帧)` 排布, 所有分离/混合矩阵按
//!   `(频点, 行, 列)` 排布. 二者均为 `Complex64`.
//! 2. 调用方传入形状不一致的张量时, 程序会直接 panic; 数值上的退化
//!   (如对角项为零) 则以 `Err` 形式返回.
//!
//! # 开发计划
//!
//! ### 置换/尺度不变的分离质量指标 ✅
//!
//! 先用最优指派 (非贪心) 解决输出通道的置换, 再计算 ISR.
//!
//! 实现位于 `iva-berry/src/metric`.
//!
//! ### 单次试验执行器 ✅
//!
//! 给定场景与种子, 生成一次随机混合, 运行所有算法并在检查点记录 ISR 与代价函数.
//!
//! 实现位于 `iva-berry/src/trial.rs`.
//!
//! ### 任务生成, 进度追踪, 并行调度与结果汇总 ✅
//!
//! 1. 主种子派生每个任务的种子, 打乱顺序只影响调度; ✅
//! 2. 进度线程只读完成信号, 不阻塞任何 worker; ✅
//! 3. 结果按 `(场景, 重复序号)` 回填, 与完成顺序无关. ✅
//!
//! 实现位于 `iva-berry/src/{task, progress, experiment}`.
//!
//! ### 参考用的分离算法与混合信号生成 ✅
//!
//! AuxIVA-IP, AuxIVA-ISS, 自然梯度 IVA, PCA 白化, 随机混合生成.
//! 仅供评测框架与测试使用, 不追求性能.
//!
//! 实现位于 `iva-berry/src/bss`.
//!
//! ### IP2 等 "双通道更新" 算法 ⌛️
//!
//! 注册表已支持 `is_dual_update` 标记, 检查点间隔随之变化.

use ndarray::Array3;

/// 复数标量类型.
pub type C64 = num::complex::Complex64;

/// 多通道频域信号, 形状为 `(频点, 通道, 帧)`.
pub type Signals = Array3<C64>;

/// 逐频点的方阵组, 形状为 `(频点, 行, 列)`.
pub type Filters = Array3<C64>;

pub mod bss;
pub mod config;
pub mod consts;
pub mod experiment;
pub mod linalg;
pub mod metric;
pub mod prelude;
pub mod progress;
pub mod task;
pub mod trial;
