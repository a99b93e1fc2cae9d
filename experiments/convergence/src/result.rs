//! 实验结果.

use iva_berry::prelude::*;
use std::io::{self, Write};
use std::time::Duration;

/// 一个 (场景, 算法) 单元的最终 ISR 统计.
struct Cell {
    scenario: usize,
    params: ScenarioParams,
    algo: String,
    valid: usize,
    mean: Option<f64>,
    median: Option<f64>,
}

impl Cell {
    /// `last` 为各次重复最后一个检查点的 ISR, 失败的重复为 NaN.
    fn new(scenario: usize, params: ScenarioParams, algo: &str, last: &[f64]) -> Self {
        let mut v: Vec<f64> = last.iter().copied().filter(|x| !x.is_nan()).collect();
        v.sort_unstable_by(f64::total_cmp);

        let mean = (!v.is_empty()).then(|| v.iter().sum::<f64>() / v.len() as f64);
        let median = match v.len() {
            0 => None,
            n if n % 2 == 1 => Some(v[n / 2]),
            n => Some((v[n / 2 - 1] + v[n / 2]) / 2.0),
        };
        Self {
            scenario,
            params,
            algo: algo.to_string(),
            valid: v.len(),
            mean,
            median,
        }
    }
}

/// 将 `cell` 写进 `w` 中.
fn describe_into<W: Write>(cell: &Cell, n_repeat: usize, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn db_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.2} dB"),
            None => "/".to_string(),
        }
    }

    let ScenarioParams {
        n_freq,
        n_chan,
        pca,
    } = cell.params;
    writeln!(
        w,
        "Scenario #{} (n_freq = {n_freq}, n_chan = {n_chan}, pca = {pca}), `{}`:",
        cell.scenario, cell.algo
    )?;
    writeln!(w, "{S4}Valid repetitions: {} / {n_repeat}", cell.valid)?;
    writeln!(w, "{S4}Final ISR (mean): {}", db_to_display(cell.mean))?;
    write!(w, "{S4}Final ISR (median): {}", db_to_display(cell.median))?;
    Ok(())
}

/// 收敛性评测的汇总.
pub struct ConvergenceResult {
    cells: Vec<Cell>,
    n_repeat: usize,
    failed: Vec<FailedTask>,
    elapsed: Duration,
}

impl ConvergenceResult {
    /// 从实验结果汇总.
    pub fn new(config: &ExperimentConfig, result: ExperimentResult) -> Self {
        let cells = result
            .tables
            .cells()
            .map(|(s, algo, isr, _)| {
                let last: Vec<f64> = match isr.ncols() {
                    0 => Vec::new(),
                    n => isr.column(n - 1).to_vec(),
                };
                Cell::new(s, config.params[s], algo, &last)
            })
            .collect();
        Self {
            cells,
            n_repeat: config.n_repeat,
            failed: result.failed,
            elapsed: result.elapsed,
        }
    }

    /// 打印汇总.
    pub fn analyze(&self) {
        utils::sep();
        println!("Finished in {:.3} seconds", self.elapsed.as_secs_f64());
        utils::sep();

        let mut buf = Vec::with_capacity(512);
        for cell in self.cells.iter() {
            if describe_into(cell, self.n_repeat, &mut buf).is_ok() {
                println!("{}", String::from_utf8_lossy(&buf));
            }
            buf.clear();
            utils::sep();
        }

        if !self.failed.is_empty() {
            println!("{} tasks failed:", self.failed.len());
            for f in self.failed.iter() {
                println!(
                    "    scenario #{}, repetition {}, seed {}: {}",
                    f.scenario, f.repetition, f.seed, f.reason
                );
            }
            utils::sep();
        }
    }
}
