//! 程序运行函数.

use crate::result::ConvergenceResult;
use chrono::Local;
use iva_berry::prelude::*;
use log::info;
use std::error::Error;
use std::fs;
use std::io;
use utils::loader;

/// 实际运行.
pub fn run() -> Result<ConvergenceResult, Box<dyn Error>> {
    let config = loader::config_from_env_or_default()?;
    let out_dir = loader::output_dir_from_env_or_default();
    fs::create_dir_all(&out_dir)?;

    let experiment = Experiment::new(config, &Bss).workers(loader::workers_from_env_or_cpus());
    let result = experiment.run(io::stdout())?;

    let path = out_dir.join(default_filename(Local::now()));
    save_npz(&path, experiment.config(), &result)?;
    info!("Results saved to {}", path.display());

    Ok(ConvergenceResult::new(experiment.config(), result))
}
