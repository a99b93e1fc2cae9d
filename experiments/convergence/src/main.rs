//! 对参考实现中的 IVA 算法做收敛性评测, 结果保存在 `$IVA_OUTPUT_DIR` 下.

mod result;
mod runner;

use log::error;
use std::process::ExitCode;
use utils::loader;

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new()
        .with_level(loader::log_level_from_env())
        .init()
        .unwrap();

    match runner::run() {
        Ok(res) => {
            res.analyze();
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
