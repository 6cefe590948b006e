//! BraTS 2020 训练集探索性分析.
//!
//! 数据集位置与解码后端由环境变量决定, 见 `utils::loader`.

mod result;
mod runner;

use anyhow::anyhow;

fn main() -> anyhow::Result<()> {
    simple_logger::init_with_env()?;

    let cfg = utils::loader::config_from_env_or_home().map_err(|e| anyhow!(e))?;
    let report = runner::run(&cfg)?;
    report.analyze()?;
    Ok(())
}
