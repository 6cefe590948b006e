//! 对 `brats-berry::config` 的更一层封装. 从环境变量或用户目录获取配置.

use brats_berry::config::EdaConfig;
use brats_berry::consts::DEFAULT_DATASET_DIR_NAME;
use brats_berry::data::BackendKind;
use std::env;
use std::path::PathBuf;

/// 数据集根目录的环境变量名.
pub const DATASET_DIR_VAR: &str = "BRATS_DATASET_DIR";

/// 解码后端的环境变量名.
pub const BACKEND_VAR: &str = "BRATS_BACKEND";

/// 图像导出目录的环境变量名.
pub const EXPORT_DIR_VAR: &str = "BRATS_EXPORT_DIR";

/// 取非空的环境变量.
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// 获取 BraTS 2020 数据集根目录.
///
/// 1. 若环境变量 `$BRATS_DATASET_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/brats20-dataset-training-validation`;
/// 3. 找不到用户主目录时返回 `None`.
pub fn dataset_dir_from_env_or_home() -> Option<PathBuf> {
    match non_empty_var(DATASET_DIR_VAR) {
        Some(d) => Some(PathBuf::from(d)),
        None => brats_berry::dataset::home_dataset_dir_with([DEFAULT_DATASET_DIR_NAME]),
    }
}

/// 获取解码后端. `$BRATS_BACKEND` 为空时使用默认后端, 无法识别时返回错误信息.
pub fn backend_from_env() -> Result<BackendKind, String> {
    non_empty_var(BACKEND_VAR).map_or(Ok(BackendKind::default()), |v| v.parse())
}

/// 获取图像导出目录. 仅当 `$BRATS_EXPORT_DIR` 非空时导出.
pub fn export_dir_from_env() -> Option<PathBuf> {
    non_empty_var(EXPORT_DIR_VAR).map(PathBuf::from)
}

/// 汇总上述环境变量, 得到完整配置.
pub fn config_from_env_or_home() -> Result<EdaConfig, String> {
    let base = dataset_dir_from_env_or_home()
        .ok_or_else(|| format!("`${DATASET_DIR_VAR}` is unset and no home directory was found"))?;
    let backend = backend_from_env()?;
    log::info!("dataset root: `{}`, backend: {backend}", base.display());
    Ok(EdaConfig::with_base(base)
        .backend(backend)
        .export_dir(export_dir_from_env()))
}
