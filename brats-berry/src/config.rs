//! 数据集路径与各阶段参数.
//!
//! 所有阶段都显式接收配置, 而不读取任何全局状态, 以便在测试中替换成合成目录.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;

use crate::consts::label::EXPECTED_LABELS;
use crate::data::BackendKind;

/// 已知的目录名异常: 原始片段 -> 规范患者编号.
///
/// 训练集中有一个目录名的编号段是日期 `1998.09.19`, 它实际对应 355 号患者.
/// 目录命名为何会与约定冲突尚未查明, 这里只做映射.
static DEFAULT_ID_OVERRIDES: Lazy<BTreeMap<String, u32>> =
    Lazy::new(|| BTreeMap::from([("1998.09.19".to_string(), 355)]));

/// 切片动画参数.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationConfig {
    /// 标注叠加层的不透明度.
    pub alpha: f32,

    /// 整段动画的总时长 (毫秒), 与切片数无关.
    pub total_ms: u32,

    /// 循环播放时的停顿 (毫秒).
    pub repeat_delay_ms: u32,

    /// 加载后是否先做 -90° 旋转.
    pub rotate: bool,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            total_ms: 5000,
            repeat_delay_ms: 1000,
            rotate: true,
        }
    }
}

/// EDA 全流程配置.
#[derive(Debug, Clone)]
pub struct EdaConfig {
    /// 数据集根目录.
    pub base_path: PathBuf,

    /// 训练集患者目录所在位置.
    pub train_path: PathBuf,

    /// 验证集患者目录所在位置. 目前没有阶段读取它.
    pub valid_path: PathBuf,

    /// 训练集名称映射表. 目前没有阶段读取它.
    pub train_meta_csv: PathBuf,

    /// 训练集生存信息表.
    pub train_survival_csv: PathBuf,

    /// 验证集名称映射表. 目前没有阶段读取它.
    pub valid_meta_csv: PathBuf,

    /// 验证集生存信息表. 目前没有阶段读取它.
    pub valid_survival_csv: PathBuf,

    /// 体数据解码后端.
    pub backend: BackendKind,

    /// 患者编号覆盖表.
    pub id_overrides: BTreeMap<String, u32>,

    /// 完整标注应当包含的标签集合.
    pub expected_labels: BTreeSet<i64>,

    /// 动画参数.
    pub animation: AnimationConfig,

    /// 若非空, 渲染出的图像会写入该目录.
    pub export_dir: Option<PathBuf>,
}

impl EdaConfig {
    /// 以 `base` 为数据集根目录, 按 BraTS 2020 发布包的目录结构推导其余路径.
    pub fn with_base<P: AsRef<Path>>(base: P) -> Self {
        let base_path = base.as_ref().to_owned();
        let train_path = base_path
            .join("BraTS2020_TrainingData")
            .join("MICCAI_BraTS2020_TrainingData");
        let valid_path = base_path
            .join("BraTS2020_ValidationData")
            .join("MICCAI_BraTS2020_ValidationData");

        Self {
            train_meta_csv: train_path.join("name_mapping.csv"),
            train_survival_csv: train_path.join("survival_info.csv"),
            valid_meta_csv: valid_path.join("name_mapping.csv"),
            valid_survival_csv: valid_path.join("survival_info.csv"),
            base_path,
            train_path,
            valid_path,
            backend: BackendKind::default(),
            id_overrides: DEFAULT_ID_OVERRIDES.clone(),
            expected_labels: EXPECTED_LABELS.into_iter().collect(),
            animation: AnimationConfig::default(),
            export_dir: None,
        }
    }

    /// 替换解码后端.
    #[inline]
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// 设置图像导出目录.
    #[inline]
    pub fn export_dir<P: Into<PathBuf>>(mut self, dir: Option<P>) -> Self {
        self.export_dir = dir.map(Into::into);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_derives_all_paths() {
        let cfg = EdaConfig::with_base("/data/brats");
        assert_eq!(
            cfg.train_survival_csv,
            Path::new(
                "/data/brats/BraTS2020_TrainingData/MICCAI_BraTS2020_TrainingData/survival_info.csv"
            )
        );
        assert_eq!(
            cfg.valid_meta_csv,
            Path::new(
                "/data/brats/BraTS2020_ValidationData/MICCAI_BraTS2020_ValidationData/name_mapping.csv"
            )
        );
        assert_eq!(cfg.id_overrides.get("1998.09.19"), Some(&355));
        assert_eq!(cfg.expected_labels, BTreeSet::from([0, 1, 2, 4]));
        assert_eq!(cfg.backend, BackendKind::NiftiRs);
        assert!(cfg.export_dir.is_none());
    }

    #[test]
    fn test_builder_style_setters() {
        let cfg = EdaConfig::with_base("x")
            .backend(BackendKind::Raw)
            .export_dir(Some("out"));
        assert_eq!(cfg.backend, BackendKind::Raw);
        assert_eq!(cfg.export_dir.as_deref(), Some(Path::new("out")));
        assert_eq!(cfg.animation.total_ms, 5000);
    }
}
