//! 标注标签集合审计.
//!
//! 审计只统计, 不修改也不丢弃任何标注.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::data::VolumeBackend;
use crate::error::{AuditError, IdParseError};

/// 从标注文件路径中解析患者编号.
///
/// 文件名按 `_` 切分后取倒数第二段, 如 `BraTS20_Training_001_seg.nii` 得到 `1`.
/// 若该片段在 `overrides` 中, 使用覆盖值; 否则必须能解析为整数.
pub fn parse_patient_id(
    path: &Path,
    overrides: &BTreeMap<String, u32>,
) -> Result<u32, IdParseError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let token = name.rsplit('_').nth(1).unwrap_or_default();

    if let Some(&id) = overrides.get(token) {
        log::debug!("patient id token `{token}` overridden to {id}");
        return Ok(id);
    }
    token.parse().map_err(|_| IdParseError {
        path: path.to_owned(),
        token: token.to_string(),
    })
}

/// 审计结果.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaskAudit {
    expected: BTreeSet<i64>,
    labels_per_patient: BTreeMap<u32, BTreeSet<i64>>,
}

impl MaskAudit {
    /// 以期望标签集合创建空审计.
    pub fn new(expected: BTreeSet<i64>) -> Self {
        Self {
            expected,
            labels_per_patient: BTreeMap::new(),
        }
    }

    /// 记录一个患者的标签集合. 同一编号重复记录时以后一次为准.
    pub fn record(&mut self, id: u32, labels: BTreeSet<i64>) {
        if labels != self.expected {
            log::debug!("mask of patient {id} has labels {labels:?}");
        }
        self.labels_per_patient.insert(id, labels);
    }

    /// 期望的标签集合.
    #[inline]
    pub fn expected(&self) -> &BTreeSet<i64> {
        &self.expected
    }

    /// 每个患者的标签集合.
    #[inline]
    pub fn labels_per_patient(&self) -> &BTreeMap<u32, BTreeSet<i64>> {
        &self.labels_per_patient
    }

    /// 某个患者的标注是否完整. 未记录的患者返回 `None`.
    pub fn is_complete(&self, id: u32) -> Option<bool> {
        self.labels_per_patient
            .get(&id)
            .map(|labels| *labels == self.expected)
    }

    /// 已审计的标注个数.
    #[inline]
    pub fn total(&self) -> usize {
        self.labels_per_patient.len()
    }

    /// 标签集合与期望不一致的标注个数.
    pub fn incomplete(&self) -> usize {
        self.labels_per_patient
            .values()
            .filter(|labels| **labels != self.expected)
            .count()
    }

    /// 不完整标注所占百分比. 尚无记录时返回 `None`.
    pub fn incomplete_ratio(&self) -> Option<f64> {
        let total = self.total();
        (total != 0).then(|| self.incomplete() as f64 / total as f64 * 100.0)
    }
}

/// 依次加载 `masks` 中的每个标注文件, 统计其标签集合.
pub fn audit_masks<'a, I>(
    backend: &dyn VolumeBackend,
    masks: I,
    overrides: &BTreeMap<String, u32>,
    expected: &BTreeSet<i64>,
) -> Result<MaskAudit, AuditError>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut audit = MaskAudit::new(expected.clone());
    for path in masks {
        let id = parse_patient_id(path, overrides)?;
        let labels = backend.load(path)?.distinct_labels();
        audit.record(id, labels);
    }
    if audit.incomplete() > 0 {
        log::warn!(
            "{} of {} masks do not carry exactly the labels {:?}",
            audit.incomplete(),
            audit.total(),
            audit.expected()
        );
    }
    Ok(audit)
}
