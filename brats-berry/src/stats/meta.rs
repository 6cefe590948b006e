//! 体数据元信息提取与汇总.

use std::fmt;
use std::path::Path;

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::data::{Modality, VolumeBackend};
use crate::dataset::PatientPaths;
use crate::error::LoadError;

/// 单个体数据文件的元信息.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolumeMeta {
    /// 整个 3D 数组上的强度最小值.
    pub min: f32,

    /// 整个 3D 数组上的强度最大值.
    pub max: f32,

    /// 文件头记录的形状.
    pub shape: Vec<usize>,

    /// 文件头记录的体素分辨率.
    pub spacing: Vec<f64>,
}

impl fmt::Display for VolumeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {:?}, {:?})",
            self.min, self.max, self.shape, self.spacing
        )
    }
}

/// 用给定后端加载 `path` 并提取其元信息.
///
/// 后端无法打开文件时直接返回错误, 不会尝试另一个后端.
pub fn extract_meta(backend: &dyn VolumeBackend, path: &Path) -> Result<VolumeMeta, LoadError> {
    let volume = backend.load(path)?;
    let (min, max) = volume.min_max().ok_or_else(|| LoadError::Malformed {
        path: path.to_owned(),
        reason: "volume holds no comparable voxel".to_string(),
    })?;
    let (x, y, z) = volume.shape();
    Ok(VolumeMeta {
        min,
        max,
        shape: vec![x, y, z],
        spacing: volume.spacing().to_vec(),
    })
}

/// 一个患者四个成像模态的元信息, 即元信息表中的一行 (12 列).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatientMeta {
    /// 患者 ID.
    pub id: String,

    /// 顺序同 [`Modality::IMAGING`].
    pub modalities: [VolumeMeta; 4],
}

impl PatientMeta {
    /// 提取一个患者的全部成像模态元信息.
    pub fn extract(backend: &dyn VolumeBackend, paths: &PatientPaths) -> Result<Self, LoadError> {
        let [flair, t1, t1ce, t2] = paths.imaging();
        let ans = Self {
            id: paths.id.clone(),
            modalities: [
                extract_meta(backend, flair)?,
                extract_meta(backend, t1)?,
                extract_meta(backend, t1ce)?,
                extract_meta(backend, t2)?,
            ],
        };
        log::debug!("meta of `{}` extracted", ans.id);
        Ok(ans)
    }

    /// 获取某个成像模态的元信息.
    ///
    /// # Panics
    ///
    /// `modality` 为 [`Modality::Mask`] 时 panic.
    #[inline]
    pub fn get(&self, modality: Modality) -> &VolumeMeta {
        assert!(modality.is_imaging(), "mask has no intensity meta");
        &self.modalities[modality as usize]
    }
}

/// 需要拆解为长表的统计量.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stat {
    /// 强度最小值.
    Min,

    /// 强度最大值.
    Max,
}

impl Stat {
    /// 从元信息中取出对应统计量.
    #[inline]
    pub fn of(&self, meta: &VolumeMeta) -> f32 {
        match self {
            Self::Min => meta.min,
            Self::Max => meta.max,
        }
    }

    /// 列名后缀.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// 长表中的一行: (患者, 模态, 统计量取值).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LongRow {
    /// 患者 ID.
    pub patient: String,

    /// 所属模态.
    pub modality: Modality,

    /// 统计量取值.
    pub value: f32,
}

/// 元信息表. 每个患者一行.
#[derive(Debug, Clone, Default)]
pub struct MetaTable {
    rows: Vec<PatientMeta>,
}

impl MetaTable {
    /// 逐个患者顺序提取元信息. 任一文件失败即返回.
    pub fn build(backend: &dyn VolumeBackend, patients: &[PatientPaths]) -> Result<Self, LoadError> {
        let rows = patients
            .iter()
            .map(|p| PatientMeta::extract(backend, p))
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("meta table built: {} rows", rows.len());
        Ok(Self { rows })
    }

    /// 从已有行创建.
    #[inline]
    pub fn from_rows(rows: Vec<PatientMeta>) -> Self {
        Self { rows }
    }

    /// 所有行.
    #[inline]
    pub fn rows(&self) -> &[PatientMeta] {
        &self.rows
    }

    /// 行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 表是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 某个模态出现过的所有形状, 按首次出现的顺序排列.
    pub fn unique_shapes(&self, modality: Modality) -> Vec<Vec<usize>> {
        self.rows
            .iter()
            .map(|r| r.get(modality).shape.clone())
            .unique()
            .collect()
    }

    /// 某个模态出现过的所有体素分辨率, 按首次出现的顺序排列.
    pub fn unique_spacings(&self, modality: Modality) -> Vec<Vec<f64>> {
        self.rows
            .iter()
            .map(|r| {
                r.get(modality)
                    .spacing
                    .iter()
                    .copied()
                    .map(OrderedFloat)
                    .collect::<Vec<_>>()
            })
            .unique()
            .map(|s| s.into_iter().map(OrderedFloat::into_inner).collect())
            .collect()
    }

    /// 某个模态某个统计量的整列取值.
    pub fn column(&self, modality: Modality, stat: Stat) -> Vec<f32> {
        self.rows.iter().map(|r| stat.of(r.get(modality))).collect()
    }

    /// 将四个模态的某个统计量列拆解为长表.
    ///
    /// 行按模态分组: 先是所有患者的 flair, 然后是 t1, 依此类推.
    pub fn melt(&self, stat: Stat) -> Vec<LongRow> {
        Modality::IMAGING
            .into_iter()
            .flat_map(|m| {
                self.rows.iter().map(move |r| LongRow {
                    patient: r.id.clone(),
                    modality: m,
                    value: stat.of(r.get(m)),
                })
            })
            .collect()
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl MetaTable {
    /// 借助 `rayon`, 并行地提取元信息. 结果顺序与 `patients` 一致.
    pub fn par_build(
        backend: &dyn VolumeBackend,
        patients: &[PatientPaths],
    ) -> Result<Self, LoadError> {
        let rows = patients
            .par_iter()
            .map(|p| PatientMeta::extract(backend, p))
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("meta table built in parallel: {} rows", rows.len());
        Ok(Self { rows })
    }
}
