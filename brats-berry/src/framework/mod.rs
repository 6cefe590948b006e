//! 多通道堆叠加载流水线.
//!
//! 每个样本引用四个成像模态和一个标注. 通过 [`Compose`] 组合的变换在
//! [`LazyDataset::get`] 时才执行, 数据集本身只保存路径.

use std::path::PathBuf;

use ndarray::{Array3, Array4};

use crate::dataset::PatientPaths;
use crate::error::TransformError;

mod transforms;
mod visualize;

pub use transforms::{Compose, EnsureChannelFirst, LoadImage, NormalizeIntensity, Transform};
pub use visualize::{blend_images, montage, side_by_side, SideBySide};

/// 流水线中流动的样本.
#[derive(Debug, Clone, Default)]
pub struct Sample {
    /// 成像模态文件, 加载后按此顺序成为各通道.
    pub image_paths: Vec<PathBuf>,

    /// 标注文件.
    pub label_path: PathBuf,

    /// 堆叠后的影像. 加载前为 `None`.
    pub image: Option<Array4<f32>>,

    /// 影像是否已是 `[c, x, y, z]` 顺序. 否则为 `[x, y, z, c]`.
    pub channel_first: bool,

    /// 标注. 加载前为 `None`.
    pub label: Option<Array3<f32>>,

    /// 体素分辨率.
    pub spacing: Vec<f64>,
}

impl Sample {
    /// 由一个患者的文件路径创建未加载的样本.
    pub fn from_patient(paths: &PatientPaths) -> Self {
        Self {
            image_paths: paths.imaging().iter().map(|p| p.to_path_buf()).collect(),
            label_path: paths.mask().to_path_buf(),
            ..Default::default()
        }
    }

    /// 影像形状.
    pub fn image_shape(&self) -> Option<&[usize]> {
        self.image.as_ref().map(|i| i.shape())
    }

    /// 标注形状.
    pub fn label_shape(&self) -> Option<&[usize]> {
        self.label.as_ref().map(|l| l.shape())
    }
}

/// 惰性数据集: 访问时才加载并变换.
pub struct LazyDataset {
    items: Vec<Sample>,
    transform: Compose,
}

impl LazyDataset {
    /// 由未加载样本和变换创建.
    pub fn new(items: Vec<Sample>, transform: Compose) -> Self {
        Self { items, transform }
    }

    /// 由患者列表创建.
    pub fn from_patients(patients: &[PatientPaths], transform: Compose) -> Self {
        Self::new(patients.iter().map(Sample::from_patient).collect(), transform)
    }

    /// 样本个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 数据集是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 加载并变换第 `index` 个样本. 每次调用都重新执行变换, 结果不缓存.
    pub fn get(&self, index: usize) -> Result<Sample, TransformError> {
        let item = self.items.get(index).ok_or(TransformError::OutOfRange {
            index,
            len: self.items.len(),
        })?;
        self.transform.apply(item.clone())
    }
}
