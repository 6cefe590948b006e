use std::collections::BTreeSet;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use ndarray::{Array3, ArrayView3};

use crate::Idx3d;

pub mod backend;
pub mod colormap;
pub mod window;

pub use backend::{BackendKind, NiftiRsBackend, RawBackend, VolumeBackend};
pub use colormap::{Colormap, DiscreteColormap};
pub use window::IntensityWindow;

/// MRI 成像模态, 以及同目录下的分割标注.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Modality {
    /// 液体衰减反转恢复序列.
    Flair,

    /// T1 加权.
    T1,

    /// T1 加权 + 钆造影增强.
    T1ce,

    /// T2 加权.
    T2,

    /// 分割标注 (不是成像模态, 但与模态按同样的方式组织).
    Mask,
}

impl Modality {
    /// 四个成像模态, 按数据集惯用顺序排列.
    pub const IMAGING: [Modality; 4] = [Self::Flair, Self::T1, Self::T1ce, Self::T2];

    /// 全部五种文件, 标注位于最后.
    pub const ALL: [Modality; 5] = [Self::Flair, Self::T1, Self::T1ce, Self::T2, Self::Mask];

    /// 列名 / 文件名中使用的小写名字.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Flair => "flair",
            Self::T1 => "t1",
            Self::T1ce => "t1ce",
            Self::T2 => "t2",
            Self::Mask => "mask",
        }
    }

    /// 文件名后缀. 注意标注文件的后缀是 `_seg.nii` 而不是 `_mask.nii`.
    pub const fn file_suffix(&self) -> &'static str {
        match self {
            Self::Flair => "_flair.nii",
            Self::T1 => "_t1.nii",
            Self::T1ce => "_t1ce.nii",
            Self::T2 => "_t2.nii",
            Self::Mask => "_seg.nii",
        }
    }

    /// 是否是成像模态.
    #[inline]
    pub const fn is_imaging(&self) -> bool {
        !matches!(self, Self::Mask)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Modality::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown modality `{s}`"))
    }
}

/// 解码后的 3D 体数据.
///
/// 体素以 `f32` 保存, 并保持文件本身的 `[x, y, z]` 索引顺序.
/// 形状和分辨率直接取自文件头, 不做任何重排.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<f32>,
    spacing: Vec<f64>,
    dtype: String,
}

impl Volume {
    /// 直接创建体数据. `spacing` 按 `[x, y, z]` 顺序给出.
    pub fn new(data: Array3<f32>, spacing: Vec<f64>, dtype: impl Into<String>) -> Self {
        Self {
            data,
            spacing,
            dtype: dtype.into(),
        }
    }

    /// 获取数据形状, 与文件头记录的顺序一致.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取体素分辨率 (通常以毫米为单位).
    #[inline]
    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    /// 文件中记录的原始体素类型名.
    #[inline]
    pub fn dtype(&self) -> &str {
        &self.dtype
    }

    /// 在 **整个** 体数据上求强度最小值和最大值. NaN 被忽略.
    ///
    /// 空数据或全 NaN 数据返回 `None`.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// 体数据中出现过的所有不同取值. 非整数值会按四舍五入归并.
    ///
    /// 该操作通常用于标注数据.
    pub fn distinct_labels(&self) -> BTreeSet<i64> {
        self.data
            .iter()
            .filter(|v| v.is_finite())
            .map(|v| v.round() as i64)
            .collect()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 消费自我, 获得底层数据.
    #[inline]
    pub fn into_data(self) -> Array3<f32> {
        self.data
    }
}

impl Index<Idx3d> for Volume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_modality_names_round_trip_through_from_str() {
        for m in Modality::ALL {
            assert_eq!(m.name().parse::<Modality>().unwrap(), m);
        }
        assert!("seg".parse::<Modality>().is_err());
        assert_eq!(Modality::Mask.file_suffix(), "_seg.nii");
        assert!(!Modality::Mask.is_imaging());
    }

    #[test]
    fn test_min_max_spans_whole_volume() {
        let mut data = Array3::<f32>::zeros((3, 4, 5));
        // 极值分别放在不同的切片上.
        data[(0, 0, 4)] = 917.0;
        data[(2, 3, 0)] = -3.0;
        data[(1, 1, 2)] = f32::NAN;
        let v = Volume::new(data, vec![1.0, 1.0, 1.0], "int16");
        assert_eq!(v.min_max(), Some((-3.0, 917.0)));
        assert_eq!(v.data().len(), 60);
        assert_eq!(v[(0, 0, 4)], 917.0);
    }

    #[test]
    fn test_distinct_labels() {
        let data = Array3::from_shape_vec((1, 2, 3), vec![0.0, 1.0, 2.0, 4.0, 4.0, 0.0]).unwrap();
        let v = Volume::new(data, vec![1.0, 1.0, 2.0], "uint8");
        assert_eq!(v.distinct_labels(), BTreeSet::from([0, 1, 2, 4]));
    }
}
