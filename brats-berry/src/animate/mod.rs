//! 多模态体数据逐层切片动画.
//!
//! [`SliceAnimation`] 只负责组织数据: 它把每一层切片打包成一个 [`Frame`],
//! 以可重复遍历的有限序列给出. 如何呈现 (单帧导出, gif 编码) 见 `render` 子模块.

use std::collections::BTreeSet;

use image::Rgb;
use ndarray::{Array3, ArrayView2, ArrayView3, Axis};

use crate::config::AnimationConfig;
use crate::consts::label::{is_background, region_name};
use crate::data::{Colormap, DiscreteColormap, IntensityWindow, Modality};
use crate::dataset::PatientVolumes;
use crate::error::AnimationError;
use crate::{Idx2d, Idx3d};

mod render;

/// 将 `[x, y, z]` 顺序的体数据转为以切片为首轴的顺序.
///
/// 若 `rotate` 为真, 先在 (0, 1) 平面内旋转 -90°, 即 `out[i, j, k] = in[n0 - 1 - j, i, k]`;
/// 然后将轴 (2, 0, 1) 转置到前面. 返回标准内存布局的新数组.
pub fn orient_for_slicing(data: ArrayView3<'_, f32>, rotate: bool) -> Array3<f32> {
    let mut v = data;
    if rotate {
        v.swap_axes(0, 1);
        v.invert_axis(Axis(1));
    }
    v.permuted_axes([2, 0, 1]).as_standard_layout().into_owned()
}

/// 图例中的一项.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    /// 标签值.
    pub label: i64,

    /// 该标签在叠加层中的颜色.
    pub color: Rgb<u8>,

    /// 肿瘤区域名.
    pub name: String,
}

/// 一层切片上的全部画面.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    /// 切片下标.
    pub index: usize,

    /// 各模态在该层的切片, 顺序同构造时给出的顺序.
    pub panels: Vec<(Modality, ArrayView2<'a, f32>)>,

    /// 标注在该层的切片. 未要求叠加标注时为 `None`.
    pub mask: Option<ArrayView2<'a, f32>>,
}

/// 一个患者的逐层切片动画.
#[derive(Debug, Clone)]
pub struct SliceAnimation {
    case: String,
    volumes: Vec<(Modality, Array3<f32>)>,
    windows: Vec<IntensityWindow>,
    mask: Option<(Array3<f32>, DiscreteColormap)>,
    legend: Vec<LegendEntry>,
    config: AnimationConfig,
}

impl SliceAnimation {
    /// 由已经转为切片优先顺序的体数据创建动画.
    ///
    /// 所有体数据 (包括 `mask`) 的形状必须一致. `mask` 为 `None` 时不叠加标注.
    pub fn new(
        volumes: Vec<(Modality, Array3<f32>)>,
        mask: Option<Array3<f32>>,
        case: impl Into<String>,
    ) -> Result<Self, AnimationError> {
        let shape: Idx3d = volumes.first().ok_or(AnimationError::Empty)?.1.dim();
        for other in volumes.iter().map(|(_, v)| v).chain(mask.iter()) {
            if other.dim() != shape {
                return Err(AnimationError::ShapeMismatch(shape, other.dim()));
            }
        }

        let windows = volumes
            .iter()
            .map(|(_, v)| {
                let (lo, hi) = min_max(v).unwrap_or((0.0, 0.0));
                IntensityWindow::from_range(lo, hi).ok_or(AnimationError::Empty)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mask = mask.map(|m| {
            let (lo, hi) = min_max(&m).unwrap_or((0.0, 0.0));
            // 每个整数标签值各占一个色块.
            let levels = hi.max(0.0) as usize + 1;
            let cmap = DiscreteColormap::new(Colormap::Jet, levels, lo, hi);
            (m, cmap)
        });

        let case = case.into();
        let legend = mask
            .as_ref()
            .map(|(m, cmap)| legend_of(m, cmap, &case))
            .unwrap_or_default();

        Ok(Self {
            case,
            volumes,
            windows,
            mask,
            legend,
            config: AnimationConfig::default(),
        })
    }

    /// 从一个患者的体数据创建四模态动画. 按 `config` 决定是否旋转.
    pub fn from_patient(
        patient: &PatientVolumes,
        config: AnimationConfig,
        show_mask: bool,
    ) -> Result<Self, AnimationError> {
        let volumes = Modality::IMAGING
            .into_iter()
            .map(|m| {
                let data = orient_for_slicing(patient.volume(m).data(), config.rotate);
                (m, data)
            })
            .collect();
        let mask = show_mask
            .then(|| orient_for_slicing(patient.mask.data(), config.rotate));
        Ok(Self::new(volumes, mask, patient.id.clone())?.with_config(config))
    }

    /// 替换动画参数.
    #[inline]
    pub fn with_config(mut self, config: AnimationConfig) -> Self {
        self.config = config;
        self
    }

    /// 病例名.
    #[inline]
    pub fn case(&self) -> &str {
        &self.case
    }

    /// 动画参数.
    #[inline]
    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// 切片层数, 即帧数.
    #[inline]
    pub fn len(&self) -> usize {
        self.volumes[0].1.len_of(Axis(0))
    }

    /// 是否没有任何切片.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 单层切片的 `(高, 宽)`.
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.volumes[0].1.dim();
        (h, w)
    }

    /// 是否叠加标注.
    #[inline]
    pub fn shows_mask(&self) -> bool {
        self.mask.is_some()
    }

    /// 每帧停留时长 (毫秒). 总时长固定, 与层数无关.
    #[inline]
    pub fn frame_delay_ms(&self) -> u32 {
        self.config.total_ms / self.len().max(1) as u32
    }

    /// 按层序遍历所有帧. 每次调用都从第 0 层重新开始.
    pub fn frames(&self) -> Frames<'_> {
        Frames {
            animation: self,
            next: 0,
            end: self.len(),
        }
    }

    /// 标注中出现的非背景标签, 及其颜色与区域名. 在构造时计算一次.
    #[inline]
    pub fn legend(&self) -> &[LegendEntry] {
        &self.legend
    }

    #[inline]
    fn window(&self, panel: usize) -> &IntensityWindow {
        &self.windows[panel]
    }

    #[inline]
    fn mask_cmap(&self) -> Option<&DiscreteColormap> {
        self.mask.as_ref().map(|(_, c)| c)
    }

    fn frame(&self, index: usize) -> Frame<'_> {
        Frame {
            index,
            panels: self
                .volumes
                .iter()
                .map(|(m, v)| (*m, v.index_axis(Axis(0), index)))
                .collect(),
            mask: self
                .mask
                .as_ref()
                .map(|(m, _)| m.index_axis(Axis(0), index)),
        }
    }
}

/// 扫描整个标注, 列出出现过的非背景标签.
fn legend_of(mask: &Array3<f32>, cmap: &DiscreteColormap, case: &str) -> Vec<LegendEntry> {
    let present: BTreeSet<i64> = mask
        .iter()
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i64)
        .filter(|&l| !is_background(l))
        .collect();
    log::debug!("labels present in `{case}`: {:?}", present);

    present
        .into_iter()
        .map(|label| LegendEntry {
            label,
            color: cmap.rgb8(label as f32),
            name: region_name(label)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Label {label}")),
        })
        .collect()
}

/// 整个体数据上的有限值范围.
fn min_max(data: &Array3<f32>) -> Option<(f32, f32)> {
    data.iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// [`SliceAnimation`] 的帧迭代器.
pub struct Frames<'a> {
    animation: &'a SliceAnimation,
    next: usize,
    end: usize,
}

impl<'a> Iterator for Frames<'a> {
    type Item = Frame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let frame = self.animation.frame(self.next);
        self.next += 1;
        Some(frame)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Frames<'_> {}

impl std::iter::FusedIterator for Frames<'_> {}
