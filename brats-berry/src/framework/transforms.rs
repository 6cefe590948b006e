//! 可组合的样本变换.

use std::iter::Sum;

use ndarray::{stack, Array4, ArrayViewMut3, Axis};
use num::Float;

use super::Sample;
use crate::data::{BackendKind, VolumeBackend};
use crate::error::TransformError;

/// 对样本的一步变换. 变换消费样本并返回新样本.
pub trait Transform: Send + Sync {
    /// 变换名, 用于日志和错误信息.
    fn name(&self) -> &'static str;

    /// 执行变换.
    fn apply(&self, sample: Sample) -> Result<Sample, TransformError>;
}

/// 依次执行多个变换.
#[derive(Default)]
pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
    /// 由变换序列创建.
    pub fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Self { transforms }
    }

    /// 追加一个变换.
    pub fn then<T: Transform + 'static>(mut self, t: T) -> Self {
        self.transforms.push(Box::new(t));
        self
    }

    /// 变换个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// 是否不含任何变换.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl Transform for Compose {
    fn name(&self) -> &'static str {
        "Compose"
    }

    fn apply(&self, sample: Sample) -> Result<Sample, TransformError> {
        self.transforms.iter().try_fold(sample, |s, t| {
            log::trace!("applying `{}`", t.name());
            t.apply(s)
        })
    }
}

/// 加载样本引用的全部文件.
///
/// 多个成像模态沿最后一维堆叠, 得到 `[x, y, z, c]` 形状; 标注保持 3D.
/// 体素分辨率取第一个模态的文件头.
pub struct LoadImage {
    backend: Box<dyn VolumeBackend>,
}

impl LoadImage {
    /// 使用给定后端.
    pub fn new(backend: Box<dyn VolumeBackend>) -> Self {
        Self { backend }
    }
}

impl Default for LoadImage {
    fn default() -> Self {
        Self::new(BackendKind::default().backend())
    }
}

impl Transform for LoadImage {
    fn name(&self) -> &'static str {
        "LoadImage"
    }

    fn apply(&self, mut sample: Sample) -> Result<Sample, TransformError> {
        let volumes = sample
            .image_paths
            .iter()
            .map(|p| self.backend.load(p))
            .collect::<Result<Vec<_>, _>>()?;
        let first = volumes.first().ok_or(TransformError::Missing {
            transform: "LoadImage",
            missing: "at least one image path",
        })?;
        let (x, y, z) = first.shape();
        for v in volumes.iter() {
            let (a, b, c) = v.shape();
            if (a, b, c) != (x, y, z) {
                return Err(TransformError::ShapeMismatch {
                    expected: vec![x, y, z],
                    found: vec![a, b, c],
                });
            }
        }

        let views: Vec<_> = volumes.iter().map(|v| v.data()).collect();
        let image = stack(Axis(3), &views).map_err(|_| TransformError::ShapeMismatch {
            expected: vec![x, y, z],
            found: Vec::new(),
        })?;
        sample.spacing = first.spacing().to_vec();
        sample.image = Some(image);
        sample.channel_first = false;

        let label = self.backend.load(&sample.label_path)?;
        let found = label.shape();
        if found != (x, y, z) {
            return Err(TransformError::ShapeMismatch {
                expected: vec![x, y, z],
                found: vec![found.0, found.1, found.2],
            });
        }
        sample.label = Some(label.into_data());
        Ok(sample)
    }
}

/// 将通道维移到最前: `[x, y, z, c]` -> `[c, x, y, z]`. 已经是通道优先时不做任何事.
#[derive(Copy, Clone, Debug, Default)]
pub struct EnsureChannelFirst;

impl Transform for EnsureChannelFirst {
    fn name(&self) -> &'static str {
        "EnsureChannelFirst"
    }

    fn apply(&self, mut sample: Sample) -> Result<Sample, TransformError> {
        if sample.channel_first {
            return Ok(sample);
        }
        let image = sample.image.take().ok_or(TransformError::Missing {
            transform: "EnsureChannelFirst",
            missing: "a loaded image",
        })?;
        sample.image = Some(image.permuted_axes([3, 0, 1, 2]).as_standard_layout().into_owned());
        sample.channel_first = true;
        Ok(sample)
    }
}

/// 零均值单位方差归一化.
///
/// `nonzero` 为真时, 统计量只在非零体素上计算, 且零体素保持为 0;
/// `channel_wise` 为真时, 每个通道各自计算统计量. 标准差为 0 时按 1 处理.
#[derive(Copy, Clone, Debug)]
pub struct NormalizeIntensity {
    /// 是否只统计并变换非零体素.
    pub nonzero: bool,

    /// 是否逐通道计算.
    pub channel_wise: bool,
}

impl Default for NormalizeIntensity {
    fn default() -> Self {
        Self {
            nonzero: true,
            channel_wise: true,
        }
    }
}

/// 总体均值与标准差. 没有任何值时返回 `None`.
fn mean_std<T: Float + Sum, I: Iterator<Item = T> + Clone>(it: I) -> Option<(T, T)> {
    let n = <T as num::NumCast>::from(it.clone().count())?;
    if n.is_zero() {
        return None;
    }
    let mean = it.clone().sum::<T>() / n;
    let var = it.map(|v| (v - mean).powi(2)).sum::<T>() / n;
    let std = var.sqrt();
    Some((mean, if std.is_zero() { T::one() } else { std }))
}

impl NormalizeIntensity {
    fn normalize(&self, mut data: ArrayViewMut3<'_, f32>) {
        self.normalize_many(std::slice::from_mut(&mut data));
    }

    /// 用全部 `data` 的联合统计量归一化每个数组.
    fn normalize_many(&self, data: &mut [ArrayViewMut3<'_, f32>]) {
        let nonzero = self.nonzero;
        let keep = move |v: &f32| !nonzero || *v != 0.0;
        let stats = mean_std(data.iter().flat_map(|d| d.iter().copied().filter(keep)));
        let Some((mean, std)) = stats else {
            return;
        };
        for d in data.iter_mut() {
            d.mapv_inplace(|v| if keep(&v) { (v - mean) / std } else { v });
        }
    }
}

impl Transform for NormalizeIntensity {
    fn name(&self) -> &'static str {
        "NormalizeIntensity"
    }

    fn apply(&self, mut sample: Sample) -> Result<Sample, TransformError> {
        if !sample.channel_first {
            return Err(TransformError::Missing {
                transform: "NormalizeIntensity",
                missing: "a channel-first image",
            });
        }
        let image: &mut Array4<f32> = sample.image.as_mut().ok_or(TransformError::Missing {
            transform: "NormalizeIntensity",
            missing: "a loaded image",
        })?;

        if self.channel_wise {
            for channel in image.axis_iter_mut(Axis(0)) {
                self.normalize(channel);
            }
        } else {
            let mut channels: Vec<_> = image.axis_iter_mut(Axis(0)).collect();
            self.normalize_many(&mut channels);
        }
        Ok(sample)
    }
}
