//! 影像与标注的融合显示.

use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::{s, Array4, ArrayView2, ArrayView3, Axis, Zip};

use super::Sample;
use crate::data::{Colormap, IntensityWindow};
use crate::error::TransformError;
use crate::figure;

/// 将单通道影像与标注融合为 `[3, x, y, z]` 的 RGB 数组.
///
/// 标注值直接送入 `cmap` 取色 (不做重新缩放), 影像值直接作为灰度.
/// 标注为 0 处完全透明, 其余位置按 `alpha` 混合:
/// `out = (1 - w) * image + w * cmap(label)`, 其中 `w = alpha` 或 0.
pub fn blend_images(
    image: ArrayView3<'_, f32>,
    label: ArrayView3<'_, f32>,
    alpha: f32,
    cmap: Colormap,
) -> Result<Array4<f32>, TransformError> {
    if image.shape() != label.shape() {
        return Err(TransformError::ShapeMismatch {
            expected: image.shape().to_vec(),
            found: label.shape().to_vec(),
        });
    }
    let (x, y, z) = image.dim();
    let mut out = Array4::<f32>::zeros((3, x, y, z));
    for (c, mut channel) in out.axis_iter_mut(Axis(0)).enumerate() {
        Zip::from(&mut channel)
            .and(&image)
            .and(&label)
            .for_each(|o, &i, &l| {
                let w = if l == 0.0 { 0.0 } else { alpha };
                *o = (1.0 - w) * i + w * cmap.eval(l)[c];
            });
    }
    Ok(out)
}

/// 同一层上的原始影像, 原始标注, 以及融合结果.
#[derive(Debug, Clone)]
pub struct SideBySide {
    /// 灰度影像.
    pub image: RgbImage,

    /// 标注.
    pub label: RgbImage,

    /// 融合结果.
    pub blend: RgbImage,
}

impl SideBySide {
    /// 横向拼接三幅图.
    pub fn row(&self) -> RgbImage {
        const GAP: u32 = 4;
        let parts = [&self.image, &self.label, &self.blend];
        let w: u32 = parts.iter().map(|p| p.width()).sum::<u32>() + GAP * 4;
        let h = parts.iter().map(|p| p.height()).max().unwrap_or(0) + GAP * 2;
        let mut img = figure::canvas(w, h);
        let mut x = GAP;
        for p in parts {
            figure::blit(&mut img, p, x, GAP);
            x += p.width() + GAP;
        }
        img
    }
}

/// 把二维数组按自身取值范围映射到颜色表.
fn colorize(data: ArrayView2<'_, f32>, cmap: Colormap) -> RgbImage {
    let (lo, hi) = data
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let window = IntensityWindow::from_range(lo, hi);
    let (h, w) = data.dim();
    let mut buf = RgbImage::new(w as u32, h as u32);
    for ((r, c), &v) in data.indexed_iter() {
        let t = window.and_then(|win| win.eval_unit(v)).unwrap_or(0.0);
        buf.put_pixel(c as u32, r as u32, cmap.rgb8(t));
    }
    buf
}

/// 在第 `slice` 层 (最后一维) 上, 展示第一个通道, 值为 `label_value` 的标注区域,
/// 以及二者的融合.
///
/// 影像先除以全体最大值; 标注二值化后乘以 0.1, 再以 `alpha` 和 `cmap` 融合.
pub fn side_by_side(
    sample: &Sample,
    label_value: i64,
    slice: usize,
    alpha: f32,
    cmap: Colormap,
) -> Result<SideBySide, TransformError> {
    const MISSING: TransformError = TransformError::Missing {
        transform: "side_by_side",
        missing: "a loaded, channel-first sample",
    };
    let image = sample.image.as_ref().filter(|_| sample.channel_first).ok_or(MISSING)?;
    let label = sample.label.as_ref().ok_or(MISSING)?;

    let depth = label.len_of(Axis(2));
    if slice >= depth {
        return Err(TransformError::OutOfRange {
            index: slice,
            len: depth,
        });
    }

    let max = image.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let scale = if max.is_finite() && max != 0.0 { max } else { 1.0 };
    let first = image.index_axis(Axis(0), 0);
    let norm_img = first.mapv(|v| v / scale);
    let norm_lab = label.mapv(|v| if v.round() as i64 == label_value { 0.1 } else { 0.0 });
    let blended = blend_images(norm_img.view(), norm_lab.view(), alpha, cmap)?;

    let (h, w) = (first.len_of(Axis(0)), first.len_of(Axis(1)));
    let mut blend = RgbImage::new(w as u32, h as u32);
    for r in 0..h {
        for c in 0..w {
            let px = [0, 1, 2].map(|ch| {
                (blended[(ch, r, c, slice)].clamp(0.0, 1.0) * 255.0).round() as u8
            });
            blend.put_pixel(c as u32, r as u32, Rgb(px));
        }
    }

    Ok(SideBySide {
        image: colorize(first.slice(s![.., .., slice]), Colormap::Gray),
        label: colorize(label.slice(s![.., .., slice]), Colormap::Jet),
        blend,
    })
}

/// 以网格拼接单通道体数据沿最后一维的第 `start`, `start + step`, ... 层.
///
/// 所有选中层共享同一灰度窗口. 没有选中任何层或 `step` 为 0 时返回 `None`.
pub fn montage(volume: ArrayView3<'_, f32>, start: usize, step: usize) -> Option<RgbImage> {
    if step == 0 {
        return None;
    }
    let depth = volume.len_of(Axis(2));
    let picked: Vec<usize> = (start..depth).step_by(step).collect();
    if picked.is_empty() {
        return None;
    }

    let (lo, hi) = picked
        .iter()
        .flat_map(|&k| volume.slice(s![.., .., k]).into_iter().copied())
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let window = IntensityWindow::from_range(lo, hi);

    let n = picked.len();
    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = (n + cols - 1) / cols;
    let (h, w) = (volume.len_of(Axis(0)), volume.len_of(Axis(1)));
    let mut buf = GrayImage::new((cols * w) as u32, (rows * h) as u32);
    for (i, &k) in picked.iter().enumerate() {
        let (oy, ox) = ((i / cols) * h, (i % cols) * w);
        for ((r, c), &v) in volume.slice(s![.., .., k]).indexed_iter() {
            let g = window.and_then(|win| win.eval(v)).unwrap_or(0);
            buf.put_pixel((ox + c) as u32, (oy + r) as u32, Luma([g]));
        }
    }
    log::debug!("montage of {n} slices ({rows} x {cols})");
    Some(figure::gray_to_rgb(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, Array4};

    #[test]
    fn test_blend_keeps_background_transparent() {
        let image = Array3::from_elem((2, 2, 1), 0.5f32);
        let mut label = Array3::<f32>::zeros((2, 2, 1));
        label[(1, 1, 0)] = 0.1;

        let out = blend_images(image.view(), label.view(), 0.5, Colormap::Hsv).unwrap();
        assert_eq!(out.dim(), (3, 2, 2, 1));
        for c in 0..3 {
            assert_eq!(out[(c, 0, 0, 0)], 0.5);
        }
        let color = Colormap::Hsv.eval(0.1);
        for c in 0..3 {
            let expected = 0.5 * 0.5 + 0.5 * color[c];
            assert!((out[(c, 1, 1, 0)] - expected).abs() < 1e-6);
        }

        let bad = Array3::<f32>::zeros((2, 2, 2));
        assert!(blend_images(image.view(), bad.view(), 0.5, Colormap::Hsv).is_err());
    }

    fn loaded_sample() -> Sample {
        let image = Array4::from_shape_fn((2, 3, 4, 5), |(c, x, y, z)| {
            (c * 10 + x + y + z) as f32
        });
        let mut label = Array3::<f32>::zeros((3, 4, 5));
        label[(1, 2, 3)] = 2.0;
        Sample {
            image: Some(image),
            channel_first: true,
            label: Some(label),
            ..Sample::default()
        }
    }

    #[test]
    fn test_side_by_side_panels() {
        let sample = loaded_sample();
        let view = side_by_side(&sample, 2, 3, 0.5, Colormap::Hsv).unwrap();
        assert_eq!(view.image.dimensions(), (4, 3));
        assert_eq!(view.blend.dimensions(), (4, 3));
        // 只有 (1, 2) 处被着色.
        let gray = |p: &Rgb<u8>| p.0[0] == p.0[1] && p.0[1] == p.0[2];
        assert!(!gray(view.blend.get_pixel(2, 1)));
        assert!(gray(view.blend.get_pixel(0, 0)));
        assert_eq!(view.row().height(), 3 + 8);

        assert!(matches!(
            side_by_side(&sample, 2, 5, 0.5, Colormap::Hsv),
            Err(TransformError::OutOfRange { index: 5, len: 5 })
        ));
        let unloaded = Sample::default();
        assert!(side_by_side(&unloaded, 1, 0, 0.5, Colormap::Hsv).is_err());
    }

    #[test]
    fn test_montage_grid() {
        let vol = Array3::from_shape_fn((2, 3, 10), |(_, _, z)| z as f32);
        // 第 1, 4, 7 层.
        let img = montage(vol.view(), 1, 3).unwrap();
        assert_eq!(img.dimensions(), (2 * 3, 2 * 2));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(3, 0).0, [127, 127, 127]);
        assert_eq!(img.get_pixel(0, 2).0, [255, 255, 255]);
        // 网格剩余格子保持黑色.
        assert_eq!(img.get_pixel(5, 3).0, [0, 0, 0]);

        assert!(montage(vol.view(), 10, 1).is_none());
        assert!(montage(vol.view(), 0, 0).is_none());
    }
}
