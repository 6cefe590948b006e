//! 帧渲染与 gif 编码.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, ImageError, Rgb, RgbImage};
use ndarray::ArrayView2;

use super::{Frame, SliceAnimation};
use crate::consts::gray::GRAY;
use crate::data::{Colormap, DiscreteColormap, IntensityWindow};
use crate::figure;

/// 面板间距.
const GAP: u32 = 4;

/// 图例色块边长.
const SWATCH: u32 = 10;

/// `(1 - alpha) * base + alpha * over`.
#[inline]
fn mix(base: Rgb<u8>, over: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let f = |b: u8, o: u8| ((1.0 - alpha) * b as f32 + alpha * o as f32).round() as u8;
    Rgb([
        f(base.0[0], over.0[0]),
        f(base.0[1], over.0[1]),
        f(base.0[2], over.0[2]),
    ])
}

/// 用 bone 颜色表绘制一层扫描, 标注非零处按 `alpha` 叠加离散颜色.
fn render_panel(
    slice: ArrayView2<'_, f32>,
    window: &IntensityWindow,
    overlay: Option<(ArrayView2<'_, f32>, &DiscreteColormap)>,
    alpha: f32,
) -> RgbImage {
    let (h, w) = slice.dim();
    let mut buf = RgbImage::new(w as u32, h as u32);
    for ((r, c), &v) in slice.indexed_iter() {
        let t = window.eval_unit(v).unwrap_or(0.0);
        let mut pix = Colormap::Bone.rgb8(t);
        if let Some((mask, cmap)) = overlay {
            let label = mask[(r, c)];
            // 背景完全透明.
            if label != 0.0 && label.is_finite() {
                pix = mix(pix, cmap.rgb8(label), alpha);
            }
        }
        buf.put_pixel(c as u32, r as u32, pix);
    }
    buf
}

impl SliceAnimation {
    /// 面板网格的 `(行数, 列数)`: 固定两行.
    fn grid(&self) -> (u32, u32) {
        let n = self.volumes.len() as u32;
        if n <= 1 {
            (1, 1)
        } else {
            (2, (n + 1) / 2)
        }
    }

    /// 渲染单帧: 各模态面板按两行排列, 标注叠加其上, 底部附图例色块.
    pub fn render_frame(&self, frame: &Frame<'_>) -> RgbImage {
        let (h, w) = self.slice_shape();
        let (h, w) = (h as u32, w as u32);
        let (rows, cols) = self.grid();
        let legend = self.legend();
        let legend_h = if legend.is_empty() { 0 } else { SWATCH + 2 * GAP };

        let mut img = figure::canvas(
            cols * w + (cols + 1) * GAP,
            rows * h + (rows + 1) * GAP + legend_h,
        );

        let cmap = self.mask_cmap();
        for (i, (_, slice)) in frame.panels.iter().enumerate() {
            let overlay = frame.mask.zip(cmap);
            let panel = render_panel(slice.view(), self.window(i), overlay, self.config.alpha);
            let (r, c) = (i as u32 / cols, i as u32 % cols);
            figure::blit(&mut img, &panel, GAP + c * (w + GAP), GAP + r * (h + GAP));
        }

        let y = (rows * (h + GAP) + GAP) as i64;
        for (i, entry) in legend.iter().enumerate() {
            let x = (GAP + i as u32 * (SWATCH + 2 * GAP)) as i64;
            figure::fill_rect(&mut img, x, y, SWATCH, SWATCH, entry.color);
            figure::stroke_rect(&mut img, x, y, SWATCH, SWATCH, Rgb([GRAY, GRAY, GRAY]));
        }
        img
    }

    /// 渲染第 `index` 层并保存为图片. 格式由扩展名决定.
    pub fn save_frame<P: AsRef<Path>>(&self, index: usize, path: P) -> Result<(), ImageError> {
        let frame = self.frames().nth(index).ok_or_else(|| {
            ImageError::Parameter(image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            ))
        })?;
        self.render_frame(&frame).save(path)
    }

    /// 将所有帧编码为循环播放的 gif.
    ///
    /// 每帧停留 [`SliceAnimation::frame_delay_ms`] 毫秒; 最后一帧额外停留
    /// `repeat_delay_ms`, 作为重新播放前的停顿.
    pub fn save_gif<P: AsRef<Path>>(&self, path: P) -> Result<(), crate::error::AnimationError> {
        let file = File::create(path.as_ref()).map_err(ImageError::IoError)?;
        let mut encoder = GifEncoder::new(BufWriter::new(file));
        encoder.set_repeat(Repeat::Infinite)?;

        let delay = self.frame_delay_ms();
        let last = self.len().saturating_sub(1);
        for frame in self.frames() {
            let ms = if frame.index == last {
                delay + self.config.repeat_delay_ms
            } else {
                delay
            };
            let rgba = DynamicImage::ImageRgb8(self.render_frame(&frame)).into_rgba8();
            encoder.encode_frame(image::Frame::from_parts(
                rgba,
                0,
                0,
                Delay::from_numer_denom_ms(ms, 1),
            ))?;
        }
        log::info!(
            "animation of `{}` saved: {} frames, {} ms each",
            self.case,
            self.len(),
            delay
        );
        Ok(())
    }
}
