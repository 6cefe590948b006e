//! 位图绘制的小工具. 只覆盖本 crate 的图表需要: 填充, 线段与贴图.

use image::imageops;
use image::{GrayImage, Rgb, RgbImage};
use palette::{Hsl, IntoColor, Srgb};

use crate::consts::gray::{BLACK, WHITE};

/// 背景色.
pub const BACKGROUND: Rgb<u8> = Rgb([WHITE, WHITE, WHITE]);

/// 坐标轴与边框颜色.
pub const FOREGROUND: Rgb<u8> = Rgb([BLACK, BLACK, BLACK]);

/// 生成 `n` 个色相均匀分布的颜色, 用于区分不同序列.
pub fn series_palette(n: usize) -> Vec<Rgb<u8>> {
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let rgb: Srgb = Hsl::new(hue, 0.75, 0.55).into_color();
            Rgb([
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            ])
        })
        .collect()
}

/// 创建纯色画布.
#[inline]
pub fn canvas(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, BACKGROUND)
}

/// 填充矩形. 越界部分被裁掉.
pub fn fill_rect(img: &mut RgbImage, x: i64, y: i64, w: u32, h: u32, color: Rgb<u8>) {
    let (iw, ih) = img.dimensions();
    let x0 = x.clamp(0, iw as i64) as u32;
    let y0 = y.clamp(0, ih as i64) as u32;
    let x1 = (x + w as i64).clamp(0, iw as i64) as u32;
    let y1 = (y + h as i64).clamp(0, ih as i64) as u32;
    for yy in y0..y1 {
        for xx in x0..x1 {
            img.put_pixel(xx, yy, color);
        }
    }
}

/// 画矩形边框.
pub fn stroke_rect(img: &mut RgbImage, x: i64, y: i64, w: u32, h: u32, color: Rgb<u8>) {
    let (x1, y1) = (x + w as i64 - 1, y + h as i64 - 1);
    draw_line(img, (x, y), (x1, y), color);
    draw_line(img, (x, y1), (x1, y1), color);
    draw_line(img, (x, y), (x, y1), color);
    draw_line(img, (x1, y), (x1, y1), color);
}

/// Bresenham 线段. 越界的点被忽略.
pub fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let (dx, dy) = ((to.0 - x).abs(), -(to.1 - y).abs());
    let (sx, sy) = (if x < to.0 { 1 } else { -1 }, if y < to.1 { 1 } else { -1 });
    let mut err = dx + dy;
    let (w, h) = img.dimensions();
    loop {
        if (0..w as i64).contains(&x) && (0..h as i64).contains(&y) {
            img.put_pixel(x as u32, y as u32, color);
        }
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// 画折线.
pub fn draw_polyline(img: &mut RgbImage, points: &[(i64, i64)], color: Rgb<u8>) {
    for w in points.windows(2) {
        draw_line(img, w[0], w[1], color);
    }
}

/// 将 `src` 贴到 `dst` 的 `(x, y)` 处.
#[inline]
pub fn blit(dst: &mut RgbImage, src: &RgbImage, x: u32, y: u32) {
    imageops::replace(dst, src, x as i64, y as i64);
}

/// 灰度图转 RGB.
pub fn gray_to_rgb(img: &GrayImage) -> RgbImage {
    let (w, h) = img.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let g = img.get_pixel(x, y).0[0];
        Rgb([g, g, g])
    })
}
