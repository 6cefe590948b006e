//! 连续/离散伪彩色映射.
//!
//! 颜色表的分段数据与常见绘图库保持一致, 使导出的图片与惯用的可视化效果相近.

use image::Rgb;
use palette::{Hsv, IntoColor, Srgb};

/// 分段线性通道: `(x, y)` 按 `x` 升序排列, 且首尾 `x` 分别为 0 和 1.
type Segments = &'static [(f32, f32)];

const JET_R: Segments = &[(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
const JET_G: Segments = &[
    (0.0, 0.0),
    (0.125, 0.0),
    (0.375, 1.0),
    (0.64, 1.0),
    (0.91, 0.0),
    (1.0, 0.0),
];
const JET_B: Segments = &[(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];

const BONE_R: Segments = &[(0.0, 0.0), (0.746032, 0.652778), (1.0, 1.0)];
const BONE_G: Segments = &[
    (0.0, 0.0),
    (0.365079, 0.319444),
    (0.746032, 0.777778),
    (1.0, 1.0),
];
const BONE_B: Segments = &[(0.0, 0.0), (0.365079, 0.444444), (1.0, 1.0)];

/// 在分段线性通道上插值.
fn interp(seg: Segments, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    for w in seg.windows(2) {
        let (x0, y0) = w[0];
        let (x1, y1) = w[1];
        if t <= x1 {
            if x1 <= x0 {
                return y1;
            }
            return y0 + (y1 - y0) * (t - x0) / (x1 - x0);
        }
    }
    seg.last().map_or(0.0, |p| p.1)
}

#[inline]
fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// 连续颜色表.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Colormap {
    /// 灰度.
    Gray,

    /// 带蓝色调的灰度, 适合展示 MRI 扫描.
    Bone,

    /// 蓝 - 青 - 黄 - 红, 适合展示标签.
    Jet,

    /// 色相环.
    Hsv,
}

impl Colormap {
    /// 求 `t` (0.0 ~ 1.0, 越界会被截断) 处的 RGB 分量 (0.0 ~ 1.0).
    pub fn eval(&self, t: f32) -> [f32; 3] {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        match self {
            Self::Gray => [t, t, t],
            Self::Bone => [interp(BONE_R, t), interp(BONE_G, t), interp(BONE_B, t)],
            Self::Jet => [interp(JET_R, t), interp(JET_G, t), interp(JET_B, t)],
            Self::Hsv => {
                let rgb: Srgb = Hsv::new(t * 360.0, 1.0, 1.0).into_color();
                [rgb.red, rgb.green, rgb.blue]
            }
        }
    }

    /// 同 `eval`, 但返回 8-bit 像素.
    #[inline]
    pub fn rgb8(&self, t: f32) -> Rgb<u8> {
        let [r, g, b] = self.eval(t);
        Rgb([unit_to_u8(r), unit_to_u8(g), unit_to_u8(b)])
    }
}

/// 离散化的颜色表.
///
/// 将 `[vmin, vmax]` 等分为 `levels` 个区间, 第 `i` 个区间统一取底层颜色表在
/// `i / (levels - 1)` 处的颜色. 这样每个标签值都落在不同的色块中.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DiscreteColormap {
    base: Colormap,
    levels: usize,
    vmin: f32,
    vmax: f32,
}

impl DiscreteColormap {
    /// 构建离散颜色表. `levels` 为 0 时按 1 处理.
    pub fn new(base: Colormap, levels: usize, vmin: f32, vmax: f32) -> Self {
        Self {
            base,
            levels: levels.max(1),
            vmin,
            vmax,
        }
    }

    /// 区间个数.
    #[inline]
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// 将值线性归一化到 `[0, 1]`. `vmin == vmax` 时恒为 0.
    pub fn normalize(&self, v: f32) -> f32 {
        if self.vmax > self.vmin {
            ((v - self.vmin) / (self.vmax - self.vmin)).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// 值 `v` 所处的区间下标.
    pub fn bin(&self, v: f32) -> usize {
        let n = self.levels;
        ((self.normalize(v) * n as f32).floor() as usize).min(n - 1)
    }

    /// 值 `v` 对应的颜色.
    pub fn rgb8(&self, v: f32) -> Rgb<u8> {
        let n = self.levels;
        let t = if n > 1 {
            self.bin(v) as f32 / (n - 1) as f32
        } else {
            0.0
        };
        self.base.rgb8(t)
    }
}
