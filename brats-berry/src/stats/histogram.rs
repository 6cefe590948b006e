//! 直方图, 核密度估计, 以及叠加直方图的位图渲染.

use image::{Rgb, RgbImage};

use crate::data::Modality;
use crate::figure::{self, FOREGROUND};
use crate::stats::LongRow;

/// 直方图纵轴含义.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum HistStat {
    /// 每个区间的个数.
    #[default]
    Count,

    /// 归一化密度, 所有区间面积之和为 1.
    Density,
}

/// 等宽区间直方图.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    lo: f64,
    hi: f64,
    counts: Vec<usize>,
}

impl Histogram {
    /// Sturges 规则给出的区间个数.
    pub fn sturges_bins(n: usize) -> usize {
        if n <= 1 {
            1
        } else {
            (n as f64).log2().ceil() as usize + 1
        }
    }

    /// 在数据自身的取值范围上统计. 没有有限值时返回 `None`.
    ///
    /// 所有值相等时, 范围左右各扩展 0.5.
    pub fn new(values: &[f64], bins: usize) -> Option<Self> {
        let (lo, hi) = finite_range(values)?;
        Self::with_range(values, bins, lo, hi)
    }

    /// 在给定范围上统计. 范围外的值与非有限值不计入.
    pub fn with_range(values: &[f64], bins: usize, lo: f64, hi: f64) -> Option<Self> {
        if bins == 0 || !lo.is_finite() || !hi.is_finite() || hi < lo {
            return None;
        }
        let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
        let mut counts = vec![0usize; bins];
        let width = (hi - lo) / bins as f64;
        for &v in values.iter().filter(|v| v.is_finite()) {
            if v < lo || v > hi {
                continue;
            }
            // 最后一个区间是闭区间.
            let i = (((v - lo) / width) as usize).min(bins - 1);
            counts[i] += 1;
        }
        Some(Self { lo, hi, counts })
    }

    /// 区间个数.
    #[inline]
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// 各区间个数.
    #[inline]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// 区间宽度.
    #[inline]
    pub fn bin_width(&self) -> f64 {
        (self.hi - self.lo) / self.bins() as f64
    }

    /// `bins + 1` 个区间边界.
    pub fn edges(&self) -> Vec<f64> {
        let w = self.bin_width();
        (0..=self.bins()).map(|i| self.lo + w * i as f64).collect()
    }

    /// 计入统计的值个数.
    #[inline]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// 各区间的柱高.
    pub fn heights(&self, stat: HistStat) -> Vec<f64> {
        match stat {
            HistStat::Count => self.counts.iter().map(|&c| c as f64).collect(),
            HistStat::Density => {
                let total = self.total();
                if total == 0 {
                    return vec![0.0; self.bins()];
                }
                let norm = total as f64 * self.bin_width();
                self.counts.iter().map(|&c| c as f64 / norm).collect()
            }
        }
    }
}

/// 有限值的取值范围.
fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Scott 规则带宽: 样本标准差 (无偏) 乘以 `n^(-1/5)`.
///
/// 少于 2 个有限值, 或标准差为 0 时返回 `None`.
pub fn scott_bandwidth(values: &[f64]) -> Option<f64> {
    let data: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = data.len();
    if n < 2 {
        return None;
    }
    let mean = data.iter().sum::<f64>() / n as f64;
    let var = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = var.sqrt();
    (std > 0.0).then(|| std * (n as f64).powf(-0.2))
}

/// 高斯核密度估计, 在 `grid` 上求值. 带宽使用 [`scott_bandwidth`].
pub fn gaussian_kde(values: &[f64], grid: &[f64]) -> Option<Vec<f64>> {
    let bw = scott_bandwidth(values)?;
    let data: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let norm = data.len() as f64 * bw * (2.0 * std::f64::consts::PI).sqrt();
    Some(
        grid.iter()
            .map(|&x| {
                data.iter()
                    .map(|&v| (-0.5 * ((x - v) / bw).powi(2)).exp())
                    .sum::<f64>()
                    / norm
            })
            .collect(),
    )
}

const MARGIN: u32 = 24;
const KDE_POINTS: usize = 200;

/// 多个序列的叠加阶梯直方图.
///
/// 所有序列共享同一组区间边界, 以便直接比较.
#[derive(Debug, Clone)]
pub struct HistPlot {
    series: Vec<(String, Vec<f64>)>,
    stat: HistStat,
    bins: Option<usize>,
    kde: bool,
    size: (u32, u32),
}

impl Default for HistPlot {
    fn default() -> Self {
        Self {
            series: Vec::new(),
            stat: HistStat::Count,
            bins: None,
            kde: true,
            size: (640, 400),
        }
    }
}

impl HistPlot {
    /// 以给定纵轴含义创建空图.
    pub fn new(stat: HistStat) -> Self {
        Self {
            stat,
            ..Default::default()
        }
    }

    /// 以长表为数据源, 每个模态一个序列.
    pub fn from_long(rows: &[LongRow], stat: HistStat) -> Self {
        Modality::IMAGING.into_iter().fold(Self::new(stat), |plot, m| {
            let values = rows
                .iter()
                .filter(|r| r.modality == m)
                .map(|r| r.value as f64)
                .collect();
            plot.series(m.name(), values)
        })
    }

    /// 追加一个序列.
    pub fn series(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.series.push((name.into(), values));
        self
    }

    /// 固定区间个数. 默认按全部数据的 Sturges 规则决定.
    pub fn bins(mut self, bins: usize) -> Self {
        self.bins = Some(bins);
        self
    }

    /// 是否叠加核密度曲线.
    pub fn kde(mut self, kde: bool) -> Self {
        self.kde = kde;
        self
    }

    /// 图像大小.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.size = (width.max(2 * MARGIN + 2), height.max(2 * MARGIN + 2));
        self
    }

    /// 序列名.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|(n, _)| n.as_str())
    }

    /// 每个序列的颜色.
    #[inline]
    pub fn colors(&self) -> Vec<Rgb<u8>> {
        figure::series_palette(self.series.len())
    }

    /// 各序列在共享区间上的直方图. 全部序列都没有有限值时返回 `None`.
    pub fn histograms(&self) -> Option<Vec<Histogram>> {
        let all: Vec<f64> = self.series.iter().flat_map(|(_, v)| v.iter().copied()).collect();
        let (lo, hi) = finite_range(&all)?;
        let bins = self.bins.unwrap_or_else(|| {
            Histogram::sturges_bins(all.iter().filter(|v| v.is_finite()).count())
        });
        self.series
            .iter()
            .map(|(_, v)| Histogram::with_range(v, bins, lo, hi))
            .collect()
    }

    /// 渲染为 RGB 图像. 没有可画的数据时返回 `None`.
    pub fn render(&self) -> Option<RgbImage> {
        let hists = self.histograms()?;
        let first = hists.first()?;
        let edges = first.edges();
        let (lo, hi) = (edges[0], edges[edges.len() - 1]);
        let grid: Vec<f64> = (0..KDE_POINTS)
            .map(|i| lo + (hi - lo) * i as f64 / (KDE_POINTS - 1) as f64)
            .collect();

        let heights: Vec<Vec<f64>> = hists.iter().map(|h| h.heights(self.stat)).collect();
        let curves: Vec<Option<Vec<f64>>> = self
            .series
            .iter()
            .zip(hists.iter())
            .map(|((_, v), h)| {
                if !self.kde {
                    return None;
                }
                let scale = match self.stat {
                    HistStat::Count => h.total() as f64 * h.bin_width(),
                    HistStat::Density => 1.0,
                };
                gaussian_kde(v, &grid).map(|d| d.into_iter().map(|y| y * scale).collect())
            })
            .collect();

        let y_max = heights
            .iter()
            .flatten()
            .chain(curves.iter().flatten().flatten())
            .copied()
            .fold(0.0f64, f64::max);
        let y_max = if y_max > 0.0 { y_max * 1.05 } else { 1.0 };

        let (w, h) = self.size;
        let mut img = figure::canvas(w, h);
        let (left, top) = (MARGIN as i64, MARGIN as i64);
        let (pw, ph) = ((w - 2 * MARGIN) as f64, (h - 2 * MARGIN) as f64);
        let bottom = top + ph as i64;
        let px = |x: f64| left + ((x - lo) / (hi - lo) * pw).round() as i64;
        let py = |y: f64| bottom - (y / y_max * ph).round() as i64;

        let colors = self.colors();
        for ((hs, curve), &color) in heights.iter().zip(curves.iter()).zip(colors.iter()) {
            // 阶梯轮廓: 从基线起, 沿每个柱顶走一遍, 再回到基线.
            let mut pts = vec![(px(edges[0]), bottom)];
            for (i, &y) in hs.iter().enumerate() {
                pts.push((px(edges[i]), py(y)));
                pts.push((px(edges[i + 1]), py(y)));
            }
            pts.push((px(edges[edges.len() - 1]), bottom));
            figure::draw_polyline(&mut img, &pts, color);

            if let Some(curve) = curve {
                let pts: Vec<_> = grid.iter().zip(curve).map(|(&x, &y)| (px(x), py(y))).collect();
                figure::draw_polyline(&mut img, &pts, color);
            }
        }

        // 坐标轴.
        figure::draw_line(&mut img, (left, bottom), (left + pw as i64, bottom), FOREGROUND);
        figure::draw_line(&mut img, (left, top), (left, bottom), FOREGROUND);

        // 图例色块.
        for (i, &color) in colors.iter().enumerate() {
            let y = top + 12 * i as i64;
            figure::fill_rect(&mut img, left + pw as i64 - 10, y, 8, 8, color);
        }
        Some(img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_counts_and_density() {
        let h = Histogram::new(&[0.0, 1.0, 1.5, 2.0, 4.0, f64::NAN], 4).unwrap();
        assert_eq!(h.edges(), [0.0, 1.0, 2.0, 3.0, 4.0]);
        // 4.0 落入最后一个闭区间.
        assert_eq!(h.counts(), [1, 2, 1, 1]);
        let d = h.heights(HistStat::Density);
        let area: f64 = d.iter().map(|v| v * h.bin_width()).sum();
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_degenerate_range() {
        let h = Histogram::new(&[3.0, 3.0], 2).unwrap();
        assert_eq!(h.edges(), [2.5, 3.0, 3.5]);
        assert_eq!(h.total(), 2);
        assert!(Histogram::new(&[f64::NAN], 3).is_none());
        assert!(Histogram::with_range(&[1.0], 0, 0.0, 1.0).is_none());
    }

    #[test]
    fn test_sturges() {
        assert_eq!(Histogram::sturges_bins(0), 1);
        assert_eq!(Histogram::sturges_bins(369), 10);
    }

    #[test]
    fn test_kde_integrates_to_one() {
        let values = [1.0, 2.0, 2.5, 3.0, 7.0];
        let bw = scott_bandwidth(&values).unwrap();
        let grid: Vec<f64> = (0..2000).map(|i| -20.0 + i as f64 * 0.02).collect();
        let d = gaussian_kde(&values, &grid).unwrap();
        let area: f64 = d.iter().sum::<f64>() * 0.02;
        assert!((area - 1.0).abs() < 1e-3, "area = {area}, bw = {bw}");
        assert!(gaussian_kde(&[1.0, 1.0], &grid).is_none());
    }

    #[test]
    fn test_render_draws_every_series() {
        let plot = HistPlot::new(HistStat::Density)
            .series("a", vec![1.0, 2.0, 2.0, 3.0])
            .series("b", vec![5.0, 6.0, 6.0, 9.0])
            .size(200, 120);
        let img = plot.render().unwrap();
        assert_eq!(img.dimensions(), (200, 120));
        for c in plot.colors() {
            assert!(img.pixels().any(|p| *p == c));
        }
        assert!(HistPlot::new(HistStat::Count).render().is_none());
    }

    #[test]
    fn test_from_long_groups_by_modality() {
        let rows: Vec<_> = Modality::IMAGING
            .into_iter()
            .enumerate()
            .map(|(i, m)| LongRow {
                patient: "p".to_string(),
                modality: m,
                value: i as f32,
            })
            .collect();
        let plot = HistPlot::from_long(&rows, HistStat::Count);
        assert_eq!(plot.names().collect::<Vec<_>>(), ["flair", "t1", "t1ce", "t2"]);
        let hists = plot.histograms().unwrap();
        assert_eq!(hists.iter().map(Histogram::total).sum::<usize>(), 4);
    }
}
