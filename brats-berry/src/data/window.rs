/// 强度窗口, 包含窗位 (window level) 和窗宽 (window width).
///
/// MRI 强度没有 CT HU 那样的物理单位, 因此窗口通常直接取自体数据自身的
/// 强度范围 (见 [`IntensityWindow::from_range`]).
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntensityWindow {
    level: f32,
    width: f32,
}

impl IntensityWindow {
    /// 构建强度窗.
    ///
    /// `width` 必须为正的有限值, `level` 必须有限, 否则返回 `None`.
    pub fn new(level: f32, width: f32) -> Option<IntensityWindow> {
        if level.is_finite() && width.is_finite() && 0.0 < width {
            Some(Self { level, width })
        } else {
            None
        }
    }

    /// 以 `[min, max]` 为上下限构建窗口.
    ///
    /// 若 `min == max` (如全零体数据), 窗宽退化为 1, 保证除法有意义.
    /// 任一参数无意义时返回 `None`.
    pub fn from_range(min: f32, max: f32) -> Option<IntensityWindow> {
        if !min.is_finite() || !max.is_finite() || max < min {
            return None;
        }
        let width = if max > min { max - min } else { 1.0 };
        Self::new(min + width / 2.0, width)
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.level - self.width / 2.0
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.level + self.width / 2.0
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// 求在当前窗设置下, 强度 `v` 对应的灰度图像素整数值 (0 <= value <= 255).
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, v: f32) -> Option<u8> {
        self.eval_f32(v).map(|g| g as u8)
    }

    /// 求在当前窗设置下, 强度 `v` 对应的归一化位置 (0.0 <= value <= 1.0).
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval_unit(&self, v: f32) -> Option<f32> {
        if !v.is_finite() {
            return None;
        }
        let lb = self.lower_bound();
        if v <= lb {
            Some(0.0)
        } else if v >= self.upper_bound() {
            Some(1.0)
        } else {
            Some((v - lb) / self.width())
        }
    }

    /// 求在当前窗设置下, 强度 `v` 对应的灰度图像素分布点 (0.0 <= value <= 255.0).
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    #[inline]
    pub fn eval_f32(&self, v: f32) -> Option<f32> {
        // 255, not 256.
        self.eval_unit(v).map(|u| u * 255.0)
    }
}

#[cfg(test)]
mod tests {
    use super::IntensityWindow;

    fn is_valid_init(level: f32, width: f32) -> bool {
        IntensityWindow::new(level, width).is_some()
    }

    #[test]
    fn test_window_invalid_input() {
        assert!(!is_valid_init(0.0, -1.0));
        assert!(!is_valid_init(0.0, 0.0));
        assert!(!is_valid_init(f32::NAN, 1.0));
        assert!(IntensityWindow::from_range(2.0, 1.0).is_none());
    }

    fn float_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_window_from_range() {
        let w = IntensityWindow::from_range(0.0, 400.0).unwrap();
        assert!(float_eq(w.level(), 200.0));
        assert!(float_eq(w.width(), 400.0));
        assert_eq!(w.eval(0.0), Some(0));
        assert_eq!(w.eval(400.0), Some(255));

        // 退化窗口.
        let flat = IntensityWindow::from_range(0.0, 0.0).unwrap();
        assert_eq!(flat.eval(0.0), Some(0));
    }

    #[test]
    fn test_window_generic() {
        // [60, 100]
        let w = IntensityWindow::new(80.0, 40.0).unwrap();
        assert_eq!(w.eval(f32::NAN), None);
        assert_eq!(w.eval(f32::MIN), Some(0));
        assert_eq!(w.eval(f32::MAX), Some(255));

        assert_eq!(w.eval(60.0), Some(0));
        assert!(w.eval_f32(60.1).unwrap() > 0.0);
        assert!(w.eval_f32(60.1).unwrap() < 1.0);

        assert_eq!(w.eval(70.0).unwrap(), (255.0 * 0.25) as u8);
        assert!(float_eq(w.eval_f32(80.0).unwrap(), 255.0 * 0.5));
        assert!(float_eq(w.eval_unit(90.0).unwrap(), 0.75));

        assert_eq!(w.eval(99.999), Some(254));
        assert_eq!(w.eval(100.0).unwrap(), u8::MAX);
    }
}
