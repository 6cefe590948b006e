//! 探索流程依赖的通用组件.

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 向 `w` 写入一条简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 百分比格式化, 保留两位小数. 分母为 0 时显示 `/`.
pub fn percent(part: usize, total: usize) -> String {
    if total == 0 {
        "/".to_string()
    } else {
        format!("{:.2}%", part as f64 / total as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 3), "33.33%");
        assert_eq!(percent(0, 0), "/");
    }

    #[test]
    fn test_sep_to() {
        let mut buf = Vec::new();
        sep_to(&mut buf).unwrap();
        assert_eq!(buf.len(), SEP.len() + 1);
    }
}
