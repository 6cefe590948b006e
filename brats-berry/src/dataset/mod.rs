//! 数据集操作.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

pub mod generic;
pub mod inventory;
pub mod survival;

pub use generic::{PatientLoader, PatientVolumes};
pub use inventory::{ColumnCounts, Inventory, PatientPaths, PatientRecord};
pub use survival::{merge_inner, MergedPatient, SurvivalRow, SurvivalTable};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 自然序比较: 连续的数字按数值比较, 其余字符逐个比较.
///
/// 于是 `BraTS20_Training_2` 排在 `BraTS20_Training_10` 之前.
/// 数值相同但前导零个数不同的数字段 (`01` 与 `1`), 前导零少的在前.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a, b);
    loop {
        let (ca, cb) = match (a.chars().next(), b.chars().next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => (ca, cb),
        };

        if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let (da, ra) = split_digits(a);
            let (db, rb) = split_digits(b);
            let (ta, tb) = (da.trim_start_matches('0'), db.trim_start_matches('0'));
            let ord = ta
                .len()
                .cmp(&tb.len())
                .then_with(|| ta.cmp(tb))
                .then_with(|| da.len().cmp(&db.len()));
            if ord != Ordering::Equal {
                return ord;
            }
            (a, b) = (ra, rb);
        } else {
            match ca.cmp(&cb) {
                Ordering::Equal => {
                    (a, b) = (&a[ca.len_utf8()..], &b[cb.len_utf8()..]);
                }
                ord => return ord,
            }
        }
    }
}

/// 分离开头的连续 ASCII 数字.
#[inline]
fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

/// 对路径按文件名做自然序排序.
pub fn natural_sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| {
        let na = a.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let nb = b.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        natural_cmp(&na, &nb)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_order_of_patient_folders() {
        let mut names = vec![
            "BraTS20_Training_2",
            "BraTS20_Training_10",
            "BraTS20_Training_1",
        ];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(
            names,
            ["BraTS20_Training_1", "BraTS20_Training_2", "BraTS20_Training_10"]
        );
    }

    #[test]
    fn test_natural_cmp_corner_cases() {
        assert_eq!(natural_cmp("", ""), Ordering::Equal);
        assert_eq!(natural_cmp("a", "a1"), Ordering::Less);
        assert_eq!(natural_cmp("a9b", "a10a"), Ordering::Less);
        assert_eq!(natural_cmp("a1", "a01"), Ordering::Less);
        assert_eq!(natural_cmp("x100", "x99"), Ordering::Greater);
        assert_eq!(natural_cmp("abc", "abd"), Ordering::Less);
    }

    #[test]
    fn test_natural_sort_paths() {
        let mut paths: Vec<PathBuf> = ["root/p_20", "root/p_3", "root/p_100"]
            .into_iter()
            .map(PathBuf::from)
            .collect();
        natural_sort_paths(&mut paths);
        let names: Vec<_> = paths.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(names, ["root/p_3", "root/p_20", "root/p_100"]);
    }
}
