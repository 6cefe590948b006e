//! 患者目录清点与完整性过滤.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::data::Modality;
use crate::dataset::natural_sort_paths;

/// 由目录名 `id` 与固定后缀拼出某个模态的候选文件路径.
#[inline]
fn candidate_path(folder: &Path, id: &str, modality: Modality) -> PathBuf {
    folder.join(format!("{id}{}", modality.file_suffix()))
}

/// 仅当 `path` 存在且是普通文件时保留.
#[inline]
fn check_file(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

/// 单个患者目录的清点结果. 缺失的文件记为 `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRecord {
    /// 患者 ID, 即目录名.
    pub id: String,

    /// 按 [`Modality::ALL`] 顺序排列的五个文件路径.
    pub paths: [Option<PathBuf>; 5],
}

impl PatientRecord {
    /// 清点 `folder` 目录. 目录名即患者 ID.
    pub fn from_folder(folder: &Path) -> Self {
        let id = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let paths = Modality::ALL.map(|m| check_file(candidate_path(folder, &id, m)));
        Self { id, paths }
    }

    /// 获取某个模态的文件路径.
    #[inline]
    pub fn path(&self, modality: Modality) -> Option<&Path> {
        self.paths[modality as usize].as_deref()
    }

    /// 五个文件是否都存在.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.paths.iter().all(Option::is_some)
    }

    /// 转换为完整记录. 有任一文件缺失时返回 `None`.
    pub fn into_complete(self) -> Option<PatientPaths> {
        let [flair, t1, t1ce, t2, mask] = self.paths;
        Some(PatientPaths {
            id: self.id,
            paths: [flair?, t1?, t1ce?, t2?, mask?],
        })
    }
}

/// 五个文件齐全的患者记录.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientPaths {
    /// 患者 ID.
    pub id: String,
    paths: [PathBuf; 5],
}

impl PatientPaths {
    /// 直接创建. `paths` 按 [`Modality::ALL`] 顺序给出.
    pub fn new(id: impl Into<String>, paths: [PathBuf; 5]) -> Self {
        Self {
            id: id.into(),
            paths,
        }
    }

    /// 获取某个模态的文件路径.
    #[inline]
    pub fn path(&self, modality: Modality) -> &Path {
        &self.paths[modality as usize]
    }

    /// 四个成像模态的路径, 顺序同 [`Modality::IMAGING`].
    #[inline]
    pub fn imaging(&self) -> [&Path; 4] {
        Modality::IMAGING.map(|m| self.path(m))
    }

    /// 标注文件路径.
    #[inline]
    pub fn mask(&self) -> &Path {
        self.path(Modality::Mask)
    }
}

/// 每一列的非空个数.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnCounts {
    /// 行数, 即 ID 列的非空个数.
    pub rows: usize,

    /// 按 [`Modality::ALL`] 顺序排列的各列非空个数.
    pub present: [usize; 5],
}

impl fmt::Display for ColumnCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10}{}", "Brats20ID", self.rows)?;
        for (m, n) in Modality::ALL.iter().zip(self.present) {
            writeln!(f, "{:<10}{n}", m.name())?;
        }
        Ok(())
    }
}

/// 数据集清单, 每个患者目录一行.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    records: Vec<PatientRecord>,
}

impl Inventory {
    /// 清点 `root` 下的所有直接子目录, 按目录名自然序排列.
    ///
    /// 普通文件 (如同目录下的 csv 表) 不计入清单.
    pub fn scan<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let mut folders = Vec::new();
        for entry in fs::read_dir(root.as_ref())? {
            let path = entry?.path();
            if path.is_dir() {
                folders.push(path);
            }
        }
        natural_sort_paths(&mut folders);

        let records: Vec<_> = folders
            .iter()
            .map(|f| PatientRecord::from_folder(f))
            .collect();
        log::info!(
            "found {} patient folders under `{}`",
            records.len(),
            root.as_ref().display()
        );
        Ok(Self { records })
    }

    /// 从已有记录直接创建.
    #[inline]
    pub fn from_records(records: Vec<PatientRecord>) -> Self {
        Self { records }
    }

    /// 所有记录.
    #[inline]
    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    /// 记录个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 清单是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 统计每一列的非空个数.
    pub fn column_counts(&self) -> ColumnCounts {
        let mut present = [0usize; 5];
        for r in self.records.iter() {
            for (slot, p) in present.iter_mut().zip(r.paths.iter()) {
                *slot += p.is_some() as usize;
            }
        }
        ColumnCounts {
            rows: self.records.len(),
            present,
        }
    }

    /// 丢弃任一文件缺失的记录, 其余保持原顺序.
    ///
    /// 丢弃的记录既不修补也不补默认值, 只在日志中汇总个数.
    pub fn complete(&self) -> Vec<PatientPaths> {
        let kept: Vec<_> = self
            .records
            .iter()
            .cloned()
            .filter_map(PatientRecord::into_complete)
            .collect();
        let dropped = self.records.len() - kept.len();
        if dropped > 0 {
            log::warn!("dropped {dropped} incomplete patient folder(s)");
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, present: [bool; 5]) -> PatientRecord {
        let mut paths: [Option<PathBuf>; 5] = Default::default();
        for (i, m) in Modality::ALL.iter().enumerate() {
            if present[i] {
                paths[i] = Some(PathBuf::from(format!("{id}/{id}{}", m.file_suffix())));
            }
        }
        PatientRecord {
            id: id.to_string(),
            paths,
        }
    }

    #[test]
    fn test_complete_keeps_only_full_rows() {
        let inv = Inventory::from_records(vec![
            record("a", [true; 5]),
            record("b", [true, true, false, true, true]),
            record("c", [true; 5]),
            record("d", [false; 5]),
            record("e", [true, true, true, true, false]),
        ]);
        let full = inv.complete();
        let expected = inv.records().iter().filter(|r| r.is_complete()).count();
        assert_eq!(full.len(), expected);
        assert_eq!(
            full.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            ["a", "c"]
        );
        assert_eq!(full[1].mask(), Path::new("c/c_seg.nii"));
    }

    #[test]
    fn test_column_counts() {
        let inv = Inventory::from_records(vec![
            record("a", [true; 5]),
            record("b", [true, true, false, true, false]),
        ]);
        let counts = inv.column_counts();
        assert_eq!(counts.rows, 2);
        assert_eq!(counts.present, [2, 2, 1, 2, 1]);
        assert!(counts.to_string().contains("t1ce      1"));
    }

    #[test]
    fn test_record_accessors() {
        let r = record("x", [true, false, true, true, true]);
        assert!(r.path(Modality::T1).is_none());
        assert_eq!(r.path(Modality::T2), Some(Path::new("x/x_t2.nii")));
        assert!(r.into_complete().is_none());
    }
}
