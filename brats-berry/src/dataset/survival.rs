//! 生存信息表, 以及它与影像清单的内连接.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::consts::PATIENT_ID_COLUMN;
use crate::dataset::PatientPaths;
use crate::error::SurvivalError;

/// 生存信息表中的一行. 除 ID 外的字段对本 crate 不透明, 原样保留.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurvivalRow {
    /// 患者 ID.
    pub id: String,

    /// 其余列的取值, 与 [`SurvivalTable::columns`] 一一对应.
    pub fields: Vec<String>,
}

/// 以患者 ID 为键的生存信息表.
#[derive(Debug, Clone, Default)]
pub struct SurvivalTable {
    columns: Vec<String>,
    rows: Vec<SurvivalRow>,
    index: HashMap<String, Vec<usize>>,
}

impl SurvivalTable {
    /// 从 csv 文件读取.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SurvivalError> {
        let file = File::open(path.as_ref()).map_err(|source| SurvivalError::Io {
            path: path.as_ref().to_owned(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// 从任意 csv 数据源读取. 首行必须是表头, 且包含 `Brats20ID` 列.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SurvivalError> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let key = headers
            .iter()
            .position(|h| h == PATIENT_ID_COLUMN)
            .ok_or_else(|| SurvivalError::MissingColumn(PATIENT_ID_COLUMN.to_string()))?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != key)
            .map(|(_, h)| h.clone())
            .collect();

        let mut rows = Vec::new();
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let id = record.get(key).unwrap_or_default().trim().to_string();
            let fields = record
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != key)
                .map(|(_, v)| v.to_string())
                .collect();
            index.entry(id.clone()).or_default().push(rows.len());
            rows.push(SurvivalRow { id, fields });
        }
        log::debug!("survival table: {} rows, columns {:?}", rows.len(), columns);

        Ok(Self {
            columns,
            rows,
            index,
        })
    }

    /// 除 ID 之外的列名.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 所有行.
    #[inline]
    pub fn rows(&self) -> &[SurvivalRow] {
        &self.rows
    }

    /// 行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 表是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// ID 为 `id` 的所有行.
    pub fn lookup(&self, id: &str) -> impl Iterator<Item = &SurvivalRow> {
        self.index
            .get(id)
            .into_iter()
            .flatten()
            .map(|i| &self.rows[*i])
    }
}

/// 内连接后的一行.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPatient {
    /// 影像文件.
    pub paths: PatientPaths,

    /// 生存信息.
    pub survival: SurvivalRow,
}

impl MergedPatient {
    /// 患者 ID.
    #[inline]
    pub fn id(&self) -> &str {
        &self.paths.id
    }
}

/// 按患者 ID 做内连接.
///
/// 结果保持 `patients` 的顺序; 同一 ID 在生存表中出现多次时, 每个匹配各产生一行.
/// 只出现在一侧的患者被静默丢弃.
pub fn merge_inner(patients: &[PatientPaths], survival: &SurvivalTable) -> Vec<MergedPatient> {
    let merged: Vec<_> = patients
        .iter()
        .flat_map(|p| {
            survival.lookup(&p.id).map(move |row| MergedPatient {
                paths: p.clone(),
                survival: row.clone(),
            })
        })
        .collect();
    log::info!(
        "merged {} imaging rows with {} survival rows -> {} rows",
        patients.len(),
        survival.len(),
        merged.len()
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    const CSV: &str = "Brats20ID,Age,Survival_days,Extent_of_Resection
BraTS20_Training_001,60.463,289,GTR
BraTS20_Training_002,52.263,616,GTR
BraTS20_Training_004,68.493,ALIVE (361 days later),
";

    fn patient(id: &str) -> PatientPaths {
        PatientPaths::new(id, [0, 1, 2, 3, 4].map(|i| PathBuf::from(format!("{id}/{i}"))))
    }

    #[test]
    fn test_parse_keeps_other_columns_opaque() {
        let table = SurvivalTable::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.columns(), ["Age", "Survival_days", "Extent_of_Resection"]);
        let row = table.lookup("BraTS20_Training_004").next().unwrap();
        assert_eq!(row.fields[1], "ALIVE (361 days later)");
        assert_eq!(row.fields[2], "");
    }

    #[test]
    fn test_missing_key_column_is_named() {
        let err = SurvivalTable::from_reader("ID,Age\nx,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SurvivalError::MissingColumn(ref c) if c == "Brats20ID"));
        assert!(err.to_string().contains("Brats20ID"));
    }

    #[test]
    fn test_ragged_csv_fails_loudly() {
        let err = SurvivalTable::from_reader("Brats20ID,Age\nx,1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SurvivalError::Csv(_)));
    }

    #[test]
    fn test_inner_join_is_intersection() {
        let table = SurvivalTable::from_reader(CSV.as_bytes()).unwrap();
        let patients: Vec<_> = [
            "BraTS20_Training_004",
            "BraTS20_Training_001",
            "BraTS20_Training_003",
        ]
        .into_iter()
        .map(patient)
        .collect();

        let merged = merge_inner(&patients, &table);
        let got: Vec<_> = merged.iter().map(|m| m.id()).collect();
        // 保持左表顺序.
        assert_eq!(got, ["BraTS20_Training_004", "BraTS20_Training_001"]);

        let left: BTreeSet<_> = patients.iter().map(|p| p.id.as_str()).collect();
        let right: BTreeSet<_> = table.rows().iter().map(|r| r.id.as_str()).collect();
        let got: BTreeSet<_> = got.into_iter().collect();
        let expected: BTreeSet<_> = left.intersection(&right).copied().collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_duplicated_keys_produce_one_row_per_pair() {
        let csv = "Brats20ID,Age\na,1\na,2\n";
        let table = SurvivalTable::from_reader(csv.as_bytes()).unwrap();
        let merged = merge_inner(&[patient("a")], &table);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].survival.fields, ["2"]);
    }
}
