//! 数据集统计: 元信息表, 标注审计, 分布直方图.

mod histogram;
mod mask_audit;
mod meta;

pub use histogram::{gaussian_kde, scott_bandwidth, HistPlot, HistStat, Histogram};
pub use mask_audit::{audit_masks, parse_patient_id, MaskAudit};
pub use meta::{extract_meta, LongRow, MetaTable, PatientMeta, Stat, VolumeMeta};
