//! 探索结果.

use brats_berry::consts::BRATS_TRAINING_SET_LEN;
use brats_berry::dataset::ColumnCounts;
use brats_berry::stats::{MaskAudit, MetaTable};
use brats_berry::Modality;
use std::io::{self, Write};

const S4: &str = "    ";

/// 将数据清点结果写进 `w` 中.
fn describe_inventory_into<W: Write>(r: &EdaReport, w: &mut W) -> io::Result<()> {
    writeln!(w, "Inventory (expected {BRATS_TRAINING_SET_LEN} patients):")?;
    for line in r.counts.to_string().lines() {
        writeln!(w, "{S4}{line}")?;
    }
    writeln!(w, "{S4}complete rows: {}", r.complete)?;
    write!(w, "{S4}rows after survival merge: {}", r.merged)
}

/// 将元信息表的汇总写进 `w` 中.
fn describe_meta_into<W: Write>(meta: &MetaTable, w: &mut W) -> io::Result<()> {
    writeln!(w, "Meta table ({} rows):", meta.len())?;
    for m in Modality::IMAGING {
        writeln!(w, "{S4}{m}_space: {:?}", meta.unique_spacings(m))?;
    }
    for m in Modality::IMAGING {
        writeln!(w, "{S4}{m}_shape: {:?}", meta.unique_shapes(m))?;
    }
    Ok(())
}

/// 将标注审计结果写进 `w` 中.
fn describe_audit_into<W: Write>(audit: &MaskAudit, w: &mut W) -> io::Result<()> {
    writeln!(w, "Mask audit (expected labels {:?}):", audit.expected())?;
    write!(
        w,
        "{S4}Number of incomplete masks: {} ({})",
        audit.incomplete(),
        utils::percent(audit.incomplete(), audit.total())
    )
}

/// 探索流程最终结果.
pub struct EdaReport {
    /// 每列非空个数.
    pub counts: ColumnCounts,

    /// 完整患者数.
    pub complete: usize,

    /// 内连接后的行数.
    pub merged: usize,

    /// 元信息表.
    pub meta: MetaTable,

    /// 标注审计.
    pub audit: MaskAudit,
}

impl EdaReport {
    /// 将全部结果写进 `w` 中, 各部分之间以分隔线隔开.
    pub fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        utils::sep_to(&mut *w)?;
        describe_inventory_into(self, w)?;
        writeln!(w)?;
        utils::sep_to(&mut *w)?;
        describe_meta_into(&self.meta, w)?;
        utils::sep_to(&mut *w)?;
        describe_audit_into(&self.audit, w)?;
        writeln!(w)?;
        utils::sep_to(&mut *w)
    }

    /// 打印结果.
    pub fn analyze(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.describe_into(&mut lock)
    }
}
