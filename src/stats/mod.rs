pub mod verify;

use std::fmt;

use serde::Serialize;

pub use verify::ConsistencyVerifier;

/// 记录 / 检索索引条目的配对统计
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// 扫描过的分区数
    pub partitions: usize,
    pub records: usize,
    pub index_entries: usize,
    /// 有记录、无索引条目：不参与 facet 发现
    pub orphan_records: Vec<EntryRef>,
    /// 有索引条目、无记录
    pub dangling_index: Vec<EntryRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntryRef {
    pub partition: String,
    pub sort_key: String,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.orphan_records.is_empty() && self.dangling_index.is_empty()
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "╔══════════════════════════════════════════════════╗")?;
        writeln!(f, "║           preset-index Consistency Report        ║")?;
        writeln!(f, "╠══════════════════════════════════════════════════╣")?;
        writeln!(f, "║   partitions:   {:>10}                       ║", self.partitions)?;
        writeln!(f, "║   records:      {:>10}                       ║", self.records)?;
        writeln!(f, "║   index:        {:>10}                       ║", self.index_entries)?;
        writeln!(
            f,
            "║   orphans:      {:>10}                       ║",
            self.orphan_records.len()
        )?;
        writeln!(
            f,
            "║   dangling:     {:>10}                       ║",
            self.dangling_index.len()
        )?;
        writeln!(f, "╚══════════════════════════════════════════════════╝")?;
        Ok(())
    }
}
