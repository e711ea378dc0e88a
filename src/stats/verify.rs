use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::core::{FacetSchema, INDEX_PREFIX};
use crate::index::key::{index_key_for, strip_index_prefix};
use crate::stats::{ConsistencyReport, EntryRef};
use crate::storage::{Item, StoreAdapter, StoreError};

/// 一致性校验：双写非事务，崩溃窗口会留下孤儿记录。
/// 扫描全部分区配对记录与索引条目，必要时补写缺失的索引条目。
pub struct ConsistencyVerifier {
    schema: Arc<FacetSchema>,
    store: Arc<dyn StoreAdapter>,
}

impl ConsistencyVerifier {
    pub fn new(schema: Arc<FacetSchema>, store: Arc<dyn StoreAdapter>) -> Self {
        Self { schema, store }
    }

    pub fn scan(&self) -> Result<ConsistencyReport, StoreError> {
        let mut report = ConsistencyReport::default();
        for partition in self.store.partitions()? {
            report.partitions += 1;

            let records: BTreeSet<String> = self
                .store
                .query_not_begins_with(&partition, INDEX_PREFIX)?
                .into_iter()
                .map(|item| item.sort_key)
                .collect();
            let indexed: BTreeSet<String> = self
                .store
                .query_begins_with(&partition, INDEX_PREFIX)?
                .into_iter()
                .filter_map(|item| strip_index_prefix(&item.sort_key).map(str::to_string))
                .collect();

            report.records += records.len();
            report.index_entries += indexed.len();
            report.orphan_records.extend(records.difference(&indexed).map(|k| EntryRef {
                partition: partition.clone(),
                sort_key: k.clone(),
            }));
            report.dangling_index.extend(indexed.difference(&records).map(|k| EntryRef {
                partition: partition.clone(),
                sort_key: index_key_for(k),
            }));
        }
        Ok(report)
    }

    /// 为孤儿记录补写索引条目；悬空索引条目只报告不删除（存储不提供 delete）。
    /// 返回修复数量。
    pub fn verify_and_repair(&self) -> Result<usize, StoreError> {
        let report = self.scan()?;
        if report.is_consistent() {
            tracing::debug!("ConsistencyVerifier: check passed");
            return Ok(0);
        }

        tracing::info!("ConsistencyVerifier: inconsistent index\n{}", report);
        for dangling in &report.dangling_index {
            tracing::warn!(
                partition = %dangling.partition,
                sort_key = %dangling.sort_key,
                "index entry without record"
            );
        }

        let mut repaired = 0;
        for orphan in &report.orphan_records {
            tracing::warn!(
                partition = %orphan.partition,
                sort_key = %orphan.sort_key,
                "repairing record without index entry"
            );
            self.store.put(self.index_entry_for(orphan))?;
            repaired += 1;
        }
        tracing::info!("ConsistencyVerifier: repaired {} orphan records", repaired);
        Ok(repaired)
    }

    fn index_entry_for(&self, orphan: &EntryRef) -> Item {
        let index_key = index_key_for(&orphan.sort_key);
        let mut attributes = Map::new();
        attributes.insert(
            self.schema.partition_facet().to_string(),
            Value::String(orphan.partition.clone()),
        );
        attributes.insert(
            self.schema.key_attribute().to_string(),
            Value::String(index_key.clone()),
        );
        Item {
            partition: orphan.partition.clone(),
            sort_key: index_key,
            attributes,
        }
    }
}
