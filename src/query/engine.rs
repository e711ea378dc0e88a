use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::{
    normalize_value, FacetSchema, FacetValues, IndexError, Result, DELIMITER, INDEX_PREFIX,
};
use crate::index::key::{index_key_for, is_index_key, matches_prefix, strip_index_prefix};
use crate::index::{FacetAggregator, FacetOptions, KeyEncoder};
use crate::storage::{Item, StoreAdapter};

pub const DEFAULT_RESULT_LIMIT: usize = 20;

#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse {
    pub search_params: FacetOptions,
    pub results: Vec<Map<String, Value>>,
}

/// 查询侧：部分 facet 条件 -> 前缀 -> 两次前缀扫描（索引条目 / 记录）
pub struct QueryEngine {
    schema: Arc<FacetSchema>,
    encoder: KeyEncoder,
    aggregator: FacetAggregator,
    store: Arc<dyn StoreAdapter>,
    result_limit: usize,
}

impl QueryEngine {
    pub fn new(schema: Arc<FacetSchema>, store: Arc<dyn StoreAdapter>) -> Self {
        Self {
            encoder: KeyEncoder::new(schema.clone()),
            aggregator: FacetAggregator::new(schema.clone()),
            schema,
            store,
            result_limit: DEFAULT_RESULT_LIMIT,
        }
    }

    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit;
        self
    }

    pub fn search(&self, criteria: &HashMap<String, String>) -> Result<SearchResponse> {
        let supplied = self.resolve_criteria(criteria)?;
        let partition_facet = self.schema.partition_facet();
        let partition = supplied
            .get(partition_facet)
            .ok_or_else(|| IndexError::MissingPartition {
                facet: partition_facet.to_string(),
            })?;
        self.check_contiguous(&supplied)?;

        let prefix = self.encoder.encode_sort_key(&supplied);

        let index_entries: Vec<Item> = self
            .store
            .query_begins_with(partition, &index_key_for(&prefix))?
            .into_iter()
            .filter(|item| {
                strip_index_prefix(&item.sort_key).is_some_and(|k| matches_prefix(k, &prefix))
            })
            .collect();

        let records = if prefix.is_empty() {
            self.store.query_not_begins_with(partition, INDEX_PREFIX)?
        } else {
            self.store.query_begins_with(partition, &prefix)?
        };
        // 键空间共享：即使前缀不可能命中保留前缀，也显式过滤一遍
        let results: Vec<Map<String, Value>> = records
            .into_iter()
            .filter(|item| !is_index_key(&item.sort_key) && matches_prefix(&item.sort_key, &prefix))
            .take(self.result_limit)
            .map(|item| item.attributes)
            .collect();

        tracing::debug!(
            partition = %partition,
            prefix = %prefix,
            index_entries = index_entries.len(),
            results = results.len(),
            "preset search"
        );

        Ok(SearchResponse {
            search_params: self.aggregator.aggregate(&index_entries, supplied.len()),
            results,
        })
    }

    /// 只保留 schema 中的 facet；空字符串视为未指定。
    /// 什么都没给时回落到默认分类。
    fn resolve_criteria(&self, criteria: &HashMap<String, String>) -> Result<FacetValues> {
        let mut supplied = FacetValues::new();
        for (facet, raw) in criteria {
            if !self.schema.is_facet(facet) {
                tracing::debug!(key = %facet, "ignoring unknown search key");
                continue;
            }
            let value = normalize_value(raw);
            if value.is_empty() {
                continue;
            }
            if value.contains(DELIMITER) {
                return Err(IndexError::validation(format!(
                    "criteria {:?} contains the key delimiter",
                    facet
                )));
            }
            supplied.insert(facet.clone(), value);
        }

        if supplied.is_empty() {
            supplied.insert(
                self.schema.partition_facet().to_string(),
                self.schema.default_category().to_string(),
            );
        }
        Ok(supplied)
    }

    /// 条件必须是 facet 顺序上的连续前缀（f1..fj），跳层的前缀没有意义
    fn check_contiguous(&self, supplied: &FacetValues) -> Result<()> {
        let deepest = supplied
            .keys()
            .filter_map(|f| self.schema.depth_of(f))
            .max()
            .unwrap_or(0);
        if deepest != supplied.len() {
            let missing: Vec<&str> = (1..=deepest)
                .filter_map(|d| self.schema.facet_at(d))
                .filter(|f| !supplied.contains_key(*f))
                .collect();
            return Err(IndexError::validation(format!(
                "criteria skip facet levels: missing {:?}",
                missing
            )));
        }
        Ok(())
    }
}
