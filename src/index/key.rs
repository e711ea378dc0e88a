use std::sync::Arc;

use crate::core::{FacetSchema, FacetValues, DELIMITER, INDEX_PREFIX};

/// 组合排序键编码器。
///
/// 排序键 = 非分区 facet 按 schema 顺序以 `#` 连接；缺失的 facet 不占位，
/// 所以只有“从第一个排序 facet 起连续给出”的部分条件才能得到合法前缀。
#[derive(Clone, Debug)]
pub struct KeyEncoder {
    schema: Arc<FacetSchema>,
}

impl KeyEncoder {
    pub fn new(schema: Arc<FacetSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FacetSchema {
        &self.schema
    }

    pub fn encode_sort_key(&self, values: &FacetValues) -> String {
        let mut key = String::new();
        for facet in self.schema.sort_facets() {
            if let Some(v) = values.get(facet) {
                key.push_str(v);
                key.push(DELIMITER);
            }
        }
        // 末尾分隔符不需要
        key.pop();
        key
    }

    pub fn encode_index_key(&self, values: &FacetValues) -> String {
        index_key_for(&self.encode_sort_key(values))
    }

    /// 排序键 -> 按位置的 facet 值（下标 0 对应 depth 2）
    pub fn split<'a>(&self, sort_key: &'a str) -> Vec<&'a str> {
        if sort_key.is_empty() {
            return Vec::new();
        }
        sort_key.split(DELIMITER).collect()
    }

    /// 排序键 -> facet 映射；位置数与 schema 不符时返回 None
    pub fn decode(&self, sort_key: &str) -> Option<FacetValues> {
        let parts = self.split(sort_key);
        if parts.len() != self.schema.sort_facets().len() {
            return None;
        }
        Some(
            self.schema
                .sort_facets()
                .iter()
                .zip(parts)
                .map(|(f, v)| (f.clone(), v.to_string()))
                .collect(),
        )
    }
}

pub fn index_key_for(sort_key: &str) -> String {
    format!("{INDEX_PREFIX}{sort_key}")
}

pub fn is_index_key(key: &str) -> bool {
    key.starts_with(INDEX_PREFIX)
}

/// 索引条目 -> 其记录的排序键
pub fn strip_index_prefix(key: &str) -> Option<&str> {
    key.strip_prefix(INDEX_PREFIX)
}

/// facet 边界上的前缀匹配：`Beef` 匹配 `Beef` 与 `Beef#...`，不匹配 `Beefalo#...`
pub fn matches_prefix(key: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match key.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(DELIMITER),
        None => false,
    }
}
