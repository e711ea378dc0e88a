pub mod memory;

use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryStore;

/// 存储层错误（重试策略属于存储实现，索引层不重试）
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// 有序 KV 中的一条：分区键精确匹配，排序键支持前缀查询
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub partition: String,
    pub sort_key: String,
    pub attributes: Map<String, Value>,
}

/// Store Adapter：有序 KV 存储的最小原语集合。
///
/// ## 契约
/// - 查询结果按排序键字典序返回
/// - 相同 (partition, sort_key) 的 put 为 last-write-wins
/// - `write_batch` 默认逐条 put，不保证原子性；实现方可覆盖
pub trait StoreAdapter: Send + Sync {
    fn put(&self, item: Item) -> Result<(), StoreError>;

    fn query_begins_with(&self, partition: &str, prefix: &str) -> Result<Vec<Item>, StoreError>;

    fn query_not_begins_with(&self, partition: &str, prefix: &str)
        -> Result<Vec<Item>, StoreError>;

    /// 当前存在的分区值（供一致性校验全量扫描）
    fn partitions(&self) -> Result<Vec<String>, StoreError>;

    fn write_batch(&self, items: Vec<Item>) -> Result<(), StoreError> {
        for item in items {
            self.put(item)?;
        }
        Ok(())
    }
}
