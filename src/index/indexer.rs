use std::sync::Arc;

use serde_json::{Map, Value};

use crate::core::{FacetSchema, IndexError, Record, Result};
use crate::index::key::{is_index_key, KeyEncoder};
use crate::storage::{Item, StoreAdapter};

/// 写入侧：每条记录双写（记录本身 + 检索索引条目）。
///
/// 默认两次独立 put：先写记录再写索引，二者之间崩溃会留下孤儿记录
/// （可按完整前缀取回，但不参与 facet 发现），由 `ConsistencyVerifier` 修复。
/// `atomic_writes` 打开时改走 `StoreAdapter::write_batch`。
pub struct Indexer {
    encoder: KeyEncoder,
    store: Arc<dyn StoreAdapter>,
    atomic_writes: bool,
}

impl Indexer {
    pub fn new(schema: Arc<FacetSchema>, store: Arc<dyn StoreAdapter>) -> Self {
        Self {
            encoder: KeyEncoder::new(schema),
            store,
            atomic_writes: false,
        }
    }

    pub fn with_atomic_writes(mut self, atomic: bool) -> Self {
        self.atomic_writes = atomic;
        self
    }

    /// 相同 facet 组合重复 create 只会覆盖（last-write-wins），不会产生重复条目。
    pub fn create(&self, record: Record) -> Result<()> {
        let (data, search_index) = self.build_items(record)?;
        let partition = data.partition.clone();
        let sort_key = data.sort_key.clone();

        if self.atomic_writes {
            self.store.write_batch(vec![data, search_index])?;
        } else {
            self.store.put(data)?;
            self.store.put(search_index)?;
        }

        tracing::debug!(partition = %partition, sort_key = %sort_key, "preset indexed");
        Ok(())
    }

    fn build_items(&self, record: Record) -> Result<(Item, Item)> {
        let schema = self.encoder.schema();
        let values = record.facet_values(schema)?;
        let sort_key = self.encoder.encode_sort_key(&values);
        if is_index_key(&sort_key) {
            return Err(IndexError::validation(format!(
                "sort key {:?} collides with the reserved index prefix",
                sort_key
            )));
        }

        let partition_facet = schema.partition_facet();
        let partition = values
            .get(partition_facet)
            .cloned()
            .ok_or_else(|| IndexError::MissingPartition {
                facet: partition_facet.to_string(),
            })?;
        let index_key = self.encoder.encode_index_key(&values);

        // 记录：原始属性 + 规范化后的 facet 值 + 组合键属性
        let mut attributes = record.into_attributes();
        for (facet, value) in &values {
            attributes.insert(facet.clone(), Value::String(value.clone()));
        }
        attributes.insert(
            schema.key_attribute().to_string(),
            Value::String(sort_key.clone()),
        );

        // 索引条目只携带分区值与组合键
        let mut index_attributes = Map::new();
        index_attributes.insert(partition_facet.to_string(), Value::String(partition.clone()));
        index_attributes.insert(
            schema.key_attribute().to_string(),
            Value::String(index_key.clone()),
        );

        Ok((
            Item {
                partition: partition.clone(),
                sort_key,
                attributes,
            },
            Item {
                partition,
                sort_key: index_key,
                attributes: index_attributes,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StoreError};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn preset() -> Record {
        Record::from_json(json!({
            "category": "Meat",
            "sub_category": "Beef",
            "type": "Roast",
            "bone_in": "No",
            "prep": "Whole",
            "freshness": "Fresh",
            "amount": "2lb",
            "cooking_method": "Pressure",
            "liquid_amount": "1c",
            "pressure_level": "High",
            "estimated_pressure_build_time": "10m",
            "temperature": "High",
            "cook_time": "45m",
            "photo": "url",
        }))
        .unwrap()
    }

    /// 第 `fail_at` 次 put（从 1 计）失败，其余委托给内存存储
    struct FlakyStore {
        inner: MemoryStore,
        puts: AtomicUsize,
        fail_at: usize,
    }

    impl StoreAdapter for FlakyStore {
        fn put(&self, item: Item) -> std::result::Result<(), StoreError> {
            let n = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_at {
                return Err(StoreError::Unavailable("injected".into()));
            }
            self.inner.put(item)
        }

        fn query_begins_with(
            &self,
            partition: &str,
            prefix: &str,
        ) -> std::result::Result<Vec<Item>, StoreError> {
            self.inner.query_begins_with(partition, prefix)
        }

        fn query_not_begins_with(
            &self,
            partition: &str,
            prefix: &str,
        ) -> std::result::Result<Vec<Item>, StoreError> {
            self.inner.query_not_begins_with(partition, prefix)
        }

        fn partitions(&self) -> std::result::Result<Vec<String>, StoreError> {
            self.inner.partitions()
        }
    }

    fn indexer(store: Arc<dyn StoreAdapter>) -> Indexer {
        Indexer::new(Arc::new(FacetSchema::cooking_presets()), store)
    }

    #[test]
    fn create_writes_record_and_index_entry() {
        let store = Arc::new(MemoryStore::new());
        indexer(store.clone()).create(preset()).unwrap();

        let record = store
            .get("Meat", "Beef#Roast#No#Whole#Fresh#2lb#Pressure")
            .unwrap();
        assert_eq!(record.attributes["photo"], "url");
        assert_eq!(
            record.attributes["ingredients"],
            "Beef#Roast#No#Whole#Fresh#2lb#Pressure"
        );

        let entry = store
            .get("Meat", "SI#Beef#Roast#No#Whole#Fresh#2lb#Pressure")
            .unwrap();
        assert_eq!(entry.attributes.len(), 2);
        assert_eq!(entry.attributes["category"], "Meat");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn repeated_create_overwrites() {
        let store = Arc::new(MemoryStore::new());
        let idx = indexer(store.clone());
        idx.create(preset()).unwrap();

        let mut attrs = preset().into_attributes();
        attrs.insert("cook_time".into(), json!("50m"));
        idx.create(Record::new(attrs)).unwrap();

        assert_eq!(store.len(), 2);
        let record = store
            .get("Meat", "Beef#Roast#No#Whole#Fresh#2lb#Pressure")
            .unwrap();
        assert_eq!(record.attributes["cook_time"], "50m");
    }

    #[test]
    fn invalid_record_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut attrs = preset().into_attributes();
        attrs.remove("cooking_method");

        let err = indexer(store.clone()).create(Record::new(attrs)).unwrap_err();
        assert!(matches!(err, IndexError::Validation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn reserved_prefix_collision_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut attrs = preset().into_attributes();
        attrs.insert("sub_category".into(), json!("SI"));

        let err = indexer(store.clone()).create(Record::new(attrs)).unwrap_err();
        assert!(matches!(err, IndexError::Validation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn failed_index_write_leaves_orphan_record() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            puts: AtomicUsize::new(0),
            fail_at: 2,
        });

        let err = indexer(store.clone()).create(preset()).unwrap_err();
        assert!(matches!(err, IndexError::Store(_)));
        assert_eq!(store.inner.len(), 1);
        assert!(store
            .inner
            .get("Meat", "Beef#Roast#No#Whole#Fresh#2lb#Pressure")
            .is_some());
    }

    #[test]
    fn atomic_writes_store_both_entries() {
        let store = Arc::new(MemoryStore::new());
        indexer(store.clone())
            .with_atomic_writes(true)
            .create(preset())
            .unwrap();
        assert_eq!(store.len(), 2);
    }
}
