use std::collections::BTreeMap;
use std::ops::Bound;

use dashmap::DashMap;

use crate::storage::{Item, StoreAdapter, StoreError};

/// 内存有序存储：DashMap 按分区分片，分区内 BTreeMap 保证排序键有序
#[derive(Default)]
pub struct MemoryStore {
    partitions: DashMap<String, BTreeMap<String, Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, partition: &str, sort_key: &str) -> Option<Item> {
        self.partitions
            .get(partition)
            .and_then(|p| p.get(sort_key).cloned())
    }
}

impl StoreAdapter for MemoryStore {
    fn put(&self, item: Item) -> Result<(), StoreError> {
        self.partitions
            .entry(item.partition.clone())
            .or_default()
            .insert(item.sort_key.clone(), item);
        Ok(())
    }

    fn query_begins_with(&self, partition: &str, prefix: &str) -> Result<Vec<Item>, StoreError> {
        let Some(shard) = self.partitions.get(partition) else {
            return Ok(Vec::new());
        };
        // 有序扫描：从 prefix 起，遇到第一个不匹配即停止
        let items = shard
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, v)| v.clone())
            .collect();
        Ok(items)
    }

    fn query_not_begins_with(
        &self,
        partition: &str,
        prefix: &str,
    ) -> Result<Vec<Item>, StoreError> {
        let Some(shard) = self.partitions.get(partition) else {
            return Ok(Vec::new());
        };
        let items = shard
            .iter()
            .filter(|(k, _)| !k.starts_with(prefix))
            .map(|(_, v)| v.clone())
            .collect();
        Ok(items)
    }

    fn partitions(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.partitions.iter().map(|p| p.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    /// 同一分区内的批量写原子可见：整批持有同一个分片写锁。
    /// 跨分区的批量退化为逐分区写入。
    fn write_batch(&self, items: Vec<Item>) -> Result<(), StoreError> {
        let mut grouped: BTreeMap<String, Vec<Item>> = BTreeMap::new();
        for item in items {
            grouped.entry(item.partition.clone()).or_default().push(item);
        }
        for (partition, items) in grouped {
            let mut shard = self.partitions.entry(partition).or_default();
            for item in items {
                shard.insert(item.sort_key.clone(), item);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn item(partition: &str, sort_key: &str) -> Item {
        Item {
            partition: partition.to_string(),
            sort_key: sort_key.to_string(),
            attributes: Map::new(),
        }
    }

    fn keys(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.sort_key.as_str()).collect()
    }

    #[test]
    fn begins_with_is_ordered_and_partition_scoped() {
        let store = MemoryStore::new();
        store.put(item("Meat", "Pork#Chop")).unwrap();
        store.put(item("Meat", "Beef#Roast")).unwrap();
        store.put(item("Meat", "Beef#Brisket")).unwrap();
        store.put(item("Poultry", "Beef#Odd")).unwrap();

        let r = store.query_begins_with("Meat", "Beef").unwrap();
        assert_eq!(keys(&r), vec!["Beef#Brisket", "Beef#Roast"]);
        assert!(store.query_begins_with("Grains", "").unwrap().is_empty());
    }

    #[test]
    fn not_begins_with_excludes_reserved_prefix() {
        let store = MemoryStore::new();
        store.put(item("Meat", "Beef#Roast")).unwrap();
        store.put(item("Meat", "SI#Beef#Roast")).unwrap();

        let r = store.query_not_begins_with("Meat", "SI#").unwrap();
        assert_eq!(keys(&r), vec!["Beef#Roast"]);
        let r = store.query_begins_with("Meat", "SI#").unwrap();
        assert_eq!(keys(&r), vec!["SI#Beef#Roast"]);
    }

    #[test]
    fn put_is_last_write_wins() {
        let store = MemoryStore::new();
        let mut first = item("Meat", "Beef");
        first.attributes.insert("v".into(), 1.into());
        let mut second = item("Meat", "Beef");
        second.attributes.insert("v".into(), 2.into());
        store.put(first).unwrap();
        store.put(second).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("Meat", "Beef").unwrap().attributes["v"], 2);
    }

    #[test]
    fn write_batch_spans_partitions() {
        let store = MemoryStore::new();
        store
            .write_batch(vec![item("Meat", "a"), item("Meat", "SI#a"), item("Grains", "b")])
            .unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.partitions().unwrap(), vec!["Grains", "Meat"]);
    }
}
