use std::collections::BTreeSet;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::core::FacetSchema;
use crate::index::key::{strip_index_prefix, KeyEncoder};
use crate::storage::Item;

/// 每个 facet 的候选值集合，按 schema 顺序排列（分区 facet 在首位）
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FacetOptions {
    entries: Vec<(String, BTreeSet<String>)>,
}

impl FacetOptions {
    pub fn get(&self, facet: &str) -> Option<&BTreeSet<String>> {
        self.entries
            .iter()
            .find(|(f, _)| f == facet)
            .map(|(_, values)| values)
    }

    pub fn facets(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(f, _)| f.as_str())
    }
}

impl Serialize for FacetOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (facet, values) in &self.entries {
            map.serialize_entry(facet, values)?;
        }
        map.end()
    }
}

/// 从检索索引条目重建“仍可继续细分”的 facet 值集合
pub struct FacetAggregator {
    schema: Arc<FacetSchema>,
    encoder: KeyEncoder,
}

impl FacetAggregator {
    pub fn new(schema: Arc<FacetSchema>) -> Self {
        Self {
            encoder: KeyEncoder::new(schema.clone()),
            schema,
        }
    }

    /// 目标深度：已给出全部 facet 时完全展开，否则比已给出的多一层
    pub fn target_depth(&self, supplied: usize) -> usize {
        let max_depth = self.schema.max_depth();
        if supplied >= max_depth {
            max_depth
        } else {
            supplied + 1
        }
    }

    /// - 分区 facet 永远是静态全集
    /// - 其余 facet 先置空集，再对每个条目从 target_depth 向下走到 depth 2，
    ///   把沿途每一层的值都收进来（不仅仅是下一层）
    pub fn aggregate(&self, index_entries: &[Item], supplied: usize) -> FacetOptions {
        let mut sets: Vec<BTreeSet<String>> =
            vec![BTreeSet::new(); self.schema.sort_facets().len()];
        let target = self.target_depth(supplied);

        for entry in index_entries {
            let Some(sort_key) = strip_index_prefix(&entry.sort_key) else {
                tracing::debug!(key = %entry.sort_key, "skip non-index entry in facet scan");
                continue;
            };
            let values = self.encoder.split(sort_key);
            for depth in (2..=target).rev() {
                match values.get(depth - 2) {
                    Some(v) => {
                        sets[depth - 2].insert((*v).to_string());
                    }
                    None => {
                        tracing::debug!(
                            key = %entry.sort_key,
                            depth,
                            "index entry shorter than schema"
                        );
                    }
                }
            }
        }

        let mut entries = Vec::with_capacity(self.schema.max_depth());
        entries.push((
            self.schema.partition_facet().to_string(),
            self.schema.categories().iter().cloned().collect(),
        ));
        entries.extend(self.schema.sort_facets().iter().cloned().zip(sets));
        FacetOptions { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn entry(sort_key: &str) -> Item {
        Item {
            partition: "Meat".into(),
            sort_key: format!("SI#{sort_key}"),
            attributes: Map::new(),
        }
    }

    fn aggregator() -> FacetAggregator {
        FacetAggregator::new(Arc::new(FacetSchema::cooking_presets()))
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn sample() -> Vec<Item> {
        vec![
            entry("Beef#Roast#No#Whole#Fresh#2lb#Pressure"),
            entry("Beef#Brisket#No#Whole#Frozen#3lb#Pressure"),
            entry("Pork#Chop#Yes#Sliced#Fresh#1lb#Saute"),
        ]
    }

    #[test]
    fn target_depth_is_one_past_supplied_or_max() {
        let agg = aggregator();
        assert_eq!(agg.target_depth(1), 2);
        assert_eq!(agg.target_depth(7), 8);
        assert_eq!(agg.target_depth(8), 8);
    }

    #[test]
    fn category_only_populates_next_level() {
        let opts = aggregator().aggregate(&sample(), 1);

        assert_eq!(opts.facets().count(), 8);
        assert_eq!(
            opts.get("category"),
            Some(&set(&["Grains", "Legumes", "Meat", "Poultry", "Vegetables"]))
        );
        assert_eq!(opts.get("sub_category"), Some(&set(&["Beef", "Pork"])));
        assert_eq!(opts.get("type"), Some(&BTreeSet::new()));
        assert_eq!(opts.get("cooking_method"), Some(&BTreeSet::new()));
    }

    #[test]
    fn depth_walk_fills_every_level_down_to_two() {
        // supplied = 3 (category, sub_category, type) -> target 4: bone_in, type, sub_category
        let opts = aggregator().aggregate(&sample(), 3);

        assert_eq!(opts.get("sub_category"), Some(&set(&["Beef", "Pork"])));
        assert_eq!(opts.get("type"), Some(&set(&["Brisket", "Chop", "Roast"])));
        assert_eq!(opts.get("bone_in"), Some(&set(&["No", "Yes"])));
        assert_eq!(opts.get("prep"), Some(&BTreeSet::new()));
    }

    #[test]
    fn full_depth_expands_everything() {
        let opts = aggregator().aggregate(&sample(), 8);
        assert_eq!(opts.get("cooking_method"), Some(&set(&["Pressure", "Saute"])));
        assert_eq!(opts.get("amount"), Some(&set(&["1lb", "2lb", "3lb"])));
    }

    #[test]
    fn no_entries_still_lists_every_facet() {
        let opts = aggregator().aggregate(&[], 1);
        let facets: Vec<&str> = opts.facets().collect();
        assert_eq!(
            facets,
            vec![
                "category",
                "sub_category",
                "type",
                "bone_in",
                "prep",
                "freshness",
                "amount",
                "cooking_method"
            ]
        );
        assert_eq!(opts.get("category").unwrap().len(), 5);
    }

    #[test]
    fn serializes_in_schema_order() {
        let opts = aggregator().aggregate(&sample()[..1], 1);
        let json = serde_json::to_string(&opts).unwrap();
        assert!(json.starts_with(
            r#"{"category":["Grains","Legumes","Meat","Poultry","Vegetables"],"sub_category":["Beef"],"type":[]"#
        ));
    }
}
