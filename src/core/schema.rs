use std::collections::HashSet;

use crate::config::SchemaConfig;
use crate::core::error::IndexError;

/// 组合键分隔符（facet 值中不允许出现）
pub const DELIMITER: char = '#';

/// 检索索引条目的保留前缀（"SI#" + 组合键）
pub const INDEX_PREFIX: &str = "SI#";

/// Facet Schema：固定有序的 facet 列表。
///
/// - depth 从 1 开始：分区 facet 为 1，排序键 facet 依次为 2..=K+1
/// - 进程级不可变配置，以 `Arc<FacetSchema>` 注入各组件
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FacetSchema {
    partition_facet: String,
    sort_facets: Vec<String>,
    categories: Vec<String>,
    default_category: String,
    key_attribute: String,
}

impl FacetSchema {
    pub fn from_config(cfg: &SchemaConfig) -> Result<Self, IndexError> {
        let mut seen = HashSet::new();
        let names = std::iter::once(&cfg.partition_facet).chain(cfg.sort_facets.iter());
        for name in names {
            if name.is_empty() {
                return Err(IndexError::Validation("facet name must not be empty".into()));
            }
            if name.contains(DELIMITER) {
                return Err(IndexError::Validation(format!(
                    "facet name {:?} contains delimiter {:?}",
                    name, DELIMITER
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(IndexError::Validation(format!("duplicate facet {:?}", name)));
            }
        }
        if cfg.sort_facets.is_empty() {
            return Err(IndexError::Validation("schema needs at least one sort facet".into()));
        }
        if cfg.key_attribute.is_empty() || seen.contains(cfg.key_attribute.as_str()) {
            return Err(IndexError::Validation(format!(
                "key attribute {:?} must be non-empty and distinct from facet names",
                cfg.key_attribute
            )));
        }
        if !cfg.categories.contains(&cfg.default_category) {
            return Err(IndexError::Validation(format!(
                "default category {:?} is not in the category list",
                cfg.default_category
            )));
        }

        Ok(Self::build(cfg))
    }

    /// 默认部署：烹饪预设
    pub fn cooking_presets() -> Self {
        Self::build(&SchemaConfig::default())
    }

    fn build(cfg: &SchemaConfig) -> Self {
        Self {
            partition_facet: cfg.partition_facet.clone(),
            sort_facets: cfg.sort_facets.clone(),
            categories: cfg.categories.clone(),
            default_category: cfg.default_category.clone(),
            key_attribute: cfg.key_attribute.clone(),
        }
    }

    pub fn partition_facet(&self) -> &str {
        &self.partition_facet
    }

    pub fn sort_facets(&self) -> &[String] {
        &self.sort_facets
    }

    /// 全部 facet（分区在前）
    pub fn facets(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_facet.as_str())
            .chain(self.sort_facets.iter().map(String::as_str))
    }

    /// K + 1
    pub fn max_depth(&self) -> usize {
        self.sort_facets.len() + 1
    }

    pub fn facet_at(&self, depth: usize) -> Option<&str> {
        match depth {
            0 => None,
            1 => Some(&self.partition_facet),
            d => self.sort_facets.get(d - 2).map(String::as_str),
        }
    }

    pub fn depth_of(&self, facet: &str) -> Option<usize> {
        self.facets().position(|f| f == facet).map(|i| i + 1)
    }

    pub fn is_facet(&self, name: &str) -> bool {
        self.depth_of(name).is_some()
    }

    /// 分区 facet 的静态全集（不依赖扫描结果）
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    /// 组合键在 item 中的属性名
    pub fn key_attribute(&self) -> &str {
        &self.key_attribute
    }
}
