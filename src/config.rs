use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// 服务配置（TOML）。所有字段都有默认值：空文件即默认的烹饪预设部署。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub schema: SchemaConfig,
    pub query: QueryConfig,
    pub index: IndexConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 6060,
        }
    }
}

/// facet 顺序即 depth 顺序；分类列表与默认分类属于产品配置，不从数据推导
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub partition_facet: String,
    pub sort_facets: Vec<String>,
    pub categories: Vec<String>,
    pub default_category: String,
    /// 组合键在 item 里的属性名
    pub key_attribute: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            partition_facet: "category".to_string(),
            sort_facets: owned(&[
                "sub_category",
                "type",
                "bone_in",
                "prep",
                "freshness",
                "amount",
                "cooking_method",
            ]),
            categories: owned(&["Grains", "Legumes", "Meat", "Poultry", "Vegetables"]),
            default_category: "Grains".to_string(),
            key_attribute: "ingredients".to_string(),
        }
    }
}

fn owned(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|s| s.to_string()).collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub result_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            result_limit: crate::query::engine::DEFAULT_RESULT_LIMIT,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// true：记录与索引条目走 `write_batch` 一次写入
    pub atomic_writes: bool,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 显式路径必须存在；默认路径不存在时使用内置默认值
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// `<config dir>/preset-index/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("preset-index").join(CONFIG_FILE_NAME))
}
