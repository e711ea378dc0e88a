use std::collections::BTreeMap;

use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

use crate::core::error::{IndexError, Result};
use crate::core::schema::{FacetSchema, DELIMITER};

/// facet 名 -> facet 值
pub type FacetValues = BTreeMap<String, String>;

/// facet 值统一做 NFC：规范等价的输入必须落到同一个组合键
pub fn normalize_value(value: &str) -> String {
    value.nfc().collect()
}

/// 一条目录记录：facet 值 + 任意 payload 属性（JSON object）
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    attributes: Map<String, Value>,
}

impl Record {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self { attributes }
    }

    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(attributes) => Ok(Self { attributes }),
            other => Err(IndexError::validation(format!(
                "record must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn into_attributes(self) -> Map<String, Value> {
        self.attributes
    }

    /// 抽取并校验全部 schema facet：
    /// 必须存在、为非空字符串、不含分隔符。
    pub fn facet_values(&self, schema: &FacetSchema) -> Result<FacetValues> {
        let mut values = FacetValues::new();
        for facet in schema.facets() {
            let raw = match self.attributes.get(facet) {
                Some(Value::String(s)) => s,
                Some(other) => {
                    return Err(IndexError::validation(format!(
                        "facet {:?} must be a string, got {}",
                        facet,
                        json_kind(other)
                    )))
                }
                None => {
                    return Err(IndexError::validation(format!("missing facet {:?}", facet)))
                }
            };
            let value = normalize_value(raw);
            if value.is_empty() {
                return Err(IndexError::validation(format!("facet {:?} is empty", facet)));
            }
            if value.contains(DELIMITER) {
                return Err(IndexError::validation(format!(
                    "facet {:?} value {:?} contains delimiter {:?}",
                    facet, value, DELIMITER
                )));
            }
            values.insert(facet.to_string(), value);
        }
        Ok(values)
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
