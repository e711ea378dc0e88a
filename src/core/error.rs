use thiserror::Error;

use crate::storage::StoreError;

pub type Result<T> = std::result::Result<T, IndexError>;

/// 索引层错误分类；HTTP 边界会把它们折叠成单一状态码，细节只写日志。
#[derive(Debug, Error)]
pub enum IndexError {
    /// facet 值缺失/格式错误，或查询条件不合法
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// 无法确定分区值
    #[error("missing partition facet {facet:?}")]
    MissingPartition { facet: String },
}

impl IndexError {
    pub fn validation(msg: impl Into<String>) -> Self {
        IndexError::Validation(msg.into())
    }
}
