//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 源 ID 重复注册
    #[error("source {source_id} is already registered")]
    AlreadyRegistered {
        /// 源 ID
        source_id: String,
    },
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
