use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// 必填字段缺失或非法
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 读取到无法解析的行
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// 存储结果类型
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StoreError::ValidationError(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        StoreError::InvalidData(msg.into())
    }
}
