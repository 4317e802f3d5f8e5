//! # 错误类型定义

use thiserror::Error;

/// 缓存库主要错误类型
#[derive(Debug, Error)]
pub enum CacheError {
    /// 配置相关错误
    #[error("配置错误: {message}")]
    Config {
        /// 错误描述
        message: String,
        /// 底层错误
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 序列化/反序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        /// 错误描述
        message: String,
        /// 底层错误
        #[source]
        source: anyhow::Error,
    },

    /// 存储后端访问错误（连接中断、命令失败等）
    #[error("存储访问错误: {message}")]
    Store {
        /// 错误描述
        message: String,
        /// 底层错误
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 键已存在但数据结构类型不匹配
    #[error("数据结构类型不匹配: {message}")]
    WrongType {
        /// 错误描述
        message: String,
    },

    /// 调用方契约违反，快速失败且不访问存储
    #[error("调用契约违反: {message}")]
    Contract {
        /// 错误描述
        message: String,
    },
}

impl CacheError {
    /// 配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 带底层原因的配置错误
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(anyhow::Error::new(source)),
        }
    }

    /// 带底层原因的序列化错误
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            source: anyhow::Error::new(source),
        }
    }

    /// 存储后端错误
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// 带底层原因的存储后端错误
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(anyhow::Error::new(source)),
        }
    }

    /// 数据结构类型不匹配错误
    pub fn wrong_type(message: impl Into<String>) -> Self {
        Self::WrongType {
            message: message.into(),
        }
    }

    /// 契约违反错误
    pub fn contract(message: impl Into<String>) -> Self {
        Self::Contract {
            message: message.into(),
        }
    }

    /// 是否为契约违反错误
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Contract { .. })
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(error: redis::RedisError) -> Self {
        Self::Store {
            message: "Redis 命令执行失败".to_string(),
            source: Some(anyhow::Error::new(error)),
        }
    }
}
