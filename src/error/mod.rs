//! 统一错误处理。

pub mod types;

pub use types::CacheError;

/// 整个 crate 统一使用的 `Result` 类型。
///
/// 所有可能失败的函数都应该返回该类型。
pub type Result<T> = std::result::Result<T, CacheError>;
