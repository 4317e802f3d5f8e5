//! # Cache Kit
//!
//! 面向远端键值存储的统一缓存门面库：以一套接口访问标量、
//! 哈希、集合、列表四种数据结构，并提供键生命周期操作
//! （存在性检查、删除、过期时间）。
//!
//! 组合方式是显式的：先从配置构建存储后端，再把后端注入门面，
//! 最后把门面传给使用方。
//!
//! ```no_run
//! use cache_kit::{CacheConfig, CacheFacade};
//!
//! # async fn compose() -> cache_kit::Result<()> {
//! let config = CacheConfig::default();
//! let cache = CacheFacade::from_config(&config).await?;
//!
//! cache.set("greeting", &"你好".to_string()).await;
//! let value: Option<String> = cache.get("greeting").await;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use cache::{CacheFacade, MemoryStore, RedisStore, Store, StoreBackend};
pub use config::{CacheConfig, CacheType, RedisConfig, load_config};
pub use error::{CacheError, Result};
