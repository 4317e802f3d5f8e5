//! # 缓存模块
//!
//! 存储后端抽象与统一缓存门面

pub mod client;
pub mod facade;
pub mod memory;
pub mod store;

pub use client::RedisStore;
pub use facade::CacheFacade;
pub use memory::MemoryStore;
pub use store::{Store, StoreBackend};
