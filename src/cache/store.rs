//! # 存储后端抽象
//!
//! 定义门面依赖的原始命令接口，以及按配置选择后端的组合入口

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::client::RedisStore;
use super::memory::MemoryStore;
use crate::config::{CacheConfig, CacheType};
use crate::error::{CacheError, Result};

/// 存储后端统一接口
///
/// 后端只处理字符串负载，值的序列化与错误吞咽策略都在门面层完成。
/// 每个方法对应远端存储的一条命令，调用之间不保留任何状态。
#[async_trait]
pub trait Store: Send + Sync {
    // ---- 键生命周期 ----

    /// 检查键是否存在
    async fn exists(&self, key: &str) -> Result<bool>;

    /// 删除一个或多个键，返回实际删除的数量
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    /// 设置键的过期时间（秒），键不存在时返回 `false`
    async fn expire(&self, key: &str, ttl_seconds: i64) -> Result<bool>;

    /// 获取键的剩余存活时间（秒）
    ///
    /// 返回 `-1` 表示未设置过期时间，`-2` 表示键不存在。
    async fn ttl(&self, key: &str) -> Result<i64>;

    // ---- 标量 ----

    /// 获取标量值
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 写入标量值，清除已有的过期时间
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// 写入标量值并设置过期时间（秒）
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// 对整数标量执行增量操作，键不存在时从 0 开始
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64>;

    // ---- 哈希 ----

    /// 获取哈希中单个字段的值
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// 获取哈希的全部字段
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// 写入哈希中的单个字段，哈希不存在时自动创建
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// 批量写入哈希字段
    async fn hash_set_all(&self, key: &str, entries: &[(String, String)]) -> Result<()>;

    /// 删除哈希中的字段，返回实际删除的数量
    async fn hash_delete(&self, key: &str, field: &str) -> Result<u64>;

    /// 检查哈希中是否存在某字段
    async fn hash_exists(&self, key: &str, field: &str) -> Result<bool>;

    /// 对哈希字段执行浮点增量，字段不存在时从 0 开始
    async fn hash_incr_by_float(&self, key: &str, field: &str, delta: f64) -> Result<f64>;

    // ---- 集合 ----

    /// 获取集合全部成员
    async fn set_members(&self, key: &str) -> Result<HashSet<String>>;

    /// 检查成员是否在集合中
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool>;

    /// 向集合添加成员，返回新增数量（重复成员不计）
    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64>;

    /// 获取集合大小
    async fn set_size(&self, key: &str) -> Result<u64>;

    /// 从集合移除成员，返回实际移除的数量
    async fn set_remove(&self, key: &str, members: &[String]) -> Result<u64>;

    // ---- 列表 ----

    /// 获取列表区间，`start=0, end=-1` 表示全部元素
    async fn list_range(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>>;

    /// 获取列表长度
    async fn list_size(&self, key: &str) -> Result<u64>;

    /// 按索引读取列表元素，负索引从尾部计数
    async fn list_index(&self, key: &str, index: i64) -> Result<Option<String>>;

    /// 向列表尾部追加元素（保持输入顺序），返回追加后的长度
    async fn list_push_right(&self, key: &str, values: &[String]) -> Result<u64>;

    /// 按索引覆写列表元素，索引越界时返回错误
    async fn list_set(&self, key: &str, index: i64, value: &str) -> Result<()>;

    /// 按三向计数策略移除与 `value` 相等的元素，返回移除数量
    ///
    /// `count_policy > 0` 从头部扫描最多移除 `count_policy` 个；
    /// `count_policy < 0` 从尾部扫描最多移除 `count_policy` 的绝对值个；
    /// `count_policy == 0` 移除全部匹配项。
    async fn list_remove(&self, key: &str, count_policy: i64, value: &str) -> Result<u64>;
}

/// 按配置选择的存储后端
///
/// 用枚举而非 trait object 分发，避免泛型方法带来的对象安全问题。
pub enum StoreBackend {
    /// 内存后端
    Memory(MemoryStore),
    /// Redis 后端
    Redis(RedisStore),
}

impl StoreBackend {
    /// 根据配置构建后端
    pub async fn from_config(config: &CacheConfig) -> Result<Self> {
        match config.cache_type {
            CacheType::Memory => {
                tracing::info!("使用内存后端，最大条目数: {}", config.memory_max_entries);
                Ok(Self::Memory(MemoryStore::new(config.memory_max_entries)))
            }
            CacheType::Redis => {
                let redis_config = config
                    .redis
                    .clone()
                    .ok_or_else(|| CacheError::config("缓存类型为 redis 时必须提供 [redis] 配置"))?;
                tracing::info!(
                    "使用 Redis 后端: {}:{}",
                    redis_config.host,
                    redis_config.port
                );
                Ok(Self::Redis(RedisStore::connect(redis_config).await?))
            }
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            StoreBackend::Memory($store) => $call,
            StoreBackend::Redis($store) => $call,
        }
    };
}

#[async_trait]
impl Store for StoreBackend {
    async fn exists(&self, key: &str) -> Result<bool> {
        dispatch!(self, store => store.exists(key).await)
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        dispatch!(self, store => store.delete(keys).await)
    }

    async fn expire(&self, key: &str, ttl_seconds: i64) -> Result<bool> {
        dispatch!(self, store => store.expire(key, ttl_seconds).await)
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        dispatch!(self, store => store.ttl(key).await)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        dispatch!(self, store => store.get(key).await)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        dispatch!(self, store => store.set(key, value).await)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        dispatch!(self, store => store.set_ex(key, value, ttl_seconds).await)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        dispatch!(self, store => store.incr_by(key, delta).await)
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        dispatch!(self, store => store.hash_get(key, field).await)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        dispatch!(self, store => store.hash_get_all(key).await)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        dispatch!(self, store => store.hash_set(key, field, value).await)
    }

    async fn hash_set_all(&self, key: &str, entries: &[(String, String)]) -> Result<()> {
        dispatch!(self, store => store.hash_set_all(key, entries).await)
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<u64> {
        dispatch!(self, store => store.hash_delete(key, field).await)
    }

    async fn hash_exists(&self, key: &str, field: &str) -> Result<bool> {
        dispatch!(self, store => store.hash_exists(key, field).await)
    }

    async fn hash_incr_by_float(&self, key: &str, field: &str, delta: f64) -> Result<f64> {
        dispatch!(self, store => store.hash_incr_by_float(key, field, delta).await)
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>> {
        dispatch!(self, store => store.set_members(key).await)
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
        dispatch!(self, store => store.set_contains(key, member).await)
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64> {
        dispatch!(self, store => store.set_add(key, members).await)
    }

    async fn set_size(&self, key: &str) -> Result<u64> {
        dispatch!(self, store => store.set_size(key).await)
    }

    async fn set_remove(&self, key: &str, members: &[String]) -> Result<u64> {
        dispatch!(self, store => store.set_remove(key, members).await)
    }

    async fn list_range(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>> {
        dispatch!(self, store => store.list_range(key, start, end).await)
    }

    async fn list_size(&self, key: &str) -> Result<u64> {
        dispatch!(self, store => store.list_size(key).await)
    }

    async fn list_index(&self, key: &str, index: i64) -> Result<Option<String>> {
        dispatch!(self, store => store.list_index(key, index).await)
    }

    async fn list_push_right(&self, key: &str, values: &[String]) -> Result<u64> {
        dispatch!(self, store => store.list_push_right(key, values).await)
    }

    async fn list_set(&self, key: &str, index: i64, value: &str) -> Result<()> {
        dispatch!(self, store => store.list_set(key, index, value).await)
    }

    async fn list_remove(&self, key: &str, count_policy: i64, value: &str) -> Result<u64> {
        dispatch!(self, store => store.list_remove(key, count_policy, value).await)
    }
}
