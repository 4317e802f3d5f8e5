//! # Redis 存储后端
//!
//! 提供 Redis 连接管理和原始命令执行。连接由 `ConnectionManager`
//! 维护，按调用克隆句柄，后端自身不做任何跨调用协调。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};

use super::store::Store;
use crate::config::RedisConfig;
use crate::error::{CacheError, Result};

/// Redis 存储后端
#[derive(Clone)]
pub struct RedisStore {
    /// Redis 连接管理器
    connection_manager: ConnectionManager,
    /// 配置信息
    config: RedisConfig,
}

impl RedisStore {
    /// 建立到 Redis 服务器的连接
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        tracing::info!("正在连接 Redis 服务器: {}:{}", config.host, config.port);

        let client = Client::open(config.build_url())
            .map_err(|e| CacheError::store_with_source("创建 Redis 客户端失败", e))?;

        let connection_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::store_with_source("建立 Redis 连接失败", e))?;

        tracing::info!("Redis 连接建立成功");

        Ok(Self {
            connection_manager,
            config,
        })
    }

    /// 测试连接
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection_manager.clone();

        let response: String = redis::Cmd::new()
            .arg("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::store_with_source("Redis ping 失败", e))?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(CacheError::store(format!("Redis ping 响应异常: {response}")))
        }
    }

    /// 获取配置信息
    #[must_use]
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection_manager.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        let mut conn = self.connection_manager.clone();
        let removed: u64 = conn.del(keys).await?;
        Ok(removed)
    }

    async fn expire(&self, key: &str, ttl_seconds: i64) -> Result<bool> {
        let mut conn = self.connection_manager.clone();
        let applied: bool = conn.expire(key, ttl_seconds).await?;
        Ok(applied)
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        let mut conn = self.connection_manager.clone();
        let ttl: i64 = conn.ttl(key).await?;
        Ok(ttl)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection_manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let mut conn = self.connection_manager.clone();
        let value: i64 = conn.incr(key, delta).await?;
        Ok(value)
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.connection_manager.clone();
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.connection_manager.clone();
        let entries: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(entries)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn hash_set_all(&self, key: &str, entries: &[(String, String)]) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        let _: () = conn.hset_multiple(key, entries).await?;
        Ok(())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<u64> {
        let mut conn = self.connection_manager.clone();
        let removed: u64 = conn.hdel(key, field).await?;
        Ok(removed)
    }

    async fn hash_exists(&self, key: &str, field: &str) -> Result<bool> {
        let mut conn = self.connection_manager.clone();
        let exists: bool = conn.hexists(key, field).await?;
        Ok(exists)
    }

    async fn hash_incr_by_float(&self, key: &str, field: &str, delta: f64) -> Result<f64> {
        let mut conn = self.connection_manager.clone();
        let value: f64 = conn.hincr(key, field, delta).await?;
        Ok(value)
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>> {
        let mut conn = self.connection_manager.clone();
        let members: HashSet<String> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
        let mut conn = self.connection_manager.clone();
        let contains: bool = conn.sismember(key, member).await?;
        Ok(contains)
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64> {
        let mut conn = self.connection_manager.clone();
        let added: u64 = conn.sadd(key, members).await?;
        Ok(added)
    }

    async fn set_size(&self, key: &str) -> Result<u64> {
        let mut conn = self.connection_manager.clone();
        let size: u64 = conn.scard(key).await?;
        Ok(size)
    }

    async fn set_remove(&self, key: &str, members: &[String]) -> Result<u64> {
        let mut conn = self.connection_manager.clone();
        let removed: u64 = conn.srem(key, members).await?;
        Ok(removed)
    }

    async fn list_range(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>> {
        let mut conn = self.connection_manager.clone();
        let values: Vec<String> = conn.lrange(key, start as isize, end as isize).await?;
        Ok(values)
    }

    async fn list_size(&self, key: &str) -> Result<u64> {
        let mut conn = self.connection_manager.clone();
        let size: u64 = conn.llen(key).await?;
        Ok(size)
    }

    async fn list_index(&self, key: &str, index: i64) -> Result<Option<String>> {
        let mut conn = self.connection_manager.clone();
        let value: Option<String> = conn.lindex(key, index as isize).await?;
        Ok(value)
    }

    async fn list_push_right(&self, key: &str, values: &[String]) -> Result<u64> {
        let mut conn = self.connection_manager.clone();
        let length: u64 = conn.rpush(key, values).await?;
        Ok(length)
    }

    async fn list_set(&self, key: &str, index: i64, value: &str) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        let _: () = conn.lset(key, index as isize, value).await?;
        Ok(())
    }

    async fn list_remove(&self, key: &str, count_policy: i64, value: &str) -> Result<u64> {
        let mut conn = self.connection_manager.clone();
        let removed: u64 = conn.lrem(key, count_policy as isize, value).await?;
        Ok(removed)
    }
}
