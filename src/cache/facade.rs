//! # 统一缓存门面
//!
//! 在存储后端之上提供标量、哈希、集合、列表四种数据结构的
//! 统一访问接口。值的 JSON 序列化和错误吞咽策略集中在这一层，
//! 后端只负责原始命令。
//!
//! 错误策略是有意不对称的两层：除 `decrement` 外的所有操作都把
//! 后端故障吞掉，记一条 warn 日志后返回中性降级值（`false`、`0`、
//! `None`、空容器）。调用方因此无法区分"键不存在"与"后端故障"，
//! 排查问题需要查看日志。`decrement` 在入参非法时快速失败，
//! 不访问存储。

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::{Serialize, de::DeserializeOwned};

use super::store::{Store, StoreBackend};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// 统一缓存门面
///
/// 门面本身无状态，可在多个任务间共享；所有可变状态都在远端存储。
pub struct CacheFacade<S: Store> {
    store: S,
}

/// 序列化缓存值
fn encode<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| CacheError::serialization_with_source("序列化缓存值失败", e))
}

/// 批量序列化缓存值，保持输入顺序
fn encode_all<T: Serialize>(values: &[T]) -> Result<Vec<String>> {
    values.iter().map(encode).collect()
}

/// 反序列化缓存值
fn decode<T: DeserializeOwned>(payload: &str) -> Result<T> {
    serde_json::from_str(payload)
        .map_err(|e| CacheError::serialization_with_source("反序列化缓存值失败", e))
}

/// 错误吞咽策略的唯一出口
///
/// 失败在这里转换为中性降级值；未来若要换成携带错误种类的
/// 返回类型，只需替换该函数。
fn absorb<T>(op: &'static str, key: &str, outcome: Result<T>, fallback: T) -> T {
    match outcome {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(op, key, error = %error, "缓存操作失败，返回降级值");
            fallback
        }
    }
}

impl<S: Store> CacheFacade<S> {
    /// 通过构造注入存储后端
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// 获取底层后端的引用
    pub const fn store(&self) -> &S {
        &self.store
    }

    // ---- 键生命周期 ----

    /// 检查键是否存在，后端故障吞为 `false`
    pub async fn exists(&self, key: &str) -> bool {
        absorb("exists", key, self.store.exists(key).await, false)
    }

    /// 删除一个或多个键，键列表为空时不访问存储
    pub async fn delete(&self, keys: &[&str]) {
        if keys.is_empty() {
            return;
        }
        let keys: Vec<String> = keys.iter().map(ToString::to_string).collect();
        let joined = keys.join(",");
        absorb("delete", &joined, self.store.delete(&keys).await.map(|_| ()), ());
    }

    /// 设置键的过期时间（秒）
    ///
    /// `ttl_seconds <= 0` 时不改动键，原样报告成功；后端故障吞为 `false`。
    pub async fn expire(&self, key: &str, ttl_seconds: i64) -> bool {
        if ttl_seconds <= 0 {
            return true;
        }
        absorb("expire", key, self.store.expire(key, ttl_seconds).await, false)
    }

    /// 获取键的剩余存活时间（秒）
    ///
    /// `-1` 表示未设置过期时间，`-2` 表示键不存在；后端故障吞为 `-2`。
    pub async fn get_ttl(&self, key: &str) -> i64 {
        absorb("get_ttl", key, self.store.ttl(key).await, -2)
    }

    // ---- 标量 ----

    /// 获取标量值，键不存在或后端故障时返回 `None`
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        let outcome = async {
            match self.store.get(key).await? {
                Some(payload) => Ok(Some(decode(&payload)?)),
                None => Ok(None),
            }
        }
        .await;
        absorb("get", key, outcome, None)
    }

    /// 无条件写入标量值，不带过期时间
    pub async fn set<T>(&self, key: &str, value: &T) -> bool
    where
        T: Serialize + Sync,
    {
        let outcome = async {
            let payload = encode(value)?;
            self.store.set(key, &payload).await
        }
        .await;
        absorb("set", key, outcome.map(|()| true), false)
    }

    /// 写入标量值并设置过期时间（秒）
    ///
    /// `ttl_seconds <= 0` 时退化为不带过期时间的写入。
    pub async fn set_with_ttl<T>(&self, key: &str, value: &T, ttl_seconds: i64) -> bool
    where
        T: Serialize + Sync,
    {
        if ttl_seconds <= 0 {
            return self.set(key, value).await;
        }
        let outcome = async {
            let payload = encode(value)?;
            #[allow(clippy::cast_sign_loss)]
            let ttl = ttl_seconds as u64;
            self.store.set_ex(key, &payload, ttl).await
        }
        .await;
        absorb("set_with_ttl", key, outcome.map(|()| true), false)
    }

    /// 递减整数值，返回递减后的结果
    ///
    /// `delta` 为递减幅度，必须为非负数；传入负数属于调用契约违反，
    /// 直接返回错误且不访问存储。这是唯一不吞错误的操作，
    /// 后端故障也会原样返回给调用方。
    pub async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        if delta < 0 {
            return Err(CacheError::contract(format!(
                "递减步长必须为非负数: {delta}"
            )));
        }
        self.store.incr_by(key, -delta).await
    }

    // ---- 哈希 ----

    /// 获取哈希中单个字段的值
    pub async fn hash_get<T>(&self, key: &str, field: &str) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        let outcome = async {
            match self.store.hash_get(key, field).await? {
                Some(payload) => Ok(Some(decode(&payload)?)),
                None => Ok(None),
            }
        }
        .await;
        absorb("hash_get", key, outcome, None)
    }

    /// 获取哈希的全部字段，后端故障吞为空映射
    pub async fn hash_get_all<T>(&self, key: &str) -> HashMap<String, T>
    where
        T: DeserializeOwned + Send,
    {
        let outcome = async {
            let raw = self.store.hash_get_all(key).await?;
            let mut entries = HashMap::with_capacity(raw.len());
            for (field, payload) in raw {
                entries.insert(field, decode(&payload)?);
            }
            Ok(entries)
        }
        .await;
        absorb("hash_get_all", key, outcome, HashMap::new())
    }

    /// 批量写入哈希字段
    pub async fn hash_set_all<T>(&self, key: &str, entries: &HashMap<String, T>) -> bool
    where
        T: Serialize + Sync,
    {
        let outcome = async {
            let mut payload = Vec::with_capacity(entries.len());
            for (field, value) in entries {
                payload.push((field.clone(), encode(value)?));
            }
            self.store.hash_set_all(key, &payload).await
        }
        .await;
        absorb("hash_set_all", key, outcome.map(|()| true), false)
    }

    /// 批量写入哈希字段，写入成功后在 `ttl_seconds > 0` 时附加过期时间
    pub async fn hash_set_all_with_expire<T>(
        &self,
        key: &str,
        entries: &HashMap<String, T>,
        ttl_seconds: i64,
    ) -> bool
    where
        T: Serialize + Sync,
    {
        if !self.hash_set_all(key, entries).await {
            return false;
        }
        if ttl_seconds > 0 {
            let _ = self.expire(key, ttl_seconds).await;
        }
        true
    }

    /// 写入哈希中的单个字段，哈希不存在时自动创建
    pub async fn hash_set_field<T>(&self, key: &str, field: &str, value: &T) -> bool
    where
        T: Serialize + Sync,
    {
        let outcome = async {
            let payload = encode(value)?;
            self.store.hash_set(key, field, &payload).await
        }
        .await;
        absorb("hash_set_field", key, outcome.map(|()| true), false)
    }

    /// 删除哈希中的字段
    pub async fn hash_delete(&self, key: &str, field: &str) {
        absorb(
            "hash_delete",
            key,
            self.store.hash_delete(key, field).await.map(|_| ()),
            (),
        );
    }

    /// 检查哈希中是否存在某字段
    pub async fn hash_exists(&self, key: &str, field: &str) -> bool {
        absorb(
            "hash_exists",
            key,
            self.store.hash_exists(key, field).await,
            false,
        )
    }

    /// 对哈希字段执行浮点增量，返回增量后的值
    ///
    /// `amount` 可以为负以实现递减；字段不存在时先按 0 创建再应用增量。
    /// 后端故障吞为 `0.0`。
    pub async fn hash_increment(&self, key: &str, field: &str, amount: f64) -> f64 {
        absorb(
            "hash_increment",
            key,
            self.store.hash_incr_by_float(key, field, amount).await,
            0.0,
        )
    }

    // ---- 集合 ----

    /// 获取集合全部成员，后端故障时返回 `None`
    pub async fn set_members<T>(&self, key: &str) -> Option<HashSet<T>>
    where
        T: DeserializeOwned + Eq + Hash + Send,
    {
        let outcome = async {
            let raw = self.store.set_members(key).await?;
            let mut members = HashSet::with_capacity(raw.len());
            for payload in raw {
                members.insert(decode(&payload)?);
            }
            Ok(Some(members))
        }
        .await;
        absorb("set_members", key, outcome, None)
    }

    /// 检查成员是否在集合中，后端故障吞为 `false`
    pub async fn set_contains<T>(&self, key: &str, member: &T) -> bool
    where
        T: Serialize + Sync,
    {
        let outcome = async {
            let payload = encode(member)?;
            self.store.set_contains(key, &payload).await
        }
        .await;
        absorb("set_contains", key, outcome, false)
    }

    /// 向集合添加成员，返回新增数量，后端故障吞为 `0`
    pub async fn set_add<T>(&self, key: &str, members: &[T]) -> u64
    where
        T: Serialize + Sync,
    {
        let outcome = async {
            let payload = encode_all(members)?;
            self.store.set_add(key, &payload).await
        }
        .await;
        absorb("set_add", key, outcome, 0)
    }

    /// 向集合添加成员，成功后在 `ttl_seconds > 0` 时附加过期时间
    pub async fn set_add_with_expire<T>(&self, key: &str, ttl_seconds: i64, members: &[T]) -> u64
    where
        T: Serialize + Sync,
    {
        let outcome = async {
            let payload = encode_all(members)?;
            self.store.set_add(key, &payload).await
        }
        .await;
        match outcome {
            Ok(added) => {
                if ttl_seconds > 0 {
                    let _ = self.expire(key, ttl_seconds).await;
                }
                added
            }
            Err(error) => {
                tracing::warn!(op = "set_add_with_expire", key, error = %error, "缓存操作失败，返回降级值");
                0
            }
        }
    }

    /// 获取集合大小，后端故障吞为 `0`
    pub async fn set_size(&self, key: &str) -> u64 {
        absorb("set_size", key, self.store.set_size(key).await, 0)
    }

    /// 从集合移除成员，返回实际移除的数量
    pub async fn set_remove<T>(&self, key: &str, members: &[T]) -> u64
    where
        T: Serialize + Sync,
    {
        let outcome = async {
            let payload = encode_all(members)?;
            self.store.set_remove(key, &payload).await
        }
        .await;
        absorb("set_remove", key, outcome, 0)
    }

    // ---- 列表 ----

    /// 获取列表区间，后端故障时返回 `None`
    ///
    /// `start=0, end=-1` 表示全部元素，区间语义由远端存储定义。
    pub async fn list_range<T>(&self, key: &str, start: i64, end: i64) -> Option<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let outcome = async {
            let raw = self.store.list_range(key, start, end).await?;
            let mut values = Vec::with_capacity(raw.len());
            for payload in raw {
                values.push(decode(&payload)?);
            }
            Ok(Some(values))
        }
        .await;
        absorb("list_range", key, outcome, None)
    }

    /// 获取列表长度，后端故障吞为 `0`
    pub async fn list_size(&self, key: &str) -> u64 {
        absorb("list_size", key, self.store.list_size(key).await, 0)
    }

    /// 按索引读取列表元素
    ///
    /// 非负索引从头部 0 开始计数，负索引从尾部计数（`-1` 为最后一个元素）。
    pub async fn list_get_by_index<T>(&self, key: &str, index: i64) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        let outcome = async {
            match self.store.list_index(key, index).await? {
                Some(payload) => Ok(Some(decode(&payload)?)),
                None => Ok(None),
            }
        }
        .await;
        absorb("list_get_by_index", key, outcome, None)
    }

    /// 向列表尾部追加单个元素，列表不存在时自动创建
    pub async fn list_push_right<T>(&self, key: &str, value: &T) -> bool
    where
        T: Serialize + Sync,
    {
        let outcome = async {
            let payload = encode(value)?;
            self.store
                .list_push_right(key, std::slice::from_ref(&payload))
                .await
        }
        .await;
        absorb("list_push_right", key, outcome.map(|_| true), false)
    }

    /// 向列表尾部追加单个元素，成功后在 `ttl_seconds > 0` 时附加过期时间
    pub async fn list_push_right_with_expire<T>(
        &self,
        key: &str,
        ttl_seconds: i64,
        value: &T,
    ) -> bool
    where
        T: Serialize + Sync,
    {
        if !self.list_push_right(key, value).await {
            return false;
        }
        if ttl_seconds > 0 {
            let _ = self.expire(key, ttl_seconds).await;
        }
        true
    }

    /// 批量追加到列表尾部，保持输入顺序
    pub async fn list_push_right_all<T>(&self, key: &str, values: &[T]) -> bool
    where
        T: Serialize + Sync,
    {
        let outcome = async {
            let payload = encode_all(values)?;
            self.store.list_push_right(key, &payload).await
        }
        .await;
        absorb("list_push_right_all", key, outcome.map(|_| true), false)
    }

    /// 批量追加到列表尾部，成功后在 `ttl_seconds > 0` 时附加过期时间
    pub async fn list_push_right_all_with_expire<T>(
        &self,
        key: &str,
        ttl_seconds: i64,
        values: &[T],
    ) -> bool
    where
        T: Serialize + Sync,
    {
        if !self.list_push_right_all(key, values).await {
            return false;
        }
        if ttl_seconds > 0 {
            let _ = self.expire(key, ttl_seconds).await;
        }
        true
    }

    /// 按索引覆写列表元素，索引越界时吞为 `false`
    pub async fn list_set_by_index<T>(&self, key: &str, index: i64, value: &T) -> bool
    where
        T: Serialize + Sync,
    {
        let outcome = async {
            let payload = encode(value)?;
            self.store.list_set(key, index, &payload).await
        }
        .await;
        absorb("list_set_by_index", key, outcome.map(|()| true), false)
    }

    /// 按三向计数策略移除与 `value` 相等的列表元素
    ///
    /// `count_policy > 0` 从头部扫描最多移除 `count_policy` 个匹配项；
    /// `count_policy < 0` 从尾部扫描最多移除其绝对值个匹配项；
    /// `count_policy == 0` 移除全部匹配项。
    pub async fn list_remove<T>(&self, key: &str, count_policy: i64, value: &T)
    where
        T: Serialize + Sync,
    {
        let outcome = async {
            let payload = encode(value)?;
            self.store
                .list_remove(key, count_policy, &payload)
                .await
                .map(|_| ())
        }
        .await;
        absorb("list_remove", key, outcome, ());
    }
}

impl CacheFacade<StoreBackend> {
    /// 根据配置完成组合：构建存储后端并注入门面
    pub async fn from_config(config: &CacheConfig) -> Result<Self> {
        Ok(Self::new(StoreBackend::from_config(config).await?))
    }
}
