//! # 内存存储后端
//!
//! 进程内实现的存储后端，语义对齐远端存储：惰性过期、
//! 类型不匹配报错、空容器自动删除。除了作为轻量后端使用，
//! 也充当测试中可替换的存储替身。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::store::Store;
use crate::error::{CacheError, Result};

/// 存储值，对应远端存储的四种数据结构
#[derive(Debug, Clone)]
enum StoredValue {
    /// 标量
    Scalar(String),
    /// 哈希
    Hash(HashMap<String, String>),
    /// 集合
    Set(HashSet<String>),
    /// 列表
    List(Vec<String>),
}

impl StoredValue {
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Hash(_) => "hash",
            Self::Set(_) => "set",
            Self::List(_) => "list",
        }
    }
}

/// 缓存条目
#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl Entry {
    const fn new(value: StoredValue) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }
}

/// 内存存储后端
#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<RwLock<HashMap<String, Entry>>>,
    max_entries: usize,
    clock_offset: Arc<RwLock<Duration>>,
}

fn wrong_type(key: &str, expected: &str, actual: &StoredValue) -> CacheError {
    CacheError::wrong_type(format!(
        "键 {key} 当前类型为 {}，期望 {expected}",
        actual.type_name()
    ))
}

/// 移除已过期的条目，让后续访问把它当作不存在
fn purge_expired(data: &mut HashMap<String, Entry>, key: &str, now: Instant) {
    if data.get(key).is_some_and(|entry| entry.is_expired(now)) {
        data.remove(key);
    }
}

/// 容量已满时腾出一个位置：优先移除过期条目，否则移除任意一条
fn ensure_capacity(data: &mut HashMap<String, Entry>, max_entries: usize, now: Instant) {
    if data.len() < max_entries {
        return;
    }

    let expired = data
        .iter()
        .find(|(_, entry)| entry.is_expired(now))
        .map(|(key, _)| key.clone());

    let to_remove = expired.or_else(|| data.keys().next().cloned());
    if let Some(key) = to_remove {
        data.remove(&key);
    }
}

/// 把区间端点换算成下标，负值从尾部计数，越界收缩到边界
fn range_bounds(len: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let mut start = if start < 0 { start + len } else { start };
    let mut end = if end < 0 { end + len } else { end };
    if start < 0 {
        start = 0;
    }
    if end >= len {
        end = len - 1;
    }
    if start > end || start >= len {
        return None;
    }
    #[allow(clippy::cast_sign_loss)]
    let bounds = (start as usize, end as usize);
    Some(bounds)
}

/// 解析列表下标，负值从尾部计数
fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        #[allow(clippy::cast_sign_loss)]
        let index = index as usize;
        Some(index)
    } else {
        None
    }
}

impl MemoryStore {
    /// 创建内存存储后端
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            max_entries,
            clock_offset: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// 将内部时钟向前拨动，用于过期行为的测试
    pub fn advance_clock(&self, delta: Duration) {
        let mut offset = self.clock_offset.write().unwrap();
        *offset += delta;
    }

    fn now(&self) -> Instant {
        Instant::now() + *self.clock_offset.read().unwrap()
    }

    /// 在读锁下访问某个键的存活值
    fn read_value<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<&StoredValue>) -> Result<T>,
    ) -> Result<T> {
        let now = self.now();
        let data = self.data.read().unwrap();
        let value = data
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| &entry.value);
        f(value)
    }

    /// 在写锁下执行变更，先清理目标键的过期条目
    ///
    /// `creates_key` 为真表示该操作可能新建条目，此时才做容量腾挪
    fn write_value<T>(
        &self,
        key: &str,
        creates_key: bool,
        f: impl FnOnce(&mut HashMap<String, Entry>, Instant) -> Result<T>,
    ) -> Result<T> {
        let now = self.now();
        let mut data = self.data.write().unwrap();
        purge_expired(&mut data, key, now);
        if creates_key && !data.contains_key(key) {
            ensure_capacity(&mut data, self.max_entries, now);
        }
        f(&mut data, now)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.read_value(key, |value| Ok(value.is_some()))
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        let now = self.now();
        let mut data = self.data.write().unwrap();
        let mut removed = 0;
        for key in keys {
            purge_expired(&mut data, key, now);
            if data.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn expire(&self, key: &str, ttl_seconds: i64) -> Result<bool> {
        self.write_value(key, false, |data, now| {
            if ttl_seconds <= 0 {
                // 远端存储对非正 TTL 的语义是直接删除键
                return Ok(data.remove(key).is_some());
            }
            match data.get_mut(key) {
                Some(entry) => {
                    #[allow(clippy::cast_sign_loss)]
                    let ttl = Duration::from_secs(ttl_seconds as u64);
                    entry.expires_at = Some(now + ttl);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        let now = self.now();
        let data = self.data.read().unwrap();
        let Some(entry) = data.get(key).filter(|entry| !entry.is_expired(now)) else {
            return Ok(-2);
        };
        match entry.expires_at {
            None => Ok(-1),
            Some(at) => {
                #[allow(clippy::cast_possible_truncation)]
                let remaining = at.saturating_duration_since(now).as_secs_f64().ceil() as i64;
                Ok(remaining)
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.read_value(key, |value| match value {
            None => Ok(None),
            Some(StoredValue::Scalar(raw)) => Ok(Some(raw.clone())),
            Some(other) => Err(wrong_type(key, "scalar", other)),
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write_value(key, true, |data, _| {
            data.insert(key.to_string(), Entry::new(StoredValue::Scalar(value.to_string())));
            Ok(())
        })
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        if ttl_seconds == 0 {
            return Err(CacheError::store("过期时间必须大于0"));
        }
        self.write_value(key, true, |data, now| {
            let mut entry = Entry::new(StoredValue::Scalar(value.to_string()));
            entry.expires_at = Some(now + Duration::from_secs(ttl_seconds));
            data.insert(key.to_string(), entry);
            Ok(())
        })
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        self.write_value(key, true, |data, _| {
            let entry = data
                .entry(key.to_string())
                .or_insert_with(|| Entry::new(StoredValue::Scalar("0".to_string())));
            match &mut entry.value {
                StoredValue::Scalar(raw) => {
                    let current: i64 = raw
                        .parse()
                        .map_err(|_| CacheError::store(format!("键 {key} 的值不是整数")))?;
                    let next = current + delta;
                    *raw = next.to_string();
                    Ok(next)
                }
                other => Err(wrong_type(key, "scalar", other)),
            }
        })
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.read_value(key, |value| match value {
            None => Ok(None),
            Some(StoredValue::Hash(map)) => Ok(map.get(field).cloned()),
            Some(other) => Err(wrong_type(key, "hash", other)),
        })
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        self.read_value(key, |value| match value {
            None => Ok(HashMap::new()),
            Some(StoredValue::Hash(map)) => Ok(map.clone()),
            Some(other) => Err(wrong_type(key, "hash", other)),
        })
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.write_value(key, true, |data, _| {
            let entry = data
                .entry(key.to_string())
                .or_insert_with(|| Entry::new(StoredValue::Hash(HashMap::new())));
            match &mut entry.value {
                StoredValue::Hash(map) => {
                    map.insert(field.to_string(), value.to_string());
                    Ok(())
                }
                other => Err(wrong_type(key, "hash", other)),
            }
        })
    }

    async fn hash_set_all(&self, key: &str, entries: &[(String, String)]) -> Result<()> {
        if entries.is_empty() {
            return Err(CacheError::store("批量写入的字段不能为空"));
        }
        self.write_value(key, true, |data, _| {
            let entry = data
                .entry(key.to_string())
                .or_insert_with(|| Entry::new(StoredValue::Hash(HashMap::new())));
            match &mut entry.value {
                StoredValue::Hash(map) => {
                    for (field, value) in entries {
                        map.insert(field.clone(), value.clone());
                    }
                    Ok(())
                }
                other => Err(wrong_type(key, "hash", other)),
            }
        })
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<u64> {
        self.write_value(key, false, |data, _| {
            let (removed, now_empty) = {
                let Some(entry) = data.get_mut(key) else {
                    return Ok(0);
                };
                match &mut entry.value {
                    StoredValue::Hash(map) => {
                        let removed = u64::from(map.remove(field).is_some());
                        (removed, map.is_empty())
                    }
                    other => return Err(wrong_type(key, "hash", other)),
                }
            };
            if now_empty {
                data.remove(key);
            }
            Ok(removed)
        })
    }

    async fn hash_exists(&self, key: &str, field: &str) -> Result<bool> {
        self.read_value(key, |value| match value {
            None => Ok(false),
            Some(StoredValue::Hash(map)) => Ok(map.contains_key(field)),
            Some(other) => Err(wrong_type(key, "hash", other)),
        })
    }

    async fn hash_incr_by_float(&self, key: &str, field: &str, delta: f64) -> Result<f64> {
        self.write_value(key, true, |data, _| {
            let entry = data
                .entry(key.to_string())
                .or_insert_with(|| Entry::new(StoredValue::Hash(HashMap::new())));
            match &mut entry.value {
                StoredValue::Hash(map) => {
                    let current: f64 = match map.get(field) {
                        Some(raw) => raw.parse().map_err(|_| {
                            CacheError::store(format!("键 {key} 字段 {field} 的值不是数字"))
                        })?,
                        None => 0.0,
                    };
                    let next = current + delta;
                    map.insert(field.to_string(), next.to_string());
                    Ok(next)
                }
                other => Err(wrong_type(key, "hash", other)),
            }
        })
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>> {
        self.read_value(key, |value| match value {
            None => Ok(HashSet::new()),
            Some(StoredValue::Set(members)) => Ok(members.clone()),
            Some(other) => Err(wrong_type(key, "set", other)),
        })
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
        self.read_value(key, |value| match value {
            None => Ok(false),
            Some(StoredValue::Set(members)) => Ok(members.contains(member)),
            Some(other) => Err(wrong_type(key, "set", other)),
        })
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64> {
        if members.is_empty() {
            return Err(CacheError::store("添加的集合成员不能为空"));
        }
        self.write_value(key, true, |data, _| {
            let entry = data
                .entry(key.to_string())
                .or_insert_with(|| Entry::new(StoredValue::Set(HashSet::new())));
            match &mut entry.value {
                StoredValue::Set(set) => {
                    let mut added = 0;
                    for member in members {
                        if set.insert(member.clone()) {
                            added += 1;
                        }
                    }
                    Ok(added)
                }
                other => Err(wrong_type(key, "set", other)),
            }
        })
    }

    async fn set_size(&self, key: &str) -> Result<u64> {
        self.read_value(key, |value| match value {
            None => Ok(0),
            Some(StoredValue::Set(members)) => Ok(members.len() as u64),
            Some(other) => Err(wrong_type(key, "set", other)),
        })
    }

    async fn set_remove(&self, key: &str, members: &[String]) -> Result<u64> {
        self.write_value(key, false, |data, _| {
            let (removed, now_empty) = {
                let Some(entry) = data.get_mut(key) else {
                    return Ok(0);
                };
                match &mut entry.value {
                    StoredValue::Set(set) => {
                        let mut removed = 0;
                        for member in members {
                            if set.remove(member) {
                                removed += 1;
                            }
                        }
                        (removed, set.is_empty())
                    }
                    other => return Err(wrong_type(key, "set", other)),
                }
            };
            if now_empty {
                data.remove(key);
            }
            Ok(removed)
        })
    }

    async fn list_range(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>> {
        self.read_value(key, |value| match value {
            None => Ok(Vec::new()),
            Some(StoredValue::List(list)) => Ok(range_bounds(list.len(), start, end)
                .map(|(s, e)| list[s..=e].to_vec())
                .unwrap_or_default()),
            Some(other) => Err(wrong_type(key, "list", other)),
        })
    }

    async fn list_size(&self, key: &str) -> Result<u64> {
        self.read_value(key, |value| match value {
            None => Ok(0),
            Some(StoredValue::List(list)) => Ok(list.len() as u64),
            Some(other) => Err(wrong_type(key, "list", other)),
        })
    }

    async fn list_index(&self, key: &str, index: i64) -> Result<Option<String>> {
        self.read_value(key, |value| match value {
            None => Ok(None),
            Some(StoredValue::List(list)) => {
                Ok(resolve_index(list.len(), index).map(|i| list[i].clone()))
            }
            Some(other) => Err(wrong_type(key, "list", other)),
        })
    }

    async fn list_push_right(&self, key: &str, values: &[String]) -> Result<u64> {
        if values.is_empty() {
            return Err(CacheError::store("追加的列表元素不能为空"));
        }
        self.write_value(key, true, |data, _| {
            let entry = data
                .entry(key.to_string())
                .or_insert_with(|| Entry::new(StoredValue::List(Vec::new())));
            match &mut entry.value {
                StoredValue::List(list) => {
                    list.extend(values.iter().cloned());
                    Ok(list.len() as u64)
                }
                other => Err(wrong_type(key, "list", other)),
            }
        })
    }

    async fn list_set(&self, key: &str, index: i64, value: &str) -> Result<()> {
        self.write_value(key, false, |data, _| {
            let Some(entry) = data.get_mut(key) else {
                return Err(CacheError::store(format!("键 {key} 不存在")));
            };
            match &mut entry.value {
                StoredValue::List(list) => match resolve_index(list.len(), index) {
                    Some(i) => {
                        list[i] = value.to_string();
                        Ok(())
                    }
                    None => Err(CacheError::store(format!("键 {key} 的索引 {index} 越界"))),
                },
                other => Err(wrong_type(key, "list", other)),
            }
        })
    }

    async fn list_remove(&self, key: &str, count_policy: i64, value: &str) -> Result<u64> {
        self.write_value(key, false, |data, _| {
            let (removed, now_empty) = {
                let Some(entry) = data.get_mut(key) else {
                    return Ok(0);
                };
                match &mut entry.value {
                    StoredValue::List(list) => {
                        let removed = match count_policy {
                            0 => {
                                let before = list.len();
                                list.retain(|item| item != value);
                                (before - list.len()) as u64
                            }
                            n if n > 0 => {
                                // 从头部扫描，最多移除 n 个匹配项
                                #[allow(clippy::cast_sign_loss)]
                                let limit = n as u64;
                                let mut removed = 0;
                                let mut i = 0;
                                while i < list.len() && removed < limit {
                                    if list[i] == value {
                                        list.remove(i);
                                        removed += 1;
                                    } else {
                                        i += 1;
                                    }
                                }
                                removed
                            }
                            n => {
                                // 从尾部扫描，最多移除 |n| 个匹配项
                                let limit = n.unsigned_abs();
                                let mut removed = 0;
                                let mut i = list.len();
                                while i > 0 && removed < limit {
                                    i -= 1;
                                    if list[i] == value {
                                        list.remove(i);
                                        removed += 1;
                                    }
                                }
                                removed
                            }
                        };
                        (removed, list.is_empty())
                    }
                    other => return Err(wrong_type(key, "list", other)),
                }
            };
            if now_empty {
                data.remove(key);
            }
            Ok(removed)
        })
    }
}
