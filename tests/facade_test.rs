//! # 缓存门面集成测试
//!
//! 基于内存后端和存储替身验证门面的操作语义与错误吞咽策略

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cache_kit::error::Result;
use cache_kit::{CacheConfig, CacheError, CacheFacade, MemoryStore, Store};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct TestData {
    id: u32,
    name: String,
    values: HashMap<String, String>,
}

fn sample_data() -> TestData {
    let mut values = HashMap::new();
    values.insert("env".to_string(), "development".to_string());
    values.insert("version".to_string(), "0.1.0".to_string());
    TestData {
        id: 12345,
        name: "test_config".to_string(),
        values,
    }
}

fn memory_facade() -> CacheFacade<MemoryStore> {
    CacheFacade::new(MemoryStore::new(1024))
}

/// 模拟连接故障的存储替身：所有操作都计数并返回错误
struct FailingStore {
    calls: AtomicUsize,
}

impl FailingStore {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::store("模拟的连接故障"))
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn exists(&self, _key: &str) -> Result<bool> {
        self.fail()
    }
    async fn delete(&self, _keys: &[String]) -> Result<u64> {
        self.fail()
    }
    async fn expire(&self, _key: &str, _ttl_seconds: i64) -> Result<bool> {
        self.fail()
    }
    async fn ttl(&self, _key: &str) -> Result<i64> {
        self.fail()
    }
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        self.fail()
    }
    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        self.fail()
    }
    async fn set_ex(&self, _key: &str, _value: &str, _ttl_seconds: u64) -> Result<()> {
        self.fail()
    }
    async fn incr_by(&self, _key: &str, _delta: i64) -> Result<i64> {
        self.fail()
    }
    async fn hash_get(&self, _key: &str, _field: &str) -> Result<Option<String>> {
        self.fail()
    }
    async fn hash_get_all(&self, _key: &str) -> Result<HashMap<String, String>> {
        self.fail()
    }
    async fn hash_set(&self, _key: &str, _field: &str, _value: &str) -> Result<()> {
        self.fail()
    }
    async fn hash_set_all(&self, _key: &str, _entries: &[(String, String)]) -> Result<()> {
        self.fail()
    }
    async fn hash_delete(&self, _key: &str, _field: &str) -> Result<u64> {
        self.fail()
    }
    async fn hash_exists(&self, _key: &str, _field: &str) -> Result<bool> {
        self.fail()
    }
    async fn hash_incr_by_float(&self, _key: &str, _field: &str, _delta: f64) -> Result<f64> {
        self.fail()
    }
    async fn set_members(&self, _key: &str) -> Result<HashSet<String>> {
        self.fail()
    }
    async fn set_contains(&self, _key: &str, _member: &str) -> Result<bool> {
        self.fail()
    }
    async fn set_add(&self, _key: &str, _members: &[String]) -> Result<u64> {
        self.fail()
    }
    async fn set_size(&self, _key: &str) -> Result<u64> {
        self.fail()
    }
    async fn set_remove(&self, _key: &str, _members: &[String]) -> Result<u64> {
        self.fail()
    }
    async fn list_range(&self, _key: &str, _start: i64, _end: i64) -> Result<Vec<String>> {
        self.fail()
    }
    async fn list_size(&self, _key: &str) -> Result<u64> {
        self.fail()
    }
    async fn list_index(&self, _key: &str, _index: i64) -> Result<Option<String>> {
        self.fail()
    }
    async fn list_push_right(&self, _key: &str, _values: &[String]) -> Result<u64> {
        self.fail()
    }
    async fn list_set(&self, _key: &str, _index: i64, _value: &str) -> Result<()> {
        self.fail()
    }
    async fn list_remove(&self, _key: &str, _count_policy: i64, _value: &str) -> Result<u64> {
        self.fail()
    }
}

// ---- 标量与键生命周期 ----

#[tokio::test]
async fn scalar_round_trip() {
    let cache = memory_facade();
    let data = sample_data();

    assert!(cache.set("config", &data).await);
    let retrieved: Option<TestData> = cache.get("config").await;
    assert_eq!(retrieved, Some(data));

    let missing: Option<TestData> = cache.get("missing").await;
    assert_eq!(missing, None);
}

#[tokio::test]
async fn set_with_ttl_expires_after_deadline() {
    let cache = memory_facade();

    assert!(cache.set_with_ttl("session", &"token".to_string(), 5).await);
    assert!(cache.exists("session").await);

    cache.store().advance_clock(Duration::from_secs(6));
    assert!(!cache.exists("session").await);
}

#[tokio::test]
async fn set_with_nonpositive_ttl_persists_indefinitely() {
    let cache = memory_facade();

    assert!(cache.set_with_ttl("k", &1_i64, 0).await);
    assert_eq!(cache.get_ttl("k").await, -1);

    assert!(cache.set_with_ttl("k2", &1_i64, -30).await);
    assert_eq!(cache.get_ttl("k2").await, -1);
}

#[tokio::test]
async fn expire_with_nonpositive_ttl_is_a_noop() {
    let cache = memory_facade();
    cache.set_with_ttl("k", &"v".to_string(), 100).await;

    // 非正的 TTL 报告成功但不改动键
    assert!(cache.expire("k", 0).await);
    assert!(cache.expire("k", -5).await);
    let remaining = cache.get_ttl("k").await;
    assert!((99..=100).contains(&remaining), "TTL 被意外改动: {remaining}");
}

#[tokio::test]
async fn expire_with_positive_ttl_applies() {
    let cache = memory_facade();
    cache.set("k", &"v".to_string()).await;
    assert_eq!(cache.get_ttl("k").await, -1);

    assert!(cache.expire("k", 50).await);
    let remaining = cache.get_ttl("k").await;
    assert!((49..=50).contains(&remaining));

    // 不存在的键无法设置过期时间
    assert!(!cache.expire("missing", 50).await);
}

#[tokio::test]
async fn delete_removes_multiple_keys() {
    let cache = memory_facade();
    cache.set("a", &1_i64).await;
    cache.set("b", &2_i64).await;

    cache.delete(&["a", "b", "missing"]).await;
    assert!(!cache.exists("a").await);
    assert!(!cache.exists("b").await);
}

#[tokio::test]
async fn delete_with_empty_key_list_skips_store() {
    let cache = CacheFacade::new(FailingStore::new());
    cache.delete(&[]).await;
    assert_eq!(cache.store().call_count(), 0);
}

// ---- 递减：唯一的快速失败操作 ----

#[tokio::test]
async fn decrement_rejects_negative_delta_without_store_call() {
    let cache = CacheFacade::new(FailingStore::new());

    let error = cache.decrement("counter", -3).await.unwrap_err();
    assert!(error.is_contract_violation());
    assert_eq!(cache.store().call_count(), 0, "契约检查不应访问存储");
}

#[tokio::test]
async fn decrement_applies_negated_delta() {
    let cache = memory_facade();
    cache.set("counter", &10_i64).await;

    assert_eq!(cache.decrement("counter", 4).await.unwrap(), 6);
    // 键不存在时从 0 开始
    assert_eq!(cache.decrement("fresh", 2).await.unwrap(), -2);
}

#[tokio::test]
async fn decrement_propagates_store_errors() {
    let cache = CacheFacade::new(FailingStore::new());

    let error = cache.decrement("counter", 3).await.unwrap_err();
    assert!(!error.is_contract_violation());
    assert_eq!(cache.store().call_count(), 1);
}

// ---- 哈希 ----

#[tokio::test]
async fn hash_round_trip_ignores_field_order() {
    let cache = memory_facade();
    let mut entries = HashMap::new();
    entries.insert("a".to_string(), 1_i64);
    entries.insert("b".to_string(), 2_i64);

    assert!(cache.hash_set_all("h", &entries).await);
    let retrieved: HashMap<String, i64> = cache.hash_get_all("h").await;
    assert_eq!(retrieved, entries);

    let field: Option<i64> = cache.hash_get("h", "a").await;
    assert_eq!(field, Some(1));
    assert!(cache.hash_exists("h", "b").await);

    cache.hash_delete("h", "b").await;
    assert!(!cache.hash_exists("h", "b").await);
}

#[tokio::test]
async fn hash_set_field_creates_hash() {
    let cache = memory_facade();
    assert!(cache.hash_set_field("h", "f", &"v".to_string()).await);
    let value: Option<String> = cache.hash_get("h", "f").await;
    assert_eq!(value, Some("v".to_string()));
}

#[tokio::test]
async fn hash_set_all_with_expire_applies_ttl_after_write() {
    let cache = memory_facade();
    let mut entries = HashMap::new();
    entries.insert("a".to_string(), 1_i64);

    assert!(cache.hash_set_all_with_expire("h", &entries, 5).await);
    let remaining = cache.get_ttl("h").await;
    assert!((4..=5).contains(&remaining));

    cache.store().advance_clock(Duration::from_secs(6));
    assert!(!cache.exists("h").await);
}

#[tokio::test]
async fn hash_increment_creates_field_at_zero() {
    let cache = memory_facade();

    let value = cache.hash_increment("h", "score", 2.5).await;
    assert!((value - 2.5).abs() < f64::EPSILON);

    // 负增量即递减
    let value = cache.hash_increment("h", "score", -1.0).await;
    assert!((value - 1.5).abs() < f64::EPSILON);
}

// ---- 集合 ----

#[tokio::test]
async fn set_collapses_duplicates() {
    let cache = memory_facade();

    let added = cache
        .set_add("s", &["x".to_string(), "x".to_string(), "y".to_string()])
        .await;
    assert_eq!(added, 2);
    assert_eq!(cache.set_size("s").await, 2);
    assert!(cache.set_contains("s", &"x".to_string()).await);
    assert!(!cache.set_contains("s", &"z".to_string()).await);

    let members: Option<HashSet<String>> = cache.set_members("s").await;
    let expected: HashSet<String> = ["x", "y"].iter().map(ToString::to_string).collect();
    assert_eq!(members, Some(expected));

    assert_eq!(cache.set_remove("s", &["x".to_string()]).await, 1);
    assert_eq!(cache.set_size("s").await, 1);
}

#[tokio::test]
async fn set_add_with_expire_applies_ttl() {
    let cache = memory_facade();

    let added = cache.set_add_with_expire("s", 5, &["x".to_string()]).await;
    assert_eq!(added, 1);
    let remaining = cache.get_ttl("s").await;
    assert!((4..=5).contains(&remaining));

    cache.store().advance_clock(Duration::from_secs(6));
    assert!(!cache.exists("s").await);
}

// ---- 列表 ----

#[tokio::test]
async fn list_preserves_insertion_order() {
    let cache = memory_facade();
    let values: Vec<String> = ["a", "b", "c"].iter().map(ToString::to_string).collect();

    assert!(cache.list_push_right_all("l", &values).await);
    let range: Option<Vec<String>> = cache.list_range("l", 0, -1).await;
    assert_eq!(range, Some(values));

    assert_eq!(cache.list_size("l").await, 3);
    let last: Option<String> = cache.list_get_by_index("l", -1).await;
    assert_eq!(last, Some("c".to_string()));
    let head: Option<String> = cache.list_get_by_index("l", 0).await;
    assert_eq!(head, Some("a".to_string()));
}

#[tokio::test]
async fn list_push_right_appends_single_element() {
    let cache = memory_facade();
    assert!(cache.list_push_right("l", &"a".to_string()).await);
    assert!(cache.list_push_right("l", &"b".to_string()).await);
    let range: Option<Vec<String>> = cache.list_range("l", 0, -1).await;
    assert_eq!(range, Some(vec!["a".to_string(), "b".to_string()]));
}

#[tokio::test]
async fn list_push_right_with_expire_applies_ttl() {
    let cache = memory_facade();
    assert!(cache.list_push_right_with_expire("l", 5, &"a".to_string()).await);
    let remaining = cache.get_ttl("l").await;
    assert!((4..=5).contains(&remaining));
}

#[tokio::test]
async fn list_set_by_index_overwrites_in_place() {
    let cache = memory_facade();
    let values: Vec<String> = ["a", "b", "c"].iter().map(ToString::to_string).collect();
    cache.list_push_right_all("l", &values).await;

    assert!(cache.list_set_by_index("l", 1, &"x".to_string()).await);
    let value: Option<String> = cache.list_get_by_index("l", 1).await;
    assert_eq!(value, Some("x".to_string()));

    // 越界写入吞为 false
    assert!(!cache.list_set_by_index("l", 9, &"x".to_string()).await);
}

#[rstest]
#[case(0, vec!["b", "c"])]
#[case(1, vec!["b", "a", "c", "a"])]
#[case(-1, vec!["a", "b", "a", "c"])]
#[case(2, vec!["b", "c", "a"])]
#[tokio::test]
async fn list_remove_honors_count_policy(#[case] policy: i64, #[case] expected: Vec<&str>) {
    let cache = memory_facade();
    let values: Vec<String> = ["a", "b", "a", "c", "a"]
        .iter()
        .map(ToString::to_string)
        .collect();
    cache.list_push_right_all("l", &values).await;

    cache.list_remove("l", policy, &"a".to_string()).await;

    let remaining: Option<Vec<String>> = cache.list_range("l", 0, -1).await;
    let expected: Vec<String> = expected.iter().map(ToString::to_string).collect();
    assert_eq!(remaining, Some(expected));
}

// ---- 错误吞咽策略 ----

#[tokio::test]
async fn swallowed_tier_returns_neutral_values_on_store_failure() {
    let cache = CacheFacade::new(FailingStore::new());
    let data = sample_data();

    assert!(!cache.exists("k").await);
    assert!(!cache.expire("k", 10).await);
    assert_eq!(cache.get_ttl("k").await, -2);

    assert!(!cache.set("k", &data).await);
    assert!(!cache.set_with_ttl("k", &data, 10).await);
    let value: Option<TestData> = cache.get("k").await;
    assert_eq!(value, None);

    let mut entries = HashMap::new();
    entries.insert("f".to_string(), 1_i64);
    assert!(!cache.hash_set_all("k", &entries).await);
    assert!(!cache.hash_set_all_with_expire("k", &entries, 10).await);
    assert!(!cache.hash_set_field("k", "f", &1_i64).await);
    assert!(!cache.hash_exists("k", "f").await);
    let field: Option<i64> = cache.hash_get("k", "f").await;
    assert_eq!(field, None);
    let all: HashMap<String, i64> = cache.hash_get_all("k").await;
    assert!(all.is_empty());
    assert!((cache.hash_increment("k", "f", 1.0).await).abs() < f64::EPSILON);
    cache.hash_delete("k", "f").await;

    let members: Option<HashSet<String>> = cache.set_members("k").await;
    assert_eq!(members, None);
    assert!(!cache.set_contains("k", &"x".to_string()).await);
    assert_eq!(cache.set_add("k", &["x".to_string()]).await, 0);
    assert_eq!(cache.set_add_with_expire("k", 10, &["x".to_string()]).await, 0);
    assert_eq!(cache.set_size("k").await, 0);
    assert_eq!(cache.set_remove("k", &["x".to_string()]).await, 0);

    let range: Option<Vec<String>> = cache.list_range("k", 0, -1).await;
    assert_eq!(range, None);
    assert_eq!(cache.list_size("k").await, 0);
    let index: Option<String> = cache.list_get_by_index("k", 0).await;
    assert_eq!(index, None);
    assert!(!cache.list_push_right("k", &"x".to_string()).await);
    assert!(!cache.list_push_right_with_expire("k", 10, &"x".to_string()).await);
    assert!(!cache.list_push_right_all("k", &["x".to_string()]).await);
    assert!(
        !cache
            .list_push_right_all_with_expire("k", 10, &["x".to_string()])
            .await
    );
    assert!(!cache.list_set_by_index("k", 0, &"x".to_string()).await);
    cache.list_remove("k", 0, &"x".to_string()).await;
    cache.delete(&["k"]).await;

    assert!(cache.store().call_count() > 0, "操作应已尝试访问存储");
}

#[tokio::test]
async fn type_mismatch_is_swallowed_to_neutral_values() {
    let cache = memory_facade();
    cache.set("scalar", &"v".to_string()).await;

    // 对标量键执行哈希/集合操作，后端报类型错误，门面吞为中性值
    let all: HashMap<String, String> = cache.hash_get_all("scalar").await;
    assert!(all.is_empty());
    assert!(!cache.set_contains("scalar", &"v".to_string()).await);
    assert_eq!(cache.list_size("scalar").await, 0);
}

#[tokio::test]
async fn undecodable_payload_is_swallowed_to_none() {
    let cache = memory_facade();
    cache.set("k", &"not-a-number".to_string()).await;

    let value: Option<i64> = cache.get("k").await;
    assert_eq!(value, None);
}

// ---- 组合入口 ----

#[tokio::test]
async fn from_config_builds_memory_backed_facade() {
    let cache = CacheFacade::from_config(&CacheConfig::default())
        .await
        .expect("构建缓存门面失败");

    assert!(cache.set("k", &42_i64).await);
    let value: Option<i64> = cache.get("k").await;
    assert_eq!(value, Some(42));
}
