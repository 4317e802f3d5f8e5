//! # 配置管理模块
//!
//! 处理缓存配置的加载与验证

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{CacheError, Result};

/// 缓存后端类型
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    /// 内存后端
    #[default]
    Memory,
    /// Redis 后端
    Redis,
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 后端类型
    #[serde(default)]
    pub cache_type: CacheType,
    /// 内存后端最大条目数
    pub memory_max_entries: usize,
    /// 默认过期时间（秒）
    pub default_ttl: u64,
    /// Redis 后端配置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheType::Memory,
            memory_max_entries: 10000,
            default_ttl: 300,
            redis: None,
        }
    }
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// 服务器地址
    pub host: String,
    /// 服务器端口
    pub port: u16,
    /// 数据库编号
    pub database: u8,
    /// 连接密码（可选）
    pub password: Option<String>,
    /// 连接超时时间（秒）
    pub connection_timeout: u64,
    /// 最大连接数
    pub max_connections: u32,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            database: 0,
            password: None,
            connection_timeout: 10,
            max_connections: 10,
        }
    }
}

impl RedisConfig {
    /// 构建 Redis 连接 URL
    #[must_use]
    pub fn build_url(&self) -> String {
        if let Some(password) = &self.password {
            format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.database
            )
        } else {
            format!("redis://{}:{}/{}", self.host, self.port, self.database)
        }
    }
}

/// 加载配置文件
///
/// 根据 `RUST_ENV` 读取 `config/config.{env}.toml`，缺省环境为 `dev`。
pub fn load_config() -> Result<CacheConfig> {
    let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
    let config_file = format!("config/config.{env}.toml");

    if !Path::new(&config_file).exists() {
        return Err(CacheError::config(format!("配置文件不存在: {config_file}")));
    }

    let config_content = std::fs::read_to_string(&config_file).map_err(|e| {
        CacheError::config_with_source(format!("读取配置文件失败: {config_file}"), e)
    })?;

    let config: CacheConfig = toml::from_str(&config_content)
        .map_err(|e| CacheError::config_with_source("解析配置文件失败", e))?;

    validate_config(&config)?;

    Ok(config)
}

/// 验证配置有效性
pub fn validate_config(config: &CacheConfig) -> Result<()> {
    if config.memory_max_entries == 0 {
        return Err(CacheError::config("内存缓存最大条目数必须大于0"));
    }

    match config.cache_type {
        CacheType::Memory => {}
        CacheType::Redis => {
            let Some(redis) = &config.redis else {
                return Err(CacheError::config(
                    "缓存类型为 redis 时必须提供 [redis] 配置",
                ));
            };

            if redis.host.is_empty() {
                return Err(CacheError::config("Redis 服务器地址不能为空"));
            }

            if redis.port == 0 {
                return Err(CacheError::config(format!(
                    "无效的 Redis 端口: {}",
                    redis.port
                )));
            }

            if redis.max_connections == 0 {
                return Err(CacheError::config("Redis 最大连接数必须大于0"));
            }
        }
    }

    Ok(())
}
