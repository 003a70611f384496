//! Layered configuration: `config/default.yaml` + `config/{env}.yaml` +
//! `CRAWL__`-prefixed environment variable overrides, mirroring the
//! config surface named in spec.md §6.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    pub http_client: HttpClientConfig,
    pub spider_filter: SpiderFilterConfig,
    pub spider_config: SpiderConfig,
    pub proxy_pool: ProxyPoolConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpClientConfig {
    /// Base URL prefix for the remote API (paths in spec.md §6 are relative to this)
    pub base_url: String,
    /// Per-request retry cap
    pub retry_times: u32,
    /// Total and connect timeout budgets
    pub timeout: TimeoutConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Total request timeout, seconds
    pub total: u64,
    /// Connect timeout, seconds
    pub connect: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SpiderFilterConfig {
    /// Popularity gate: ids below this follower count are dropped
    pub min_follower: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SpiderConfig {
    /// Worker task count
    pub parallel_co_tasks: usize,
    /// Record sink path (newline-delimited JSON)
    pub save_path: String,
    /// IdPool snapshot path
    pub mid_pool_snapshot_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProxyPoolConfig {
    pub enable: bool,
    /// "file" | "zhima" | "juliang"
    #[serde(rename = "type")]
    pub source_type: String,
    pub file: FileSourceConfig,
    pub zhima: ZhimaSourceConfig,
    pub juliang: JuliangSourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileSourceConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ZhimaSourceConfig {
    pub api: String,
    pub pool_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JuliangSourceConfig {
    pub api: String,
    pub pool_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LogConfig {
    /// debug, info, warn, error
    pub level: String,
    /// json, pretty
    pub format: String,
}

impl Config {
    /// Load configuration layered from defaults, an optional config
    /// directory, and `CRAWL__`-prefixed environment variables.
    ///
    /// Files are loaded in this order (later overrides earlier):
    /// 1. built-in defaults (matching the original implementation's values)
    /// 2. `config/default.yaml` (if present)
    /// 3. `config/{environment}.yaml` (if present)
    /// 4. `CRAWL__SECTION__KEY`-style environment overrides
    pub fn load(environment: &str) -> Result<Self> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".into());

        let builder = config::Config::builder()
            .set_default("http_client.base_url", "http://api.bilibili.com")?
            .set_default("http_client.retry_times", 5)?
            .set_default("http_client.timeout.total", 10)?
            .set_default("http_client.timeout.connect", 5)?
            .set_default("spider_filter.min_follower", 10_000)?
            .set_default("spider_config.parallel_co_tasks", 500)?
            .set_default("spider_config.save_path", "data/up_info.dat")?
            .set_default(
                "spider_config.mid_pool_snapshot_path",
                "data/mid_pool.json",
            )?
            .set_default("proxy_pool.enable", false)?
            .set_default("proxy_pool.type", "file")?
            .set_default("proxy_pool.file.path", "data/proxies")?
            .set_default("proxy_pool.zhima.api", "")?
            .set_default("proxy_pool.zhima.pool_size", 100)?
            .set_default("proxy_pool.juliang.api", "")?
            .set_default("proxy_pool.juliang.pool_size", 2000)?
            .set_default("log.level", "info")?
            .set_default("log.format", "pretty")?
            .add_source(config::File::with_name(&format!("{config_dir}/default")).required(false))
            .add_source(
                config::File::with_name(&format!("{config_dir}/{environment}")).required(false),
            )
            .add_source(
                config::Environment::with_prefix("CRAWL")
                    .separator("__")
                    .try_parsing(true),
            );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load configuration from a single file, ignoring defaults/env layers.
    /// Used by tests and one-off tooling.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?
            .try_deserialize()?)
    }
}
