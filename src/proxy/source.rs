use chrono::{Duration, Utc};
use serde_json::Value;

use crate::config::ProxyPoolConfig;
use crate::error::{CrawlError, Result};

use super::model::Proxy;

/// A proxy supply. Deliberately an enum rather than a trait object: the
/// pool never needs to dispatch across an open-ended set of sources, and a
/// closed match keeps the fetch/refresh quirks of each source visible at
/// the call site instead of hidden behind `dyn`.
#[derive(Debug, Clone)]
pub enum ProxySource {
    File { path: String },
    Zhima { api: String, pool_size: usize },
    Juliang { api: String, pool_size: usize },
}

impl ProxySource {
    pub fn from_config(cfg: &ProxyPoolConfig) -> Result<Self> {
        match cfg.source_type.as_str() {
            "file" => Ok(Self::File {
                path: cfg.file.path.clone(),
            }),
            "zhima" => Ok(Self::Zhima {
                api: cfg.zhima.api.clone(),
                pool_size: cfg.zhima.pool_size,
            }),
            "juliang" => Ok(Self::Juliang {
                api: cfg.juliang.api.clone(),
                pool_size: cfg.juliang.pool_size,
            }),
            other => Err(CrawlError::UnsupportedSource(other.to_string())),
        }
    }

    /// The file source loads its contents once at startup and is never
    /// refreshed afterward; the vending sources are polled continuously.
    pub fn is_static(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    pub fn target_pool_size(&self) -> usize {
        match self {
            Self::File { .. } => usize::MAX,
            Self::Zhima { pool_size, .. } => *pool_size,
            Self::Juliang { pool_size, .. } => *pool_size,
        }
    }

    pub async fn fetch(&self, client: &reqwest::Client) -> Result<Vec<Proxy>> {
        match self {
            Self::File { path } => load_file(path).await,
            Self::Zhima { api, .. } => fetch_zhima(client, api).await,
            Self::Juliang { api, .. } => fetch_juliang(client, api).await,
        }
    }
}

async fn load_file(path: &str) -> Result<Vec<Proxy>> {
    let contents = tokio::fs::read_to_string(path).await?;
    let far_future = Utc::now() + Duration::days(3650);
    let proxies = contents
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let (host, port) = line.split_once(':')?;
            let port: u16 = port.trim().parse().ok()?;
            Some(Proxy::new(host.trim().to_string(), port, far_future))
        })
        .collect();
    Ok(proxies)
}

async fn fetch_zhima(client: &reqwest::Client, api: &str) -> Result<Vec<Proxy>> {
    let body: Value = client.get(api).send().await?.json().await?;
    let entries = body
        .get("data")
        .and_then(|d| d.as_array())
        .cloned()
        .unwrap_or_default();
    Ok(entries
        .iter()
        .filter_map(|entry| {
            let ip = entry.get("ip")?.as_str()?;
            let port = entry.get("port")?.as_u64()? as u16;
            let expire_str = entry.get("expire_time").and_then(|v| v.as_str());
            let expires_at = expire_str
                .and_then(parse_expire_time)
                .unwrap_or_else(|| Utc::now() + Duration::minutes(5));
            Some(Proxy::new(ip.to_string(), port, expires_at))
        })
        .collect())
}

async fn fetch_juliang(client: &reqwest::Client, api: &str) -> Result<Vec<Proxy>> {
    let body: Value = client.get(api).send().await?.json().await?;
    let entries = body
        .get("data")
        .and_then(|d| d.get("proxy_list"))
        .and_then(|d| d.as_array())
        .cloned()
        .unwrap_or_default();
    Ok(entries
        .iter()
        .filter_map(|entry| entry.as_str())
        .filter_map(parse_juliang_entry)
        .collect())
}

/// Parses one `proxy_list` entry, e.g. `"117.27.118.94:53471,205"` —
/// `ip:port,ttl_seconds`.
fn parse_juliang_entry(entry: &str) -> Option<Proxy> {
    let (host, ttl_secs) = entry.split_once(',')?;
    let (ip, port) = host.split_once(':')?;
    let port: u16 = port.trim().parse().ok()?;
    let ttl_secs: i64 = ttl_secs.trim().parse().ok()?;
    Some(Proxy::new(
        ip.trim().to_string(),
        port,
        Utc::now() + Duration::seconds(ttl_secs),
    ))
}

fn parse_expire_time(raw: &str) -> Option<chrono::DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(source_type: &str) -> ProxyPoolConfig {
        ProxyPoolConfig {
            enable: true,
            source_type: source_type.to_string(),
            file: crate::config::FileSourceConfig {
                path: "data/proxies".into(),
            },
            zhima: crate::config::ZhimaSourceConfig {
                api: "http://zhima.example/fetch".into(),
                pool_size: 100,
            },
            juliang: crate::config::JuliangSourceConfig {
                api: "http://juliang.example/fetch".into(),
                pool_size: 2000,
            },
        }
    }

    #[test]
    fn test_from_config_file() {
        let src = ProxySource::from_config(&base_config("file")).unwrap();
        assert!(src.is_static());
        assert_eq!(src.target_pool_size(), usize::MAX);
    }

    #[test]
    fn test_from_config_zhima_not_static() {
        let src = ProxySource::from_config(&base_config("zhima")).unwrap();
        assert!(!src.is_static());
        assert_eq!(src.target_pool_size(), 100);
    }

    #[test]
    fn test_from_config_unsupported() {
        let err = ProxySource::from_config(&base_config("carrier-pigeon")).unwrap_err();
        assert!(matches!(err, CrawlError::UnsupportedSource(_)));
    }

    #[test]
    fn test_parse_expire_time() {
        let parsed = parse_expire_time("2030-01-01 00:00:00");
        assert!(parsed.is_some());
        assert!(parse_expire_time("garbage").is_none());
    }

    #[test]
    fn test_parse_juliang_entry() {
        let proxy = parse_juliang_entry("117.27.118.94:53471,205").unwrap();
        assert_eq!(proxy.host, "117.27.118.94");
        assert_eq!(proxy.port, 53471);
        // ttl of 205s should land the expiry a little under 206s out
        assert!(proxy.expires_at <= Utc::now() + Duration::seconds(206));
        assert!(proxy.expires_at > Utc::now() + Duration::seconds(200));
    }

    #[test]
    fn test_parse_juliang_entry_malformed() {
        assert!(parse_juliang_entry("no-comma-here").is_none());
        assert!(parse_juliang_entry("badip,205").is_none());
    }
}
