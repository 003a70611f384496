mod envelope;
mod user_agent;

use std::time::Duration;

use serde_json::Value;

use crate::config::HttpClientConfig;
use crate::error::{CrawlError, Result};
use crate::proxy::ProxyPool;

use envelope::{Envelope, EnvelopeOutcome};
use user_agent::random_user_agent;

/// Thin JSON-envelope client. Builds a fresh single-proxy `reqwest::Client`
/// per attempt when a proxy pool is in use, since reqwest binds a proxy at
/// client-construction time rather than per-request.
pub struct HttpClient {
    base_url: String,
    retry_times: u32,
    timeout: Duration,
    connect_timeout: Duration,
    base_client: reqwest::Client,
}

impl HttpClient {
    pub fn new(cfg: &HttpClientConfig) -> Result<Self> {
        let timeout = Duration::from_secs(cfg.timeout.total);
        let connect_timeout = Duration::from_secs(cfg.timeout.connect);

        let base_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            base_url: cfg.base_url.clone(),
            retry_times: cfg.retry_times,
            timeout,
            connect_timeout,
            base_client,
        })
    }

    fn proxied_client(&self, proxy_url: &str) -> Result<reqwest::Client> {
        let proxy = reqwest::Proxy::all(proxy_url)?;
        Ok(reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .proxy(proxy)
            .build()?)
    }

    /// Fetches `path` (relative to the configured base URL), retrying up
    /// to `retry_times` on transport failure, non-200 status, and the
    /// upstream rate-limit envelope code. Proxy misbehavior is fed back
    /// into the pool so subsequent attempts avoid the same proxy.
    #[tracing::instrument(skip(self, proxy_pool), fields(path = %path))]
    pub async fn get_json(&self, path: &str, proxy_pool: Option<&ProxyPool>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err: Option<CrawlError> = None;

        for attempt in 0..self.retry_times {
            let proxy = match proxy_pool {
                Some(pool) => Some(pool.get().await),
                None => None,
            };

            let client = match &proxy {
                Some(p) => self.proxied_client(&p.url())?,
                None => self.base_client.clone(),
            };

            let response = client
                .get(&url)
                .header("User-Agent", random_user_agent())
                .send()
                .await;

            let response = match response {
                Ok(resp) => resp,
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "transport error");
                    if let (Some(pool), Some(p)) = (proxy_pool, &proxy) {
                        pool.mark_invalid(&p.host, p.port, "transport error");
                    }
                    last_err = Some(CrawlError::Transport(err));
                    continue;
                }
            };

            if !response.status().is_success() {
                tracing::warn!(attempt, status = %response.status(), "non-200 response");
                if let (Some(pool), Some(p)) = (proxy_pool, &proxy) {
                    pool.mark_banned(&p.host, p.port);
                }
                last_err = Some(CrawlError::ProxySourceFailed(format!(
                    "HTTP status {}",
                    response.status()
                )));
                continue;
            }

            let envelope: Envelope = response.json().await?;
            match envelope.interpret() {
                EnvelopeOutcome::Success(data) => return Ok(data),
                EnvelopeOutcome::EmptySuccess => return Ok(Value::Object(Default::default())),
                EnvelopeOutcome::RateLimited => {
                    tracing::warn!(attempt, "upstream rate limit signal");
                    if let (Some(pool), Some(p)) = (proxy_pool, &proxy) {
                        pool.mark_banned(&p.host, p.port);
                    }
                    last_err = Some(CrawlError::ProxySourceFailed("rate limited".into()));
                    continue;
                }
                EnvelopeOutcome::Rejected { code, msg } => {
                    return Err(CrawlError::PermanentApi { code, msg });
                }
            }
        }

        Err(last_err.unwrap_or(CrawlError::NoProxiesAvailable))
    }
}
