use std::sync::Arc;
use std::time::Duration as StdDuration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::{CrawlError, Result};

use super::model::Proxy;
use super::source::ProxySource;

const MAINTENANCE_INTERVAL: StdDuration = StdDuration::from_millis(1100);
const MAX_REFILL_ATTEMPTS: u32 = 3;

struct Inner {
    proxies: Vec<Proxy>,
}

/// Rotating proxy supply. `get()` blocks until an available proxy exists;
/// the maintenance task keeps the pool topped up and sweeps dead entries.
pub struct ProxyPool {
    inner: Mutex<Inner>,
    notify: Notify,
    source: ProxySource,
    fetch_client: reqwest::Client,
}

impl ProxyPool {
    pub fn new(source: ProxySource) -> Self {
        Self {
            inner: Mutex::new(Inner { proxies: Vec::new() }),
            notify: Notify::new(),
            source,
            fetch_client: reqwest::Client::new(),
        }
    }

    /// Blocks until an available (valid, not cooling down) proxy exists,
    /// then returns a clone of it. Registers interest on the notifier
    /// before checking so a concurrent refill can't be missed.
    pub async fn get(&self) -> Proxy {
        loop {
            let notified = self.notify.notified();
            if let Some(proxy) = self.pick_available() {
                return proxy;
            }
            notified.await;
        }
    }

    fn pick_available(&self) -> Option<Proxy> {
        let inner = self.inner.lock();
        inner.proxies.iter().find(|p| p.is_available()).cloned()
    }

    pub fn mark_invalid(&self, host: &str, port: u16, reason: &str) {
        let mut inner = self.inner.lock();
        if let Some(p) = inner
            .proxies
            .iter_mut()
            .find(|p| p.host == host && p.port == port)
        {
            p.mark_invalid(reason);
        }
    }

    pub fn mark_banned(&self, host: &str, port: u16) {
        let mut inner = self.inner.lock();
        if let Some(p) = inner
            .proxies
            .iter_mut()
            .find(|p| p.host == host && p.port == port)
        {
            p.mark_banned();
        }
        self.notify.notify_waiters();
    }

    fn available_count(&self) -> usize {
        self.inner.lock().proxies.iter().filter(|p| p.is_available()).count()
    }

    async fn refill(&self) -> Result<()> {
        if self.available_count() >= self.source.target_pool_size() {
            return Ok(());
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.source.fetch(&self.fetch_client).await {
                Ok(fresh) => {
                    let mut inner = self.inner.lock();
                    inner.proxies.extend(fresh);
                    drop(inner);
                    self.notify.notify_waiters();
                    return Ok(());
                }
                Err(err) if attempts < MAX_REFILL_ATTEMPTS => {
                    tracing::warn!(attempt = attempts, error = %err, "proxy refill attempt failed");
                }
                Err(err) => {
                    return Err(CrawlError::ProxySourceFailed(err.to_string()));
                }
            }
        }
    }

    fn sweep_invalid(&self) {
        let mut inner = self.inner.lock();
        inner.proxies.retain(|p| p.is_valid());
    }

    /// Runs one maintenance tick: refill below target, then sweep dead
    /// entries. Public so the spawned task and tests share the same path.
    async fn maintenance_tick(&self) {
        if let Err(err) = self.refill().await {
            tracing::warn!(error = %err, "proxy pool maintenance refill failed");
        }
        self.sweep_invalid();
    }
}

#[cfg(test)]
impl ProxyPool {
    /// Seeds the pool directly, bypassing the source/refill path. Used by
    /// other modules' tests to point a pool at a mock server.
    pub fn insert_for_test(&self, proxy: Proxy) {
        self.inner.lock().proxies.push(proxy);
        self.notify.notify_waiters();
    }

    /// Reads back the ban count of the first stored entry matching
    /// `host`/`port`, mirroring `mark_banned`'s own lookup.
    pub fn ban_count_for_test(&self, host: &str, port: u16) -> u32 {
        self.inner
            .lock()
            .proxies
            .iter()
            .find(|p| p.host == host && p.port == port)
            .map(|p| p.ban_count())
            .unwrap_or(0)
    }
}

/// Handle to the background maintenance task. Dropping it does not stop
/// the task; call `stop()` explicitly during shutdown.
pub struct ProxyPoolHandle {
    pool: Arc<ProxyPool>,
    task: JoinHandle<()>,
}

impl ProxyPoolHandle {
    /// Spawns the maintenance loop. The file source loads once and
    /// returns; vending sources (zhima/juliang) are polled continuously.
    pub fn spawn(source: ProxySource) -> Self {
        let pool = Arc::new(ProxyPool::new(source));
        let task_pool = pool.clone();
        let is_static = task_pool.source.is_static();

        let task = tokio::spawn(async move {
            if is_static {
                task_pool.maintenance_tick().await;
                return;
            }
            let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
            loop {
                interval.tick().await;
                task_pool.maintenance_tick().await;
            }
        });

        Self { pool, task }
    }

    pub fn pool(&self) -> Arc<ProxyPool> {
        self.pool.clone()
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn test_pool() -> ProxyPool {
        ProxyPool::new(ProxySource::File {
            path: "unused".into(),
        })
    }

    #[tokio::test]
    async fn test_get_blocks_until_available_then_returns() {
        let pool = Arc::new(test_pool());
        {
            let mut inner = pool.inner.lock();
            inner
                .proxies
                .push(Proxy::new("1.1.1.1".into(), 80, Utc::now() + Duration::days(1)));
        }
        let got = tokio::time::timeout(StdDuration::from_millis(200), pool.get())
            .await
            .expect("get() should resolve once a proxy is present");
        assert_eq!(got.host, "1.1.1.1");
    }

    #[tokio::test]
    async fn test_mark_banned_removes_proxy_from_availability() {
        let pool = test_pool();
        {
            let mut inner = pool.inner.lock();
            inner
                .proxies
                .push(Proxy::new("2.2.2.2".into(), 81, Utc::now() + Duration::days(1)));
        }
        pool.mark_banned("2.2.2.2", 81);
        assert_eq!(pool.available_count(), 0);
    }

    #[tokio::test]
    async fn test_sweep_invalid_removes_dead_entries() {
        let pool = test_pool();
        {
            let mut inner = pool.inner.lock();
            inner
                .proxies
                .push(Proxy::new("3.3.3.3".into(), 82, Utc::now() - Duration::seconds(1)));
        }
        pool.sweep_invalid();
        assert_eq!(pool.inner.lock().proxies.len(), 0);
    }

    #[tokio::test]
    async fn test_refill_skipped_when_pool_already_at_target() {
        let pool = ProxyPool::new(ProxySource::Zhima {
            api: "http://unused.invalid".into(),
            pool_size: 1,
        });
        {
            let mut inner = pool.inner.lock();
            inner
                .proxies
                .push(Proxy::new("4.4.4.4".into(), 83, Utc::now() + Duration::days(1)));
        }
        // Should short-circuit before attempting any network fetch.
        pool.refill().await.unwrap();
        assert_eq!(pool.inner.lock().proxies.len(), 1);
    }
}
