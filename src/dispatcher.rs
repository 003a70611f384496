use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::assembler::{AssembleOutcome, RecordAssembler};
use crate::idpool::IdPool;
use crate::sink::Sink;

/// Runs a fixed pool of workers, each looping: pop an id, discover its
/// neighbors, offer them to the frontier, assemble a record, then persist
/// or mark the id failed. A worker never dies on a per-id error; it logs
/// and moves on to the next id.
pub struct Dispatcher {
    id_pool: Arc<IdPool>,
    assembler: Arc<RecordAssembler>,
    sink: Arc<Sink>,
}

impl Dispatcher {
    pub fn new(id_pool: Arc<IdPool>, assembler: Arc<RecordAssembler>, sink: Arc<Sink>) -> Self {
        Self {
            id_pool,
            assembler,
            sink,
        }
    }

    pub fn spawn_workers(self: &Arc<Self>, count: usize) -> Vec<JoinHandle<()>> {
        (0..count)
            .map(|worker_id| {
                let dispatcher = self.clone();
                tokio::spawn(async move { dispatcher.worker_loop(worker_id).await })
            })
            .collect()
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        loop {
            let mid = self.id_pool.pop().await;
            if let Err(err) = self.process_one(mid).await {
                tracing::warn!(worker_id, mid, error = %err, "id processing failed");
                self.id_pool.mark_failed(mid);
            }
        }
    }

    #[tracing::instrument(skip(self), fields(mid))]
    async fn process_one(&self, mid: i64) -> crate::error::Result<()> {
        let neighbors = self.assembler.followings(mid).await?;
        self.id_pool.offer(neighbors);

        match self.assembler.assemble(mid).await? {
            AssembleOutcome::Assembled(record) => {
                self.sink.write_record(&record)?;
                self.id_pool.mark_done(mid);
            }
            AssembleOutcome::Dropped => {
                self.id_pool.mark_done(mid);
            }
            AssembleOutcome::Failed(reason) => {
                tracing::warn!(mid, reason, "assembly failed");
                self.id_pool.mark_failed(mid);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpClientConfig, SpiderFilterConfig, TimeoutConfig};
    use crate::http::HttpClient;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_process_one_offers_neighbors_and_marks_dropped_id_done() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/x/relation/followings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "data": {"list": [{"mid": 101}, {"mid": 102}]},
                "msg": "0",
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/x/relation/stat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "data": {"follower": 1, "following": 1},
                "msg": "0",
            })))
            .mount(&server)
            .await;

        let http = Arc::new(
            HttpClient::new(&HttpClientConfig {
                base_url: server.uri(),
                retry_times: 1,
                timeout: TimeoutConfig { total: 5, connect: 5 },
            })
            .unwrap(),
        );
        let assembler = Arc::new(RecordAssembler::new(
            http,
            None,
            &SpiderFilterConfig { min_follower: 10_000 },
        ));

        let dir = std::env::temp_dir().join(format!("dispatcher-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let sink = Arc::new(Sink::open(dir.join("records.dat")).unwrap());

        let id_pool = Arc::new(IdPool::new());
        id_pool.offer([10]);

        let dispatcher = Dispatcher::new(id_pool.clone(), assembler, sink);
        dispatcher.process_one(10).await.unwrap();

        // 10 itself was below the popularity gate and is marked done, not
        // requeued; its discovered neighbors are what's left in the frontier.
        let first = tokio::time::timeout(Duration::from_millis(200), id_pool.pop())
            .await
            .expect("a discovered neighbor should be queued");
        let second = tokio::time::timeout(Duration::from_millis(200), id_pool.pop())
            .await
            .expect("a second discovered neighbor should be queued");
        assert_eq!([first, second], [101, 102]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
