use std::sync::Arc;

use serde_json::Value;

use crate::config::SpiderFilterConfig;
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{CompositeRecord, Identity, Monetization, Relation, Video, VideoCatalog, VideoPartition};
use crate::proxy::ProxyPool;

const FOLLOWINGS_PAGE_SIZE: u32 = 50;
const FOLLOWINGS_MAX_PAGES: u32 = 5;
const VIDEO_PAGE_SIZE: i64 = 50;

/// Result of attempting to assemble a composite record for one identifier.
pub enum AssembleOutcome {
    /// Relation/identity/monetization/video all resolved; ready to persist.
    Assembled(CompositeRecord),
    /// Failed the popularity gate; not an error, just out of scope. The
    /// identifier is still marked done rather than silently dropped.
    Dropped,
    /// A required fetch failed; the identifier should be retried later.
    Failed(String),
}

/// Fetches and composes the four-part record for one identifier, and
/// discovers its graph neighbors for frontier expansion.
pub struct RecordAssembler {
    http: Arc<HttpClient>,
    proxy_pool: Option<Arc<ProxyPool>>,
    min_follower: i64,
}

impl RecordAssembler {
    pub fn new(
        http: Arc<HttpClient>,
        proxy_pool: Option<Arc<ProxyPool>>,
        filter_cfg: &SpiderFilterConfig,
    ) -> Self {
        Self {
            http,
            proxy_pool,
            min_follower: filter_cfg.min_follower,
        }
    }

    fn proxy_pool_ref(&self) -> Option<&ProxyPool> {
        self.proxy_pool.as_deref()
    }

    /// Pages through the followings list (up to 5 pages of 50), stopping
    /// early on a short page, and returns the union of discovered ids.
    /// Called before `assemble` so neighbors enter the frontier regardless
    /// of whether this identifier itself passes the popularity gate.
    pub async fn followings(&self, mid: i64) -> Result<Vec<i64>> {
        let mut ids = Vec::new();
        for page in 1..=FOLLOWINGS_MAX_PAGES {
            let path = format!(
                "/x/relation/followings?vmid={mid}&pn={page}&ps={FOLLOWINGS_PAGE_SIZE}"
            );
            let data = self.http.get_json(&path, self.proxy_pool_ref()).await?;
            let entries = data
                .get("list")
                .and_then(|l| l.as_array())
                .cloned()
                .unwrap_or_default();

            let count = entries.len();
            for entry in &entries {
                if let Some(id) = entry.get("mid").and_then(Value::as_i64) {
                    ids.push(id);
                }
            }
            if count < FOLLOWINGS_PAGE_SIZE as usize {
                break;
            }
        }
        Ok(ids)
    }

    async fn fetch_relation(&self, mid: i64) -> Result<Option<Relation>> {
        let data = self
            .http
            .get_json(&format!("/x/relation/stat?vmid={mid}"), self.proxy_pool_ref())
            .await?;
        Ok(Relation::from_json(&data))
    }

    async fn fetch_identity(&self, mid: i64) -> Result<Option<Identity>> {
        let data = self
            .http
            .get_json(&format!("/x/space/acc/info?mid={mid}"), self.proxy_pool_ref())
            .await?;
        Ok(Identity::from_json(mid, &data))
    }

    async fn fetch_monetization(&self, mid: i64) -> Result<Monetization> {
        let data = self
            .http
            .get_json(&format!("/x/ugcpay-rank/elec/user?mid={mid}"), self.proxy_pool_ref())
            .await?;
        if data.as_object().map(|o| o.is_empty()).unwrap_or(true) {
            return Ok(Monetization::disabled());
        }
        Ok(Monetization::from_json(&data).unwrap_or_else(Monetization::disabled))
    }

    async fn fetch_video_catalog(&self, mid: i64) -> Result<Option<VideoCatalog>> {
        let probe = self
            .http
            .get_json(
                &format!("/x/space/wbi/arc/search?mid={mid}&pn=1&ps=1"),
                self.proxy_pool_ref(),
            )
            .await?;

        let total = probe
            .get("page")
            .and_then(|p| p.get("count"))
            .and_then(Value::as_i64)
            .unwrap_or(0);

        if total == 0 {
            return Ok(Some(VideoCatalog::default()));
        }

        let pages = ((total as f64) / (VIDEO_PAGE_SIZE as f64)).ceil() as i64;

        let mut catalog = VideoCatalog::default();
        let mut partitions_set = false;

        for page in 1..=pages {
            let data = self
                .http
                .get_json(
                    &format!(
                        "/x/space/wbi/arc/search?mid={mid}&pn={page}&ps={VIDEO_PAGE_SIZE}"
                    ),
                    self.proxy_pool_ref(),
                )
                .await?;

            if data.is_null() {
                return Ok(None);
            }

            let vlist = data
                .get("list")
                .and_then(|l| l.get("vlist"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for item in &vlist {
                if let Some(video) = Video::from_json(item) {
                    catalog.total_plays += video.plays_as_count();
                    catalog.total_comments += video.comments;
                    catalog.total_danmaku += video.danmaku;
                    catalog.videos.push(video);
                }
            }
            catalog.total_videos += vlist.len() as i64;

            if !partitions_set {
                if let Some(tlist) = data.get("list").and_then(|l| l.get("tlist")).and_then(Value::as_object) {
                    catalog.partitions = tlist
                        .values()
                        .filter_map(|entry| {
                            Some(VideoPartition {
                                category_id: entry.get("tid")?.as_i64()?,
                                count: entry.get("count")?.as_i64()?,
                            })
                        })
                        .collect();
                }
                partitions_set = true;
            }
        }

        Ok(Some(catalog))
    }

    /// Fetches relation first as a gate; if it passes, fetches identity,
    /// monetization, and video catalog concurrently.
    pub async fn assemble(&self, mid: i64) -> Result<AssembleOutcome> {
        let relation = match self.fetch_relation(mid).await? {
            Some(r) => r,
            None => return Ok(AssembleOutcome::Failed("relation fetch returned unparseable data".into())),
        };

        if !relation.passes_gate(self.min_follower) {
            return Ok(AssembleOutcome::Dropped);
        }

        let (identity, monetization, video) = tokio::join!(
            self.fetch_identity(mid),
            self.fetch_monetization(mid),
            self.fetch_video_catalog(mid),
        );

        let identity = match identity? {
            Some(i) => i,
            None => return Ok(AssembleOutcome::Failed("identity fetch returned unparseable data".into())),
        };
        let monetization = monetization?;
        let video = match video? {
            Some(v) => v,
            None => return Ok(AssembleOutcome::Failed("video catalog pagination failed".into())),
        };

        Ok(AssembleOutcome::Assembled(CompositeRecord {
            identity,
            relation,
            monetization,
            video,
        }))
    }
}
