use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-category submission totals (`tlist` entries in the upstream API).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPartition {
    pub category_id: i64,
    pub count: i64,
}

/// One submitted-video summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub avid: i64,
    pub bvid: String,
    pub title: String,
    /// Raw play-count field, preserved unmodified. Sometimes a non-integer
    /// placeholder upstream; use `plays_as_count` for aggregation.
    pub plays: Value,
    pub comments: i64,
    pub danmaku: i64,
    pub category_id: i64,
    pub created: i64,
    pub duration_seconds: i64,
    pub is_union: bool,
}

/// Parses `"MM:SS"` into seconds the way the upstream implementation does:
/// it sums the components directly (`M + S`) instead of `60*M + S`. This is
/// almost certainly a bug in the original, but it's preserved here since a
/// downstream consumer may already depend on the exact observed values.
pub fn parse_duration(raw: &str) -> i64 {
    raw.split(':').filter_map(|part| part.parse::<i64>().ok()).sum()
}

impl Video {
    pub fn from_json(item: &Value) -> Option<Self> {
        let length = item.get("length")?.as_str()?;
        Some(Self {
            avid: item.get("aid")?.as_i64()?,
            bvid: item.get("bvid")?.as_str()?.to_string(),
            title: item.get("title")?.as_str()?.to_string(),
            plays: item.get("play")?.clone(),
            comments: item.get("comment")?.as_i64()?,
            danmaku: item.get("video_review")?.as_i64()?,
            category_id: item.get("typeid")?.as_i64()?,
            created: item.get("created")?.as_i64()?,
            duration_seconds: parse_duration(length),
            is_union: item
                .get("is_union_video")
                .and_then(|v| v.as_i64())
                .unwrap_or(0)
                != 0,
        })
    }

    /// Play count coerced to an integer; non-integer placeholders count as 0
    /// toward the aggregate sum, but `plays` itself is left untouched.
    pub fn plays_as_count(&self) -> i64 {
        self.plays.as_i64().unwrap_or(0)
    }
}

/// Paginated catalog of submitted videos plus aggregate/category totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoCatalog {
    pub total_videos: i64,
    pub total_plays: i64,
    pub total_comments: i64,
    pub total_danmaku: i64,
    pub partitions: Vec<VideoPartition>,
    pub videos: Vec<Video>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_duration_sums_components_not_seconds() {
        // 127:31 -> 127 + 31, NOT 127*60 + 31. Pinning the observed (buggy) behavior.
        assert_eq!(parse_duration("127:31"), 158);
        assert_eq!(parse_duration("0:05"), 5);
        assert_eq!(parse_duration("2:00"), 2);
    }

    #[test]
    fn test_video_from_json() {
        let item = json!({
            "aid": 123,
            "bvid": "BV1xx",
            "title": "hello",
            "play": 1000,
            "comment": 5,
            "video_review": 10,
            "typeid": 17,
            "created": 1_600_000_000,
            "length": "3:45",
            "is_union_video": 1,
        });

        let video = Video::from_json(&item).unwrap();
        assert_eq!(video.avid, 123);
        assert_eq!(video.duration_seconds, 48);
        assert_eq!(video.plays_as_count(), 1000);
        assert!(video.is_union);
    }

    #[test]
    fn test_video_non_integer_play_preserved_but_counts_zero() {
        let item = json!({
            "aid": 1, "bvid": "BV1", "title": "t",
            "play": "--", "comment": 0, "video_review": 0,
            "typeid": 1, "created": 0, "length": "1:00",
            "is_union_video": 0,
        });
        let video = Video::from_json(&item).unwrap();
        assert_eq!(video.plays, json!("--"));
        assert_eq!(video.plays_as_count(), 0);
    }

    #[test]
    fn test_video_missing_length_is_none() {
        let item = json!({"aid": 1, "bvid": "BV1", "title": "t"});
        assert!(Video::from_json(&item).is_none());
    }
}
