use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Follower/following counts for an account. This is the popularity gate:
/// below the configured `min_follower` threshold the identifier is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub followers: i64,
    pub following: i64,
}

impl Relation {
    pub fn from_json(data: &Value) -> Option<Self> {
        Some(Self {
            followers: data.get("follower")?.as_i64()?,
            following: data.get("following")?.as_i64()?,
        })
    }

    /// True if this account clears the popularity gate.
    pub fn passes_gate(&self, min_followers: i64) -> bool {
        self.followers >= min_followers
    }
}
