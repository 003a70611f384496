use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Monetization stats. When the upstream feature-disabled sentinel is
/// observed, this is synthesized with `enabled: false` rather than treated
/// as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Monetization {
    pub enabled: bool,
    pub month: i64,
    pub total: i64,
}

impl Monetization {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_json(data: &Value) -> Option<Self> {
        Some(Self {
            enabled: true,
            month: data.get("count")?.as_i64()?,
            total: data.get("total_count")?.as_i64()?,
        })
    }
}
