use serde::{Deserialize, Serialize};

use super::{Identity, Monetization, Relation, VideoCatalog};

/// The four-part bundle emitted per accepted identifier. Exists only
/// transiently in memory between assembly completion and sink write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRecord {
    pub identity: Identity,
    pub relation: Relation,
    pub monetization: Monetization,
    pub video: VideoCatalog,
}
