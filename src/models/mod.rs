mod identity;
mod monetization;
mod record;
mod relation;
mod video;

pub use identity::Identity;
pub use monetization::Monetization;
pub use record::CompositeRecord;
pub use relation::Relation;
pub use video::{parse_duration, Video, VideoCatalog, VideoPartition};
