mod model;
mod pool;
mod source;

pub use model::Proxy;
pub use pool::{ProxyPool, ProxyPoolHandle};
pub use source::ProxySource;
