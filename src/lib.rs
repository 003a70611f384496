//! Concurrent graph-traversal crawler for harvesting public profile
//! records.
//!
//! Starting from a set of seed identifiers, workers expand outward through
//! each record's social graph, fetching and composing a four-part record
//! (identity, relation, monetization, video catalog) per accepted id.

pub mod assembler;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod idpool;
pub mod models;
pub mod proxy;
pub mod sink;

pub use config::Config;
pub use error::{CrawlError, Result};
