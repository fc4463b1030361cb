//! Materialized artifact-view cache.
//!
//! One entry per resolution depth holds the complete resolved artifact set.
//! Writes call [`CacheTrigger`], which drops every depth in the artifacts
//! namespace before the write returns.
//!
//! ```toml
//! [cache]
//! enabled = true
//! depth_limit = 16
//! ```

mod config;
mod keys;
mod lock;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use keys::ViewKey;
pub use store::{ArtifactViews, CacheError, LruViewStore, ResilientViewCache, ViewCache};
pub use trigger::{CacheTrigger, EventKind};
