//! Cache configuration.
//!
//! Controls the materialized artifact-view cache via `oracle.toml`.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_DEPTH_LIMIT: u32 = 16;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve listings from materialized views.
    pub enabled: bool,
    /// Deepest resolution a request may ask for. Deeper requests are rejected.
    pub depth_limit: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            depth_limit: DEFAULT_DEPTH_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            depth_limit: settings.depth_limit,
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// One entry per depth from 0 through `depth_limit`.
    pub fn depth_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.depth_limit as usize + 1).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.is_enabled());
        assert_eq!(config.depth_limit, 16);
    }

    #[test]
    fn capacity_covers_every_depth() {
        let config = CacheConfig {
            depth_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.depth_capacity().get(), 1);
        assert_eq!(CacheConfig::default().depth_capacity().get(), 17);
    }
}
