//! Cache key definitions.

use std::fmt;

/// Namespace holding every materialized artifact listing.
pub const ARTIFACTS_NAMESPACE: &str = "all_artifacts";

/// Identifies one materialized view: a namespace and a resolution depth.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub namespace: String,
    pub depth: u32,
}

impl ViewKey {
    pub fn new(namespace: impl Into<String>, depth: u32) -> Self {
        Self {
            namespace: namespace.into(),
            depth,
        }
    }

    /// Key for the full artifact set resolved at `depth`.
    pub fn artifacts(depth: u32) -> Self {
        Self::new(ARTIFACTS_NAMESPACE, depth)
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:depth={}", self.namespace, self.depth)
    }
}
