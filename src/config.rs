//! Validation policy for a view factor relation.

use serde::{Deserialize, Serialize};

/// Slack allowed when checking that view factors leaving one entity sum to 1.
pub const SUM_TOLERANCE: f64 = 1e-9;

/// Optional checks layered on top of the always-enforced ones.
///
/// Range, endpoint kind and zone membership are always checked. The checks
/// here are off or permissive by default: the simulation engine is the
/// authority on enclosure closure, and partially specified enclosures are
/// normal while a model is being edited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationConfig {
    /// Accept edges whose `from` and `to` are the same entity.
    pub allow_self_view: bool,
    /// Reject an edge that would push the total leaving its `from` entity
    /// above `1 + SUM_TOLERANCE`.
    pub enforce_source_sum: bool,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self { allow_self_view: true, enforce_source_sum: false }
    }
}

impl RelationConfig {
    /// Self views rejected and per-source sums capped at 1.
    pub fn strict() -> Self {
        Self { allow_self_view: false, enforce_source_sum: true }
    }

    pub fn with_self_view(mut self, allow: bool) -> Self {
        self.allow_self_view = allow;
        self
    }

    pub fn with_source_sum(mut self, enforce: bool) -> Self {
        self.enforce_source_sum = enforce;
        self
    }
}
