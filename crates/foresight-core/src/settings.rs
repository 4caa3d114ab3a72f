//! Adaptive prefetch settings

use serde::{Deserialize, Serialize};

/// Policy knobs read by the aggregator and scheduler
///
/// Only the network monitor (profile transitions and the idle/active
/// heuristic) replaces this; everyone else reads a consistent
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Minimum raw confidence for a candidate to be scheduled
    pub confidence_threshold: f32,
    /// Maximum prefetches in flight at once; always >= 1
    pub max_concurrent_prefetches: usize,
    /// Maximum estimated size admitted per resource, in bytes
    pub max_resource_bytes: u64,
}

impl Settings {
    /// Create settings; invariants are enforced on construction
    pub fn new(
        confidence_threshold: f32,
        max_concurrent_prefetches: usize,
        max_resource_bytes: u64,
    ) -> Self {
        Self {
            confidence_threshold: confidence_threshold.clamp(0.0, 1.0),
            max_concurrent_prefetches: max_concurrent_prefetches.max(1),
            max_resource_bytes,
        }
    }

    /// Stricter variant applied while the user is idle
    ///
    /// New predictions are effectively starved; in-flight work is
    /// unaffected.
    pub fn for_idle(&self) -> Self {
        Self {
            confidence_threshold: (self.confidence_threshold + 0.1).min(1.0),
            max_concurrent_prefetches: 1,
            max_resource_bytes: self.max_resource_bytes,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        // Balanced profile values
        Self::new(0.7, 3, 5 * 1024 * 1024)
    }
}

/// Whether the user is actively interacting with the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttentionState {
    /// Interaction seen recently
    #[default]
    Active,
    /// No interaction for the idle window
    Idle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_floor() {
        let settings = Settings::new(0.5, 0, 1024);
        assert_eq!(settings.max_concurrent_prefetches, 1);
    }

    #[test]
    fn test_threshold_clamped() {
        assert_eq!(Settings::new(1.4, 2, 0).confidence_threshold, 1.0);
        assert_eq!(Settings::new(-0.5, 2, 0).confidence_threshold, 0.0);
    }

    #[test]
    fn test_idle_raises_threshold_and_drops_concurrency() {
        let active = Settings::new(0.6, 5, 10 * 1024 * 1024);
        let idle = active.for_idle();

        assert!((idle.confidence_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(idle.max_concurrent_prefetches, 1);
        assert_eq!(idle.max_resource_bytes, active.max_resource_bytes);
    }

    #[test]
    fn test_idle_threshold_capped_at_one() {
        let strict = Settings::new(0.95, 1, 1024);
        assert_eq!(strict.for_idle().confidence_threshold, 1.0);
    }
}
