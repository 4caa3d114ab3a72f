//! Ports to the host-page collaborators
//!
//! The engine never reaches into ambient global state; everything it
//! needs from the page arrives through these interfaces at
//! construction time.

use crate::{ElementSnapshot, NetworkContext, ResourceKind, Result, ViewportWindow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of an issued resource hint
#[derive(Debug, Clone)]
pub enum FetchResult {
    /// The browser finished fetching the hinted resource
    Completed {
        /// Transfer size in bytes
        bytes: u64,
    },
    /// The fetch did not complete
    Failed {
        /// Diagnostic reason
        reason: String,
    },
}

impl FetchResult {
    /// Check if the fetch completed
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Completed { .. })
    }
}

/// Rendering-layer queries
///
/// Synchronous: in the source environment these are plain DOM reads.
pub trait RenderingPort: Send + Sync {
    /// Elements intersecting a page window, with their resources
    /// already extracted
    fn visible_elements(&self, window: &ViewportWindow) -> Vec<ElementSnapshot>;

    /// Current viewport height in pixels
    fn viewport_height(&self) -> f64;
}

/// Source of network condition snapshots
pub trait NetworkProbe: Send + Sync {
    /// Current network conditions
    fn snapshot(&self) -> NetworkContext;
}

/// Fire-and-forget resource-hint primitives
///
/// The engine does not perform byte-level fetching itself; the host
/// resolves each hint when the underlying fetch settles so the
/// scheduler can close its record and free the slot.
#[async_trait::async_trait]
pub trait HintSink: Send + Sync {
    /// Issue a preload hint for a resource needed imminently
    async fn issue_preload(&self, url: &str, kind: ResourceKind) -> FetchResult;

    /// Issue a low-priority prefetch hint for a future navigation
    async fn issue_prefetch(&self, url: &str) -> FetchResult;

    /// Warm up the connection to a URL's origin
    fn warm_connection(&self, url: &str);
}

/// Cross-session history storage
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load persisted state, if any
    async fn load(&self) -> Result<Option<PersistedState>>;

    /// Save state for the next session
    async fn save(&self, state: &PersistedState) -> Result<()>;
}

/// Telemetry sink; never awaited, never on the critical path
pub trait TelemetrySink: Send + Sync {
    /// Report an event with a JSON payload
    fn report(&self, event: &str, payload: serde_json::Value);
}

/// State serialized across sessions so models warm-start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    /// Page URL -> successor URL -> observation count
    pub navigation_transitions: HashMap<String, HashMap<String, u32>>,
    /// Resource URL -> follower URL -> observation count
    pub resource_dependencies: HashMap<String, HashMap<String, u32>>,
    /// Per-model priority weights from the learning loop
    pub model_weights: HashMap<String, f32>,
    /// Lifetime prefetch hits
    pub lifetime_hits: u64,
    /// Lifetime prefetch misses
    pub lifetime_misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_result_success() {
        assert!(FetchResult::Completed { bytes: 10 }.is_success());
        assert!(!FetchResult::Failed {
            reason: "aborted".into()
        }
        .is_success());
    }

    #[test]
    fn test_persisted_state_round_trip() {
        let mut state = PersistedState::default();
        state
            .navigation_transitions
            .entry("/".into())
            .or_default()
            .insert("/pricing".into(), 4);
        state.lifetime_hits = 7;

        let json = serde_json::to_string(&state).unwrap();
        let back: PersistedState = serde_json::from_str(&json).unwrap();

        assert_eq!(back.navigation_transitions["/"]["/pricing"], 4);
        assert_eq!(back.lifetime_hits, 7);
    }
}
