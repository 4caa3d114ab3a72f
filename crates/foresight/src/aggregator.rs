//! Prediction aggregation and prioritization
//!
//! Merges the candidates from all models into one ranked list, gates
//! them on the confidence threshold, and scores each survivor as
//!
//! `priority = confidence × kind_weight × network_weight ×
//!             dedupe_weight × model_weight`
//!
//! The sort is stable so equal priorities keep insertion order and
//! behavior stays deterministic.

use foresight_core::{Candidate, ModelKind, NetworkProfile, Settings, DEDUPE_WEIGHT};
use foresight_models::ModelOutput;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A candidate with its computed priority
///
/// The priority is derived and recomputed every cycle, never
/// persisted.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    /// The underlying prediction
    pub candidate: Candidate,
    /// Computed priority score
    pub priority: f32,
}

/// Policy inputs for one ranking pass
#[derive(Debug, Clone)]
pub struct RankingContext {
    /// Current settings snapshot
    pub settings: Settings,
    /// Current network profile
    pub profile: NetworkProfile,
    /// Per-model weights from the learning loop (default 1.0)
    pub model_weights: HashMap<ModelKind, f32>,
    /// URLs already preloaded or currently loading
    pub known_urls: HashSet<String>,
}

impl RankingContext {
    /// Context with default weights and no known URLs
    pub fn new(settings: Settings, profile: NetworkProfile) -> Self {
        Self {
            settings,
            profile,
            model_weights: HashMap::new(),
            known_urls: HashSet::new(),
        }
    }

    fn model_weight(&self, kind: ModelKind) -> f32 {
        self.model_weights.get(&kind).copied().unwrap_or(1.0)
    }

    fn dedupe_weight(&self, url: &str) -> f32 {
        if self.known_urls.contains(url) {
            DEDUPE_WEIGHT
        } else {
            1.0
        }
    }
}

/// Merges model outputs into one gated, ranked candidate list
#[derive(Debug, Default)]
pub struct PredictionAggregator;

impl PredictionAggregator {
    /// Create the aggregator
    pub fn new() -> Self {
        Self
    }

    /// Flatten, gate, score, and sort this cycle's model outputs
    ///
    /// The confidence gate on raw confidence is the single point that
    /// decides whether a prediction is ever acted upon.
    pub fn rank(&self, outputs: Vec<ModelOutput>, context: &RankingContext) -> Vec<RankedCandidate> {
        let mut ranked: Vec<RankedCandidate> = Vec::new();
        let mut discarded = 0usize;

        for output in outputs {
            for candidate in output.candidates {
                if candidate.confidence < context.settings.confidence_threshold {
                    discarded += 1;
                    continue;
                }
                let priority = self.priority(&candidate, context);
                ranked.push(RankedCandidate {
                    candidate,
                    priority,
                });
            }
        }

        // Stable: ties keep insertion order
        ranked.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            ranked = ranked.len(),
            discarded, "aggregated prediction cycle"
        );
        ranked
    }

    /// Priority score for one candidate
    pub fn priority(&self, candidate: &Candidate, context: &RankingContext) -> f32 {
        candidate.confidence
            * candidate.kind_weight()
            * context.profile.network_weight()
            * context.dedupe_weight(&candidate.url)
            * context.model_weight(candidate.origin)
    }
}
