//! Navigation-sequence prediction
//!
//! Keeps a frequency table of page-to-page transitions observed
//! across sessions and proposes the most common successors of the
//! current page.

use crate::{LearnSample, ModelOutput, PredictionInput, PredictionModel, FREQUENCY_SATURATION};
use foresight_core::{Candidate, ModelKind, ResourceKind};
use smallvec::SmallVec;
use std::collections::HashMap;
use tracing::debug;

/// Successors returned per prediction cycle
const TOP_SUCCESSORS: usize = 3;

/// Navigation-sequence model
#[derive(Debug, Default)]
pub struct NavigationSequenceModel {
    /// Current page -> next page -> observation count
    transitions: HashMap<String, HashMap<String, u32>>,
}

impl NavigationSequenceModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Warm-start from a persisted transition table
    pub fn from_table(transitions: HashMap<String, HashMap<String, u32>>) -> Self {
        Self { transitions }
    }

    /// Export the transition table for persistence
    pub fn export(&self) -> HashMap<String, HashMap<String, u32>> {
        self.transitions.clone()
    }

    /// Number of pages with observed successors
    pub fn known_pages(&self) -> usize {
        self.transitions.len()
    }

    /// Top successors of a page, most frequent first
    fn successors(&self, url: &str) -> Vec<(&String, u32)> {
        let Some(table) = self.transitions.get(url) else {
            return Vec::new();
        };
        let mut ranked: Vec<(&String, u32)> = table.iter().map(|(u, c)| (u, *c)).collect();
        // Count descending, URL ascending so equal counts stay stable
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(TOP_SUCCESSORS);
        ranked
    }
}

impl PredictionModel for NavigationSequenceModel {
    fn kind(&self) -> ModelKind {
        ModelKind::NavigationSequence
    }

    fn predict(&self, input: &PredictionInput) -> ModelOutput {
        let ranked = self.successors(&input.current_url);
        if ranked.is_empty() {
            return ModelOutput::empty();
        }

        let mut candidates: SmallVec<[Candidate; 4]> = SmallVec::new();
        for (url, count) in &ranked {
            let confidence = (*count as f32 / FREQUENCY_SATURATION).min(1.0);
            candidates.push(Candidate::new(
                (*url).clone(),
                ResourceKind::Navigation,
                confidence,
                ModelKind::NavigationSequence,
            ));
        }

        debug!(
            page = %input.current_url,
            successors = candidates.len(),
            "navigation sequence prediction"
        );

        ModelOutput {
            confidence: candidates.first().map(|c| c.confidence).unwrap_or(0.0),
            candidates,
        }
    }

    fn learn(&mut self, sample: &LearnSample) {
        if let LearnSample::Navigation { from, to } = sample {
            if from.is_empty() || to.is_empty() || from == to {
                return;
            }
            *self
                .transitions
                .entry(from.clone())
                .or_default()
                .entry(to.clone())
                .or_default() += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learn_transition(model: &mut NavigationSequenceModel, from: &str, to: &str, times: u32) {
        for _ in 0..times {
            model.learn(&LearnSample::Navigation {
                from: from.into(),
                to: to.into(),
            });
        }
    }

    #[test]
    fn test_top_successors_ranked_by_frequency() {
        let mut model = NavigationSequenceModel::new();
        learn_transition(&mut model, "/", "/pricing", 6);
        learn_transition(&mut model, "/", "/docs", 3);
        learn_transition(&mut model, "/", "/about", 1);
        learn_transition(&mut model, "/", "/blog", 1);

        let input = PredictionInput {
            current_url: "/".into(),
            ..Default::default()
        };
        let output = model.predict(&input);

        assert_eq!(output.candidates.len(), 3);
        assert_eq!(output.candidates[0].url, "/pricing");
        assert!((output.candidates[0].confidence - 0.6).abs() < 1e-6);
        assert_eq!(output.candidates[1].url, "/docs");
        assert_eq!(output.confidence, output.candidates[0].confidence);
    }

    #[test]
    fn test_unknown_page_is_silent() {
        let model = NavigationSequenceModel::new();
        let input = PredictionInput {
            current_url: "/never-seen".into(),
            ..Default::default()
        };

        let output = model.predict(&input);
        assert_eq!(output.confidence, 0.0);
        assert!(output.candidates.is_empty());
    }

    #[test]
    fn test_confidence_saturates_at_ten_observations() {
        let mut model = NavigationSequenceModel::new();
        learn_transition(&mut model, "/a", "/b", 25);

        let input = PredictionInput {
            current_url: "/a".into(),
            ..Default::default()
        };
        assert_eq!(model.predict(&input).candidates[0].confidence, 1.0);
    }

    #[test]
    fn test_self_transition_not_learned() {
        let mut model = NavigationSequenceModel::new();
        learn_transition(&mut model, "/a", "/a", 3);

        assert_eq!(model.known_pages(), 0);
    }

    #[test]
    fn test_ignores_resource_sequence_samples() {
        let mut model = NavigationSequenceModel::new();
        model.learn(&LearnSample::ResourceSequence {
            first: "/app.js".into(),
            then: "/chunk.js".into(),
        });

        assert_eq!(model.known_pages(), 0);
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut model = NavigationSequenceModel::new();
        learn_transition(&mut model, "/", "/pricing", 4);

        let restored = NavigationSequenceModel::from_table(model.export());
        let input = PredictionInput {
            current_url: "/".into(),
            ..Default::default()
        };

        assert_eq!(restored.predict(&input).candidates[0].url, "/pricing");
    }
}
