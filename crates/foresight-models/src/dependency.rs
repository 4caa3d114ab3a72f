//! Resource-dependency prediction
//!
//! Remembers which resources historically follow each other and
//! proposes the frequent followers of resources already on the page
//! that are not yet loaded themselves.

use crate::{LearnSample, ModelOutput, PredictionInput, PredictionModel, FREQUENCY_SATURATION};
use foresight_core::{Candidate, ModelKind, ResourceKind};
use smallvec::SmallVec;
use std::collections::HashMap;
use tracing::debug;

/// Resource-dependency model
#[derive(Debug, Default)]
pub struct ResourceDependencyModel {
    /// Resource URL -> follower URL -> observation count
    dependents: HashMap<String, HashMap<String, u32>>,
}

impl ResourceDependencyModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Warm-start from a persisted dependency table
    pub fn from_table(dependents: HashMap<String, HashMap<String, u32>>) -> Self {
        Self { dependents }
    }

    /// Export the dependency table for persistence
    pub fn export(&self) -> HashMap<String, HashMap<String, u32>> {
        self.dependents.clone()
    }

    /// Number of resources with observed followers
    pub fn known_resources(&self) -> usize {
        self.dependents.len()
    }

    /// Guess the kind of a follower from its URL extension
    fn kind_for(url: &str) -> ResourceKind {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        match path.rsplit('.').next() {
            Some("js" | "mjs") => ResourceKind::Script,
            Some("css") => ResourceKind::Style,
            Some("png" | "jpg" | "jpeg" | "gif" | "webp" | "avif" | "svg") => ResourceKind::Image,
            Some("woff" | "woff2" | "ttf" | "otf") => ResourceKind::Font,
            _ => ResourceKind::Other,
        }
    }
}

impl PredictionModel for ResourceDependencyModel {
    fn kind(&self) -> ModelKind {
        ModelKind::ResourceDependency
    }

    fn predict(&self, input: &PredictionInput) -> ModelOutput {
        // Followers of loaded resources, keyed by URL, strongest
        // observation count kept.
        let mut follower_counts: HashMap<&String, u32> = HashMap::new();
        for loaded in &input.loaded_resources {
            let Some(followers) = self.dependents.get(loaded) else {
                continue;
            };
            for (url, count) in followers {
                if input.loaded_resources.iter().any(|l| l == url) {
                    continue; // already present
                }
                let entry = follower_counts.entry(url).or_default();
                *entry = (*entry).max(*count);
            }
        }
        if follower_counts.is_empty() {
            return ModelOutput::empty();
        }

        let mut ranked: Vec<(&String, u32)> = follower_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let mut candidates: SmallVec<[Candidate; 4]> = SmallVec::new();
        for (url, count) in ranked.into_iter().take(4) {
            let confidence = (count as f32 / FREQUENCY_SATURATION).min(1.0);
            candidates.push(Candidate::new(
                url.clone(),
                Self::kind_for(url),
                confidence,
                ModelKind::ResourceDependency,
            ));
        }

        debug!(candidates = candidates.len(), "resource dependency prediction");

        ModelOutput {
            confidence: candidates.first().map(|c| c.confidence).unwrap_or(0.0),
            candidates,
        }
    }

    fn learn(&mut self, sample: &LearnSample) {
        if let LearnSample::ResourceSequence { first, then } = sample {
            if first.is_empty() || then.is_empty() || first == then {
                return;
            }
            *self
                .dependents
                .entry(first.clone())
                .or_default()
                .entry(then.clone())
                .or_default() += 1;
        }
    }
}
