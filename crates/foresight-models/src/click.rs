//! Click-affinity prediction
//!
//! Assumes the user keeps interacting with structurally similar
//! elements: the visible element most often matching recent click
//! signatures becomes the top candidate. A companion method scores a
//! specific hovered link against the same history.

use crate::{
    ElementSignature, LearnSample, ModelOutput, PredictionInput, PredictionModel,
    FREQUENCY_SATURATION,
};
use foresight_core::{Candidate, ElementSnapshot, ModelKind, ResourceKind};
use smallvec::SmallVec;
use tracing::debug;

/// Clicks considered when matching signatures
const CLICK_WINDOW: usize = 10;

/// Click-affinity model
#[derive(Debug, Default)]
pub struct ClickAffinityModel;

impl ClickAffinityModel {
    /// Create the model
    pub fn new() -> Self {
        Self
    }

    /// Confidence that a hovered element will be clicked, from its
    /// structural similarity to recent clicks
    ///
    /// The best-matching recent click determines the score.
    pub fn hover_confidence(&self, input: &PredictionInput, hovered: &ElementSnapshot) -> f32 {
        input
            .clicks
            .iter()
            .rev()
            .take(CLICK_WINDOW)
            .map(|click| click.signature.similarity(hovered))
            .fold(0.0f32, f32::max)
    }
}

impl PredictionModel for ClickAffinityModel {
    fn kind(&self) -> ModelKind {
        ModelKind::ClickAffinity
    }

    fn predict(&self, input: &PredictionInput) -> ModelOutput {
        let recent: Vec<&ElementSignature> = input
            .clicks
            .iter()
            .rev()
            .take(CLICK_WINDOW)
            .map(|c| &c.signature)
            .collect();
        if recent.is_empty() {
            return ModelOutput::empty();
        }

        // For each visible element, how many recent clicks share its
        // tag + class signature.
        let mut best: Option<(&ElementSnapshot, usize)> = None;
        for element in &input.visible_elements {
            let matches = recent.iter().filter(|s| s.matches(element)).count();
            if matches == 0 {
                continue;
            }
            if best.map(|(_, n)| matches > n).unwrap_or(true) {
                best = Some((element, matches));
            }
        }

        let Some((element, matches)) = best else {
            return ModelOutput::empty();
        };
        let confidence = (matches as f32 / FREQUENCY_SATURATION).min(1.0);

        let mut candidates: SmallVec<[Candidate; 4]> = SmallVec::new();
        if let Some(href) = &element.href {
            candidates.push(Candidate::new(
                href.clone(),
                ResourceKind::Navigation,
                confidence,
                ModelKind::ClickAffinity,
            ));
        }
        for resource in &element.resources {
            if candidates.iter().any(|c| c.url == resource.url) {
                continue;
            }
            candidates.push(Candidate::new(
                resource.url.clone(),
                resource.kind,
                confidence,
                ModelKind::ClickAffinity,
            ));
        }

        debug!(
            matches,
            candidates = candidates.len(),
            "click affinity prediction"
        );

        ModelOutput {
            confidence,
            candidates,
        }
    }

    fn learn(&mut self, _sample: &LearnSample) {
        // Affinity is recomputed from the click history each cycle.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClickSample;
    use foresight_core::ResourceRef;

    fn click(tag: &str, classes: &[&str], text: &str, ts: u64) -> ClickSample {
        ClickSample {
            signature: ElementSignature::capture(&ElementSnapshot {
                tag: tag.into(),
                classes: classes.iter().map(|c| c.to_string()).collect(),
                text: text.into(),
                ..Default::default()
            })
            .unwrap(),
            x: 0.0,
            y: 0.0,
            timestamp_ms: ts,
        }
    }

    fn card(href: &str) -> ElementSnapshot {
        ElementSnapshot {
            tag: "a".into(),
            classes: vec!["card".into()],
            text: "Product".into(),
            href: Some(href.into()),
            resources: vec![ResourceRef::new(
                format!("{href}/thumb.png"),
                ResourceKind::Image,
            )],
            ..Default::default()
        }
    }

    #[test]
    fn test_best_matching_element_wins() {
        let model = ClickAffinityModel::new();
        let input = PredictionInput {
            clicks: vec![
                click("a", &["card"], "Product", 1),
                click("a", &["card"], "Product", 2),
                click("a", &["card"], "Product", 3),
                click("button", &["cta"], "Buy", 4),
            ],
            visible_elements: vec![
                card("/products/7"),
                ElementSnapshot {
                    tag: "button".into(),
                    classes: vec!["cta".into()],
                    text: "Buy".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let output = model.predict(&input);

        // Card signature matched 3 times vs 1 for the button
        assert!((output.confidence - 0.3).abs() < 1e-6);
        assert_eq!(output.candidates[0].url, "/products/7");
        assert_eq!(output.candidates[0].kind, ResourceKind::Navigation);
        assert!(output.candidates.iter().any(|c| c.url.ends_with("thumb.png")));
    }

    #[test]
    fn test_no_clicks_is_silent() {
        let model = ClickAffinityModel::new();
        let input = PredictionInput {
            visible_elements: vec![card("/products/7")],
            ..Default::default()
        };

        assert!(model.predict(&input).candidates.is_empty());
    }

    #[test]
    fn test_no_matching_elements_is_silent() {
        let model = ClickAffinityModel::new();
        let input = PredictionInput {
            clicks: vec![click("a", &["card"], "Product", 1)],
            visible_elements: vec![ElementSnapshot {
                tag: "div".into(),
                classes: vec!["footer".into()],
                ..Default::default()
            }],
            ..Default::default()
        };

        let output = model.predict(&input);
        assert_eq!(output.confidence, 0.0);
        assert!(output.candidates.is_empty());
    }

    #[test]
    fn test_confidence_scales_with_match_count() {
        let model = ClickAffinityModel::new();

        let mut clicks = Vec::new();
        for i in 0..10 {
            clicks.push(click("a", &["card"], "Product", i));
        }
        let input = PredictionInput {
            clicks,
            visible_elements: vec![card("/products/1")],
            ..Default::default()
        };

        // 10 matches saturates at 1.0
        assert_eq!(model.predict(&input).confidence, 1.0);
    }

    #[test]
    fn test_hover_confidence_structural_weights() {
        let model = ClickAffinityModel::new();
        let input = PredictionInput {
            clicks: vec![click("a", &["card"], "Product", 1)],
            ..Default::default()
        };

        // Same tag + classes, different text: 0.3 + 0.4
        let similar = ElementSnapshot {
            tag: "a".into(),
            classes: vec!["card".into()],
            text: "Other".into(),
            ..Default::default()
        };
        assert!((model.hover_confidence(&input, &similar) - 0.7).abs() < 1e-6);

        // Identical structure: capped at 1.0
        let identical = ElementSnapshot {
            tag: "a".into(),
            classes: vec!["card".into()],
            text: "Product".into(),
            ..Default::default()
        };
        assert!((model.hover_confidence(&input, &identical) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_hover_confidence_without_history() {
        let model = ClickAffinityModel::new();
        let input = PredictionInput::default();

        let hovered = ElementSnapshot {
            tag: "a".into(),
            ..Default::default()
        };
        assert_eq!(model.hover_confidence(&input, &hovered), 0.0);
    }
}
