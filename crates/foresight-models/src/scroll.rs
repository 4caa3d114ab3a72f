//! Scroll-trajectory prediction
//!
//! Extrapolates the viewport one second ahead from recent scroll
//! kinematics and proposes the resources of elements that will enter
//! the predicted window.

use crate::{LearnSample, ModelOutput, PredictionInput, PredictionModel, ScrollSample};
use foresight_core::{Candidate, ModelKind, ViewportWindow};
use smallvec::SmallVec;
use tracing::debug;

/// How far ahead the viewport is extrapolated, in milliseconds
const LOOKAHEAD_MS: f64 = 1000.0;

/// Velocity (px/ms) at which confidence saturates at 1.0
const VELOCITY_SATURATION: f64 = 10.0;

/// Samples considered for the velocity trend
const TREND_WINDOW: usize = 5;

/// Minimum samples before the model produces a signal
const MIN_SAMPLES: usize = 3;

/// The extrapolated viewport produced by one prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPrediction {
    /// Predicted window one second ahead
    pub window: ViewportWindow,
    /// Simple moving average of per-sample velocity (px/ms)
    pub velocity_trend: f64,
    /// Fraction of recent samples moving in the majority direction
    pub direction_consistency: f64,
}

/// Scroll-trajectory model
#[derive(Debug, Default)]
pub struct ScrollTrajectoryModel;

impl ScrollTrajectoryModel {
    /// Create the model
    pub fn new() -> Self {
        Self
    }

    /// Extrapolate the viewport from recent samples
    ///
    /// Returns `None` with fewer than three samples; stationary
    /// scrolling yields a prediction with a near-zero trend, which
    /// `predict` maps to confidence 0.
    pub fn extrapolate(
        &self,
        samples: &[ScrollSample],
        viewport_height: f64,
    ) -> Option<ScrollPrediction> {
        if samples.len() < MIN_SAMPLES {
            return None;
        }

        let window: Vec<&ScrollSample> =
            samples.iter().rev().take(TREND_WINDOW).rev().collect();

        // Pairwise velocities over the window; stored per-sample
        // velocity is not reused so the first-ever sample's zero does
        // not dilute the trend.
        let mut velocities = Vec::with_capacity(window.len() - 1);
        for pair in window.windows(2) {
            let dt = pair[1].timestamp_ms.saturating_sub(pair[0].timestamp_ms) as f64;
            if dt > 0.0 {
                velocities.push((pair[1].y - pair[0].y) / dt);
            }
        }
        if velocities.is_empty() {
            return None;
        }

        let velocity_trend = velocities.iter().sum::<f64>() / velocities.len() as f64;

        let (down, up) = velocities.iter().fold((0usize, 0usize), |(d, u), v| {
            if *v >= 0.0 {
                (d + 1, u)
            } else {
                (d, u + 1)
            }
        });
        let direction_consistency = down.max(up) as f64 / velocities.len() as f64;

        let last_y = window.last().map(|s| s.y).unwrap_or(0.0);
        let predicted_y = last_y + velocity_trend * LOOKAHEAD_MS;

        Some(ScrollPrediction {
            window: ViewportWindow::new(predicted_y, predicted_y + viewport_height.max(1.0)),
            velocity_trend,
            direction_consistency,
        })
    }
}

impl PredictionModel for ScrollTrajectoryModel {
    fn kind(&self) -> ModelKind {
        ModelKind::ScrollTrajectory
    }

    fn predict(&self, input: &PredictionInput) -> ModelOutput {
        let Some(prediction) = self.extrapolate(&input.scrolls, input.viewport_height) else {
            return ModelOutput::empty();
        };

        let confidence = ((prediction.velocity_trend.abs() / VELOCITY_SATURATION).min(1.0)
            * prediction.direction_consistency) as f32;
        if confidence <= f32::EPSILON {
            return ModelOutput::empty();
        }

        let mut candidates: SmallVec<[Candidate; 4]> = SmallVec::new();
        for element in &input.visible_elements {
            if !prediction.window.intersects(&element.bounds) {
                continue;
            }
            for resource in &element.resources {
                if candidates.iter().any(|c| c.url == resource.url) {
                    continue;
                }
                candidates.push(Candidate::new(
                    resource.url.clone(),
                    resource.kind,
                    confidence,
                    ModelKind::ScrollTrajectory,
                ));
            }
        }

        debug!(
            trend = prediction.velocity_trend,
            consistency = prediction.direction_consistency,
            candidates = candidates.len(),
            "scroll trajectory prediction"
        );

        ModelOutput {
            confidence,
            candidates,
        }
    }

    fn learn(&mut self, _sample: &LearnSample) {
        // Purely kinematic; nothing to learn across cycles.
    }
}
