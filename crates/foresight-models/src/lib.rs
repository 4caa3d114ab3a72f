//! Prediction models for resource prefetching
//!
//! Four independent strategies share one contract: each consumes the
//! behavior history relevant to it and emits zero or more candidate
//! predictions with confidence scores.
//!
//! ```text
//!  scroll samples ──> ScrollTrajectoryModel ──┐
//!  click history ───> ClickAffinityModel ─────┤
//!  page sequences ──> NavigationSequenceModel ├──> candidates
//!  resource pairs ──> ResourceDependencyModel ┘
//! ```
//!
//! A model with no qualifying signal returns an empty output with
//! confidence 0; that is never an error.

mod click;
mod dependency;
mod history;
mod navigation;
mod scroll;

pub use click::ClickAffinityModel;
pub use dependency::ResourceDependencyModel;
pub use history::{
    BehaviorHistory, ClickSample, ElementSignature, HoverSample, NavigationSample, ScrollSample,
    VisibilitySample,
};
pub use navigation::NavigationSequenceModel;
pub use scroll::{ScrollPrediction, ScrollTrajectoryModel};

use foresight_core::{Candidate, ElementSnapshot, ModelKind};
use smallvec::SmallVec;

/// Frequency count at which a pattern-table model saturates at
/// confidence 1.0
pub const FREQUENCY_SATURATION: f32 = 10.0;

/// Everything a model may look at during one prediction cycle
///
/// Built fresh by the engine each cycle; models never call back into
/// the host.
#[derive(Debug, Clone, Default)]
pub struct PredictionInput {
    /// URL of the current page
    pub current_url: String,
    /// Recent scroll samples, oldest first
    pub scrolls: Vec<ScrollSample>,
    /// Recent click samples, oldest first
    pub clicks: Vec<ClickSample>,
    /// Hover that has passed the dwell threshold, if any
    pub hovered: Option<ElementSnapshot>,
    /// Elements within the look-ahead window, resources extracted
    pub visible_elements: Vec<ElementSnapshot>,
    /// URLs of resources already present on the page
    pub loaded_resources: Vec<String>,
    /// Viewport height in pixels
    pub viewport_height: f64,
    /// Current time in milliseconds
    pub timestamp_ms: u64,
}

/// Output of one model for one cycle
#[derive(Debug, Clone, Default)]
pub struct ModelOutput {
    /// Overall confidence of the signal, in [0, 1]
    pub confidence: f32,
    /// Candidate predictions, strongest first
    pub candidates: SmallVec<[Candidate; 4]>,
}

impl ModelOutput {
    /// Output for a model with no qualifying signal
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A behavior observation fed back into the models
#[derive(Debug, Clone)]
pub enum LearnSample {
    /// A page-to-page transition (full navigation or SPA route push)
    Navigation {
        /// Page navigated from
        from: String,
        /// Page navigated to
        to: String,
    },
    /// Two resources fetched in immediate succession
    ResourceSequence {
        /// Resource fetched first
        first: String,
        /// Resource fetched next
        then: String,
    },
}

/// Contract shared by all four prediction strategies
pub trait PredictionModel: Send + Sync {
    /// Which model this is
    fn kind(&self) -> ModelKind;

    /// Produce candidates for the current cycle
    fn predict(&self, input: &PredictionInput) -> ModelOutput;

    /// Fold an observation into the model's pattern table
    fn learn(&mut self, sample: &LearnSample);
}

/// Prelude for common imports
pub mod prelude {
    pub use super::{
        BehaviorHistory, ClickAffinityModel, LearnSample, ModelOutput, NavigationSequenceModel,
        PredictionInput, PredictionModel, ResourceDependencyModel, ScrollTrajectoryModel,
    };
}
