//! Resource and candidate-prediction types

use serde::{Deserialize, Serialize};

/// Kind of resource a prediction points at
///
/// A closed enum so an unhandled kind can never silently fall through
/// a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A page the user may navigate to
    Navigation,
    /// Image asset
    Image,
    /// Script asset
    Script,
    /// Stylesheet asset
    Style,
    /// Web font
    Font,
    /// Anything else worth warming
    Other,
}

impl ResourceKind {
    /// Priority weight for this kind
    pub fn priority_weight(&self) -> f32 {
        match self {
            ResourceKind::Navigation => 1.5,
            ResourceKind::Image => 1.2,
            ResourceKind::Font => 1.1,
            ResourceKind::Script | ResourceKind::Style => 1.0,
            ResourceKind::Other => 1.0,
        }
    }

    /// The `as` attribute value used on a preload hint
    pub fn hint_as(&self) -> &'static str {
        match self {
            ResourceKind::Navigation => "document",
            ResourceKind::Image => "image",
            ResourceKind::Script => "script",
            ResourceKind::Style => "style",
            ResourceKind::Font => "font",
            ResourceKind::Other => "fetch",
        }
    }
}

/// A resource reference extracted from the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource URL
    pub url: String,
    /// Resource kind
    pub kind: ResourceKind,
}

impl ResourceRef {
    /// Create a new resource reference
    pub fn new(url: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

/// Page-relative bounding box of an element
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Top edge, page coordinates (px)
    pub top: f64,
    /// Bottom edge, page coordinates (px)
    pub bottom: f64,
}

impl Bounds {
    /// Create bounds from top/bottom edges
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }
}

/// A vertical slice of the page the engine expects to be visible soon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportWindow {
    /// Top edge, page coordinates (px)
    pub top: f64,
    /// Bottom edge, page coordinates (px)
    pub bottom: f64,
}

impl ViewportWindow {
    /// Create a window from top/bottom edges
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }

    /// Whether an element's bounds intersect this window
    pub fn intersects(&self, bounds: &Bounds) -> bool {
        bounds.bottom >= self.top && bounds.top <= self.bottom
    }
}

/// The rendering layer's view of one element, captured at prediction time
///
/// Models consume these snapshots instead of calling back into the
/// rendering collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Tag name, lowercase
    pub tag: String,
    /// Class list, order preserved
    pub classes: Vec<String>,
    /// Visible text, truncated by the host
    pub text: String,
    /// Page-relative bounds
    pub bounds: Bounds,
    /// Link target, if the element is a link
    pub href: Option<String>,
    /// Resources this element pulls in
    pub resources: Vec<ResourceRef>,
}

/// Which model produced a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Scroll-trajectory extrapolation
    ScrollTrajectory,
    /// Click-affinity matching
    ClickAffinity,
    /// Navigation-sequence frequency
    NavigationSequence,
    /// Resource-dependency frequency
    ResourceDependency,
}

impl ModelKind {
    /// All model kinds, in prediction-cycle order
    pub fn all() -> &'static [ModelKind] {
        &[
            ModelKind::ScrollTrajectory,
            ModelKind::ClickAffinity,
            ModelKind::NavigationSequence,
            ModelKind::ResourceDependency,
        ]
    }

    /// Short name for logging and telemetry payloads
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::ScrollTrajectory => "scroll",
            ModelKind::ClickAffinity => "click",
            ModelKind::NavigationSequence => "navigation",
            ModelKind::ResourceDependency => "dependency",
        }
    }
}

/// A candidate prediction produced by one model
///
/// Produced fresh each prediction cycle; never mutated, only
/// superseded by the next cycle's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Resource URL
    pub url: String,
    /// Resource kind
    pub kind: ResourceKind,
    /// Confidence score, always in [0, 1]
    pub confidence: f32,
    /// Originating model
    pub origin: ModelKind,
    /// Whether the resource is critical to the predicted interaction
    pub critical: bool,
    /// Estimated transfer size, if the host knows it
    pub estimated_bytes: Option<u64>,
}

impl Candidate {
    /// Create a new candidate; confidence is clamped into [0, 1]
    pub fn new(
        url: impl Into<String>,
        kind: ResourceKind,
        confidence: f32,
        origin: ModelKind,
    ) -> Self {
        Self {
            url: url.into(),
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            origin,
            critical: false,
            estimated_bytes: None,
        }
    }

    /// Mark the candidate as critical
    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    /// Set the estimated transfer size
    pub fn with_estimated_bytes(mut self, bytes: u64) -> Self {
        self.estimated_bytes = Some(bytes);
        self
    }

    /// Kind weight, accounting for the critical flag
    pub fn kind_weight(&self) -> f32 {
        if self.critical {
            crate::CRITICAL_WEIGHT
        } else {
            self.kind.priority_weight()
        }
    }
}
