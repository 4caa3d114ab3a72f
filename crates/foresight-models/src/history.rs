//! Bounded behavior histories
//!
//! Raw interaction signals arrive as typed samples and age out by
//! position once a per-kind cap is exceeded; nothing is ever mutated
//! after it is recorded.

use foresight_core::ElementSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum retained scroll samples
pub const SCROLL_HISTORY_CAP: usize = 100;

/// Maximum retained samples for every other event kind
pub const EVENT_HISTORY_CAP: usize = 50;

/// Characters of element text considered for signature matching
const TEXT_PREFIX_LEN: usize = 32;

/// One scroll observation with derived kinematics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollSample {
    /// Scroll offset, page coordinates (px)
    pub y: f64,
    /// Capture time in milliseconds
    pub timestamp_ms: u64,
    /// Instantaneous velocity vs the previous sample (px/ms)
    pub velocity: f64,
    /// Velocity delta vs the previous sample (px/ms^2)
    pub acceleration: f64,
}

/// Structural identity of an element, used for affinity matching
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementSignature {
    /// Tag name, lowercase
    pub tag: String,
    /// Class list, order preserved
    pub classes: Vec<String>,
    /// Truncated visible text
    pub text_prefix: String,
}

impl ElementSignature {
    /// Capture the signature of a snapshot
    ///
    /// Returns `None` when the element carries nothing to match on;
    /// such interactions are simply not recorded.
    pub fn capture(element: &ElementSnapshot) -> Option<Self> {
        if element.tag.is_empty() {
            return None;
        }
        Some(Self {
            tag: element.tag.to_lowercase(),
            classes: element.classes.clone(),
            text_prefix: truncate(&element.text, TEXT_PREFIX_LEN),
        })
    }

    /// Exact tag + class match
    pub fn matches(&self, element: &ElementSnapshot) -> bool {
        self.tag == element.tag.to_lowercase() && self.classes == element.classes
    }

    /// Structural similarity in [0, 1]
    ///
    /// Tag, class-list equality, and truncated-text equality
    /// contribute fixed weights 0.3 / 0.4 / 0.3.
    pub fn similarity(&self, element: &ElementSnapshot) -> f32 {
        let mut score: f32 = 0.0;
        if self.tag == element.tag.to_lowercase() {
            score += 0.3;
        }
        if self.classes == element.classes {
            score += 0.4;
        }
        if self.text_prefix == truncate(&element.text, TEXT_PREFIX_LEN) {
            score += 0.3;
        }
        score.min(1.0)
    }
}

fn truncate(text: &str, len: usize) -> String {
    text.chars().take(len).collect()
}

/// One click observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickSample {
    /// Signature of the clicked element
    pub signature: ElementSignature,
    /// Page-relative x coordinate
    pub x: f64,
    /// Page-relative y coordinate
    pub y: f64,
    /// Capture time in milliseconds
    pub timestamp_ms: u64,
}

/// One dwelled hover observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoverSample {
    /// Signature of the hovered element
    pub signature: ElementSignature,
    /// Link target, if the element is a link
    pub href: Option<String>,
    /// Capture time in milliseconds
    pub timestamp_ms: u64,
}

/// One page-to-page transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationSample {
    /// Page navigated from
    pub from_url: String,
    /// Page navigated to
    pub to_url: String,
    /// Capture time in milliseconds
    pub timestamp_ms: u64,
}

/// One page-visibility change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibilitySample {
    /// Whether the page became visible
    pub visible: bool,
    /// Capture time in milliseconds
    pub timestamp_ms: u64,
}

/// Bounded ordered histories, one per event kind
#[derive(Debug, Default)]
pub struct BehaviorHistory {
    scrolls: VecDeque<ScrollSample>,
    clicks: VecDeque<ClickSample>,
    hovers: VecDeque<HoverSample>,
    navigations: VecDeque<NavigationSample>,
    visibility: VecDeque<VisibilitySample>,
}

impl BehaviorHistory {
    /// Create empty histories
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scroll sample, deriving kinematics from the previous one
    pub fn push_scroll(&mut self, y: f64, timestamp_ms: u64) -> ScrollSample {
        let (velocity, acceleration) = match self.scrolls.back() {
            Some(prev) if timestamp_ms > prev.timestamp_ms => {
                let dt = (timestamp_ms - prev.timestamp_ms) as f64;
                let velocity = (y - prev.y) / dt;
                (velocity, (velocity - prev.velocity) / dt)
            }
            _ => (0.0, 0.0),
        };

        let sample = ScrollSample {
            y,
            timestamp_ms,
            velocity,
            acceleration,
        };
        push_bounded(&mut self.scrolls, sample, SCROLL_HISTORY_CAP);
        sample
    }

    /// Append a click sample
    pub fn push_click(&mut self, sample: ClickSample) {
        push_bounded(&mut self.clicks, sample, EVENT_HISTORY_CAP);
    }

    /// Append a dwelled hover sample
    pub fn push_hover(&mut self, sample: HoverSample) {
        push_bounded(&mut self.hovers, sample, EVENT_HISTORY_CAP);
    }

    /// Append a navigation sample
    pub fn push_navigation(&mut self, sample: NavigationSample) {
        push_bounded(&mut self.navigations, sample, EVENT_HISTORY_CAP);
    }

    /// Append a visibility sample
    pub fn push_visibility(&mut self, sample: VisibilitySample) {
        push_bounded(&mut self.visibility, sample, EVENT_HISTORY_CAP);
    }

    /// The most recent `count` scroll samples, oldest first
    pub fn recent_scrolls(&self, count: usize) -> Vec<ScrollSample> {
        let skip = self.scrolls.len().saturating_sub(count);
        self.scrolls.iter().skip(skip).copied().collect()
    }

    /// The most recent `count` clicks, oldest first
    pub fn recent_clicks(&self, count: usize) -> Vec<ClickSample> {
        let skip = self.clicks.len().saturating_sub(count);
        self.clicks.iter().skip(skip).cloned().collect()
    }

    /// The most recent navigation, if any
    pub fn last_navigation(&self) -> Option<&NavigationSample> {
        self.navigations.back()
    }

    /// The most recent scroll, if any
    pub fn last_scroll(&self) -> Option<&ScrollSample> {
        self.scrolls.back()
    }

    /// Whether the page is currently visible (defaults to true)
    pub fn page_visible(&self) -> bool {
        self.visibility.back().map(|s| s.visible).unwrap_or(true)
    }

    /// Sample counts per kind: (scroll, click, hover, navigation, visibility)
    pub fn counts(&self) -> (usize, usize, usize, usize, usize) {
        (
            self.scrolls.len(),
            self.clicks.len(),
            self.hovers.len(),
            self.navigations.len(),
            self.visibility.len(),
        )
    }

    /// Drop all histories
    pub fn clear(&mut self) {
        self.scrolls.clear();
        self.clicks.clear();
        self.hovers.clear();
        self.navigations.clear();
        self.visibility.clear();
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, cap: usize) {
    queue.push_back(item);
    while queue.len() > cap {
        queue.pop_front();
    }
}
