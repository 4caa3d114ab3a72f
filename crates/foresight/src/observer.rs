//! Behavior observer
//!
//! Normalizes raw interaction signals into typed behavior events at a
//! bounded rate. Malformed input (an element with no usable
//! signature) is simply not recorded; nothing here can fail.

use foresight_models::{
    BehaviorHistory, ClickSample, ElementSignature, HoverSample, NavigationSample, ScrollSample,
    VisibilitySample,
};
use foresight_core::ElementSnapshot;
use tracing::debug;

/// Observer configuration
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Minimum gap between recorded scroll samples (ms), ~60 Hz
    pub scroll_throttle_ms: u64,
    /// Hover dwell before promotion to an intent signal (ms)
    pub hover_dwell_ms: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            scroll_throttle_ms: 16,
            hover_dwell_ms: crate::HOVER_DWELL_MS,
        }
    }
}

/// A hover that has not yet dwelled long enough
#[derive(Debug, Clone)]
struct PendingHover {
    element: ElementSnapshot,
    signature: ElementSignature,
    started_at_ms: u64,
}

/// Converts raw interaction signals into bounded typed histories
#[derive(Debug)]
pub struct BehaviorObserver {
    config: ObserverConfig,
    history: BehaviorHistory,
    pending_hover: Option<PendingHover>,
    last_scroll_ms: Option<u64>,
    last_interaction_ms: Option<u64>,
}

impl BehaviorObserver {
    /// Create an observer
    pub fn new(config: ObserverConfig) -> Self {
        Self {
            config,
            history: BehaviorHistory::new(),
            pending_hover: None,
            last_scroll_ms: None,
            last_interaction_ms: None,
        }
    }

    /// Note an interaction; the recorded time never moves backwards
    fn touch(&mut self, timestamp_ms: u64) {
        self.last_interaction_ms =
            Some(self.last_interaction_ms.map_or(timestamp_ms, |t| t.max(timestamp_ms)));
    }

    /// Record a scroll position; throttled to ~60 samples/second
    ///
    /// Returns the recorded sample, or `None` when the sample fell
    /// inside the throttle window.
    pub fn record_scroll(&mut self, y: f64, timestamp_ms: u64) -> Option<ScrollSample> {
        if let Some(last) = self.last_scroll_ms {
            if timestamp_ms.saturating_sub(last) < self.config.scroll_throttle_ms {
                return None;
            }
        }
        self.last_scroll_ms = Some(timestamp_ms);
        self.touch(timestamp_ms);
        Some(self.history.push_scroll(y, timestamp_ms))
    }

    /// Record a click; triggers consumers synchronously on the same tick
    ///
    /// Returns false when the target carries nothing to match on.
    pub fn record_click(&mut self, target: &ElementSnapshot, x: f64, y: f64, timestamp_ms: u64) -> bool {
        let Some(signature) = ElementSignature::capture(target) else {
            debug!("click target has no usable signature, not recorded");
            return false;
        };
        self.touch(timestamp_ms);
        self.history.push_click(ClickSample {
            signature,
            x,
            y,
            timestamp_ms,
        });
        true
    }

    /// Record a hover start; promoted only after the dwell threshold
    pub fn record_hover(&mut self, target: &ElementSnapshot, timestamp_ms: u64) {
        let Some(signature) = ElementSignature::capture(target) else {
            return;
        };
        self.touch(timestamp_ms);
        self.pending_hover = Some(PendingHover {
            element: target.clone(),
            signature,
            started_at_ms: timestamp_ms,
        });
    }

    /// Record a hover exit; an undwelled hover is discarded
    pub fn record_hover_exit(&mut self, timestamp_ms: u64) {
        self.touch(timestamp_ms);
        self.pending_hover = None;
    }

    /// Promote the pending hover if it has dwelled long enough
    ///
    /// The promoted element is appended to the hover history and
    /// returned for an immediate prediction pass.
    pub fn dwelled_hover(&mut self, now_ms: u64) -> Option<ElementSnapshot> {
        let dwelled = self
            .pending_hover
            .as_ref()
            .map(|p| now_ms.saturating_sub(p.started_at_ms) >= self.config.hover_dwell_ms)
            .unwrap_or(false);
        if !dwelled {
            return None;
        }
        let pending = self.pending_hover.take()?;
        self.history.push_hover(HoverSample {
            signature: pending.signature,
            href: pending.element.href.clone(),
            timestamp_ms: now_ms,
        });
        Some(pending.element)
    }

    /// Record a navigation intent (same-document route change or full
    /// navigation)
    pub fn record_navigation(&mut self, from_url: &str, to_url: &str, timestamp_ms: u64) {
        if from_url.is_empty() || to_url.is_empty() {
            return;
        }
        self.touch(timestamp_ms);
        self.history.push_navigation(NavigationSample {
            from_url: from_url.to_string(),
            to_url: to_url.to_string(),
            timestamp_ms,
        });
    }

    /// Record a page-visibility change
    pub fn record_visibility(&mut self, visible: bool, timestamp_ms: u64) {
        if visible {
            self.touch(timestamp_ms);
        }
        self.history.push_visibility(VisibilitySample {
            visible,
            timestamp_ms,
        });
    }

    /// The behavior histories
    pub fn history(&self) -> &BehaviorHistory {
        &self.history
    }

    /// Time of the last interaction, or `None` before the first one
    ///
    /// A session with no interactions yet is not idle; idle means the
    /// user went quiet, not that they never arrived.
    pub fn last_interaction_ms(&self) -> Option<u64> {
        self.last_interaction_ms
    }

    /// Whether the page is currently visible
    pub fn page_visible(&self) -> bool {
        self.history.page_visible()
    }
}
