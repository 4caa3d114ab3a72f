//! Outcome tracking and the learning loop
//!
//! Joins preload records against observed resource uses to classify
//! each prefetch as a hit or a miss, nudges per-model priority
//! weights accordingly, and assembles the state persisted across
//! sessions.
//!
//! A prefetch counts as a hit only when the page later used the
//! resource, the use transferred zero bytes over the network, the
//! decoded size was positive, and the use came after the preload
//! started. Anything weaker is a miss.

use dashmap::DashMap;
use foresight_core::{ModelKind, PersistedState, PrefetchError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Lower clamp for a model's learned priority weight
pub const MODEL_WEIGHT_MIN: f32 = 0.5;
/// Upper clamp for a model's learned priority weight
pub const MODEL_WEIGHT_MAX: f32 = 1.5;
/// Per-outcome weight adjustment
pub const MODEL_WEIGHT_STEP: f32 = 0.05;

/// Maximum retained resource-use observations; oldest evicted first
const MAX_TRACKED_USES: usize = 1024;

/// Maximum remembered scored URLs, FIFO-evicted
///
/// Sized above the scheduler's record cap so an entry still matching
/// a live record is never the one evicted.
const MAX_SCORED: usize = 2048;

/// One observed use of a resource by the page
#[derive(Debug, Clone, Copy)]
struct ResourceUse {
    /// Bytes transferred over the network for this use
    transfer_size: u64,
    /// Decoded body size
    decoded_size: u64,
    /// When the use happened, in milliseconds
    timestamp_ms: u64,
}

impl ResourceUse {
    /// Whether this use was served from cache with real content
    fn is_cache_hit(&self) -> bool {
        self.transfer_size == 0 && self.decoded_size > 0
    }
}

/// Result of one scoring pass
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreSummary {
    /// Records classified during this pass
    pub newly_scored: usize,
    /// Session hits so far
    pub hits: u64,
    /// Session misses so far
    pub misses: u64,
    /// Session hit rate in [0, 1]; 0 when nothing has been scored
    pub hit_rate: f32,
}

/// URLs already classified, with insertion order kept for eviction
#[derive(Debug, Default)]
struct ScoredLedger {
    members: HashSet<String>,
    order: VecDeque<String>,
}

impl ScoredLedger {
    fn contains(&self, url: &str) -> bool {
        self.members.contains(url)
    }

    fn insert(&mut self, url: String) {
        if !self.members.insert(url.clone()) {
            return;
        }
        self.order.push_back(url);
        while self.order.len() > MAX_SCORED {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.members.len()
    }
}

/// Scores prefetch outcomes and maintains learned model weights
pub struct OutcomeTracker {
    uses: DashMap<String, ResourceUse>,
    /// URLs whose records have already been classified
    scored: Mutex<ScoredLedger>,
    hits: AtomicU64,
    misses: AtomicU64,
    lifetime_hits: AtomicU64,
    lifetime_misses: AtomicU64,
    model_weights: Mutex<HashMap<ModelKind, f32>>,
    persist_warned: AtomicBool,
}

impl OutcomeTracker {
    /// Create a tracker with neutral model weights
    pub fn new() -> Self {
        let weights = ModelKind::all().iter().map(|&k| (k, 1.0)).collect();
        Self {
            uses: DashMap::new(),
            scored: Mutex::new(ScoredLedger::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            lifetime_hits: AtomicU64::new(0),
            lifetime_misses: AtomicU64::new(0),
            model_weights: Mutex::new(weights),
            persist_warned: AtomicBool::new(false),
        }
    }

    /// Absorb persisted counters and weights from a prior session
    pub fn warm_start(&self, state: &PersistedState) {
        self.lifetime_hits
            .store(state.lifetime_hits, Ordering::Relaxed);
        self.lifetime_misses
            .store(state.lifetime_misses, Ordering::Relaxed);

        let mut weights = self.model_weights.lock().unwrap();
        for (name, weight) in &state.model_weights {
            if let Some(&kind) = ModelKind::all().iter().find(|k| k.name() == name) {
                weights.insert(kind, weight.clamp(MODEL_WEIGHT_MIN, MODEL_WEIGHT_MAX));
            }
        }
    }

    /// Record a resource use from the page's timing data
    ///
    /// The first observation per URL wins; a later re-fetch of the
    /// same resource does not overwrite the use that decides the
    /// outcome.
    pub fn record_resource_use(
        &self,
        url: &str,
        transfer_size: u64,
        decoded_size: u64,
        timestamp_ms: u64,
    ) {
        if !self.uses.contains_key(url) && self.uses.len() >= MAX_TRACKED_USES {
            let oldest = self
                .uses
                .iter()
                .min_by_key(|entry| entry.value().timestamp_ms)
                .map(|entry| entry.key().clone());
            if let Some(key) = oldest {
                self.uses.remove(&key);
            }
        }
        self.uses.entry(url.to_string()).or_insert(ResourceUse {
            transfer_size,
            decoded_size,
            timestamp_ms,
        });
    }

    /// Classify completed preload records against observed uses
    ///
    /// Failed fetches score as misses immediately. A successful fetch
    /// with no observed use yet stays unscored and is re-examined on
    /// the next pass. Each record is scored at most once.
    pub fn score(&self, records: &[crate::PreloadRecord]) -> ScoreSummary {
        let mut newly_scored = 0usize;
        let mut scored = self.scored.lock().unwrap();

        for record in records {
            if !record.is_complete() || scored.contains(&record.url) {
                continue;
            }

            let outcome = if !record.success {
                Some(false)
            } else {
                match self.uses.get(&record.url) {
                    Some(used) => Some(
                        used.is_cache_hit() && used.timestamp_ms > record.started_at_ms,
                    ),
                    // Not used yet; the next pass may still see a hit
                    None => None,
                }
            };

            let Some(hit) = outcome else { continue };

            scored.insert(record.url.clone());
            newly_scored += 1;
            if hit {
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.lifetime_hits.fetch_add(1, Ordering::Relaxed);
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.lifetime_misses.fetch_add(1, Ordering::Relaxed);
            }
            self.adjust_weight(record.origin, hit);
            debug!(url = %record.url, model = record.origin.name(), hit, "prefetch scored");
        }

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        ScoreSummary {
            newly_scored,
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
        }
    }

    /// Nudge a model's weight after an outcome, within the clamp range
    fn adjust_weight(&self, kind: ModelKind, hit: bool) {
        let mut weights = self.model_weights.lock().unwrap();
        let weight = weights.entry(kind).or_insert(1.0);
        let step = if hit {
            MODEL_WEIGHT_STEP
        } else {
            -MODEL_WEIGHT_STEP
        };
        *weight = (*weight + step).clamp(MODEL_WEIGHT_MIN, MODEL_WEIGHT_MAX);
    }

    /// Session hit rate in [0, 1]
    pub fn hit_rate(&self) -> f32 {
        hit_rate(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Current learned model weights
    pub fn model_weights(&self) -> HashMap<ModelKind, f32> {
        self.model_weights.lock().unwrap().clone()
    }

    /// Assemble the state to persist for the next session
    pub fn persistable(
        &self,
        navigation_transitions: HashMap<String, HashMap<String, u32>>,
        resource_dependencies: HashMap<String, HashMap<String, u32>>,
    ) -> PersistedState {
        let model_weights = self
            .model_weights
            .lock()
            .unwrap()
            .iter()
            .map(|(kind, weight)| (kind.name().to_string(), *weight))
            .collect();
        PersistedState {
            navigation_transitions,
            resource_dependencies,
            model_weights,
            lifetime_hits: self.lifetime_hits.load(Ordering::Relaxed),
            lifetime_misses: self.lifetime_misses.load(Ordering::Relaxed),
        }
    }

    /// Log a persistence failure, warning only the first time
    ///
    /// Storage being unavailable degrades learning across sessions,
    /// nothing else; the engine keeps running on in-memory state.
    pub fn note_persist_failure(&self, error: &PrefetchError) {
        if !self.persist_warned.swap(true, Ordering::Relaxed) {
            warn!(%error, "history persistence unavailable, continuing in-memory");
        } else {
            debug!(%error, "history persistence still unavailable");
        }
    }
}

impl Default for OutcomeTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn hit_rate(hits: u64, misses: u64) -> f32 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f32 / total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PreloadRecord;
    use foresight_core::ResourceKind;

    fn record(url: &str, success: bool, started_at_ms: u64) -> PreloadRecord {
        PreloadRecord {
            url: url.to_string(),
            kind: ResourceKind::Image,
            origin: ModelKind::ScrollTrajectory,
            started_at_ms,
            completed_at_ms: Some(started_at_ms + 50),
            success,
            byte_size: if success { 1024 } else { 0 },
        }
    }

    #[test]
    fn test_cache_served_use_after_preload_is_hit() {
        let tracker = OutcomeTracker::new();
        tracker.record_resource_use("/hero.png", 0, 40_000, 2000);

        let summary = tracker.score(&[record("/hero.png", true, 1000)]);

        assert_eq!(summary.hits, 1);
        assert_eq!(summary.misses, 0);
    }

    #[test]
    fn test_network_served_use_is_miss() {
        let tracker = OutcomeTracker::new();
        // Transferred bytes: the prefetch did not warm the cache
        tracker.record_resource_use("/hero.png", 12_000, 40_000, 2000);

        let summary = tracker.score(&[record("/hero.png", true, 1000)]);

        assert_eq!(summary.hits, 0);
        assert_eq!(summary.misses, 1);
    }

    #[test]
    fn test_use_before_preload_is_miss() {
        let tracker = OutcomeTracker::new();
        tracker.record_resource_use("/hero.png", 0, 40_000, 500);

        let summary = tracker.score(&[record("/hero.png", true, 1000)]);

        assert_eq!(summary.misses, 1);
    }

    #[test]
    fn test_failed_fetch_is_immediate_miss() {
        let tracker = OutcomeTracker::new();

        let summary = tracker.score(&[record("/broken.js", false, 1000)]);

        assert_eq!(summary.newly_scored, 1);
        assert_eq!(summary.misses, 1);
    }

    #[test]
    fn test_unused_success_scored_on_later_pass() {
        let tracker = OutcomeTracker::new();
        let records = [record("/later.css", true, 1000)];

        // No use observed yet: stays unscored
        assert_eq!(tracker.score(&records).newly_scored, 0);

        tracker.record_resource_use("/later.css", 0, 8_000, 5000);
        let summary = tracker.score(&records);
        assert_eq!(summary.newly_scored, 1);
        assert_eq!(summary.hits, 1);
    }

    #[test]
    fn test_each_record_scored_once() {
        let tracker = OutcomeTracker::new();
        tracker.record_resource_use("/a.png", 0, 100, 2000);
        let records = [record("/a.png", true, 1000)];

        tracker.score(&records);
        let summary = tracker.score(&records);

        assert_eq!(summary.newly_scored, 0);
        assert_eq!(summary.hits, 1);
    }

    #[test]
    fn test_hit_rate_seven_of_ten() {
        let tracker = OutcomeTracker::new();
        let mut records = Vec::new();
        for i in 0..7 {
            let url = format!("/hit{i}");
            tracker.record_resource_use(&url, 0, 100, 2000);
            records.push(record(&url, true, 1000));
        }
        for i in 0..3 {
            records.push(record(&format!("/miss{i}"), false, 1000));
        }

        let summary = tracker.score(&records);

        assert_eq!(summary.newly_scored, 10);
        assert!((summary.hit_rate - 0.7).abs() < 1e-6);
        assert!((tracker.hit_rate() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_weights_nudged_and_clamped() {
        let tracker = OutcomeTracker::new();

        // 30 misses from one model: weight bottoms out at the clamp
        for i in 0..30 {
            tracker.score(&[record(&format!("/m{i}"), false, 1000)]);
        }

        let weights = tracker.model_weights();
        let weight = weights[&ModelKind::ScrollTrajectory];
        assert!((weight - MODEL_WEIGHT_MIN).abs() < 1e-6);
    }

    #[test]
    fn test_first_use_observation_wins() {
        let tracker = OutcomeTracker::new();
        tracker.record_resource_use("/a.png", 0, 100, 2000);
        // Later re-fetch over the network must not flip the outcome
        tracker.record_resource_use("/a.png", 5000, 100, 9000);

        let summary = tracker.score(&[record("/a.png", true, 1000)]);
        assert_eq!(summary.hits, 1);
    }

    #[test]
    fn test_use_observations_bounded() {
        let tracker = OutcomeTracker::new();

        for i in 0..(MAX_TRACKED_USES + 50) {
            tracker.record_resource_use(&format!("/r{i}"), 0, 1, i as u64);
        }

        assert_eq!(tracker.uses.len(), MAX_TRACKED_USES);
        // The oldest observations are the ones that aged out
        assert!(!tracker.uses.contains_key("/r0"));
        assert!(tracker
            .uses
            .contains_key(&format!("/r{}", MAX_TRACKED_USES + 49)));
    }

    #[test]
    fn test_scored_ledger_bounded() {
        let tracker = OutcomeTracker::new();

        for i in 0..(MAX_SCORED + 50) {
            tracker.score(&[record(&format!("/m{i}"), false, 1000)]);
        }

        assert_eq!(tracker.scored.lock().unwrap().len(), MAX_SCORED);
    }

    #[test]
    fn test_persist_round_trip_through_warm_start() {
        let tracker = OutcomeTracker::new();
        tracker.record_resource_use("/a.png", 0, 100, 2000);
        tracker.score(&[record("/a.png", true, 1000)]);

        let mut nav = HashMap::new();
        nav.entry("/".to_string())
            .or_insert_with(HashMap::new)
            .insert("/pricing".to_string(), 3);
        let state = tracker.persistable(nav, HashMap::new());
        assert_eq!(state.lifetime_hits, 1);

        let fresh = OutcomeTracker::new();
        fresh.warm_start(&state);
        let weights = fresh.model_weights();
        assert!((weights[&ModelKind::ScrollTrajectory] - 1.05).abs() < 1e-6);

        let next = fresh.persistable(HashMap::new(), HashMap::new());
        assert_eq!(next.lifetime_hits, 1);
    }
}
