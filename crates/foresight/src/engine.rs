//! Engine assembly and the two cycles
//!
//! Wires the observer, the four models, the aggregator, the scheduler,
//! and the outcome tracker together behind host-provided ports. Two
//! periodic cycles drive everything: a 1 s prediction cycle and a 30 s
//! learning cycle. Interaction events arrive between ticks and only
//! update state, except clicks, which also run an immediate prediction
//! pass.

use crate::{
    BehaviorObserver, NetworkMonitor, ObserverConfig, OutcomeTracker, PredictionAggregator,
    PrefetchScheduler, RankingContext, SchedulerConfig, SchedulerStats,
};
use foresight_core::{
    Candidate, ElementSnapshot, HintSink, HistoryStore, ModelKind, NetworkProbe, RenderingPort,
    ResourceKind, TelemetrySink, ViewportWindow,
};
use foresight_models::{
    ClickAffinityModel, LearnSample, ModelOutput, NavigationSequenceModel, PredictionInput,
    PredictionModel, ResourceDependencyModel, ScrollTrajectoryModel,
};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Scroll samples handed to the trajectory model per cycle
const SCROLL_INPUT_WINDOW: usize = 20;

/// Click samples handed to the affinity model per cycle
const CLICK_INPUT_WINDOW: usize = 10;

/// Base confidence of a dwelled hover over a link; structural
/// affinity to recent clicks scales it up toward 1.0
const HOVER_BASE_CONFIDENCE: f32 = 0.7;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Prediction cycle interval in milliseconds
    pub prediction_interval_ms: u64,
    /// Learning/persistence cycle interval in milliseconds
    pub learning_interval_ms: u64,
    /// Observer tuning
    pub observer: ObserverConfig,
    /// Scheduler tuning
    pub scheduler: SchedulerConfig,
    /// Interaction silence after which settings tighten
    pub idle_after_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prediction_interval_ms: crate::PREDICTION_INTERVAL_MS,
            learning_interval_ms: crate::LEARNING_INTERVAL_MS,
            observer: ObserverConfig::default(),
            scheduler: SchedulerConfig::default(),
            idle_after_ms: crate::IDLE_AFTER_MS,
        }
    }
}

/// Engine statistics
#[derive(Debug, Clone)]
pub struct EngineStats {
    /// Prediction cycles run
    pub predictions_run: u64,
    /// Candidates accepted into the queue
    pub candidates_enqueued: u64,
    /// Session hit rate in [0, 1]
    pub hit_rate: f32,
    /// Scheduler counters
    pub scheduler: SchedulerStats,
}

/// The assembled prefetch engine
///
/// All methods expect a tokio runtime context: admission spawns the
/// fetch tasks that resolve the host's hints.
///
/// Every timestamp, host-supplied or internally sampled, is Unix
/// epoch milliseconds. Outcome scoring compares host use-times
/// against internally stamped preload starts, so a host passing a
/// relative clock (a time-origin offset, for instance) would make
/// every use appear to predate its prefetch.
pub struct PrefetchEngine {
    config: EngineConfig,
    observer: Mutex<BehaviorObserver>,
    monitor: NetworkMonitor,
    aggregator: PredictionAggregator,
    scheduler: Arc<PrefetchScheduler>,
    outcome: OutcomeTracker,
    scroll_model: ScrollTrajectoryModel,
    click_model: ClickAffinityModel,
    navigation_model: Mutex<NavigationSequenceModel>,
    dependency_model: Mutex<ResourceDependencyModel>,
    rendering: Arc<dyn RenderingPort>,
    probe: Arc<dyn NetworkProbe>,
    store: Arc<dyn HistoryStore>,
    telemetry: Arc<dyn TelemetrySink>,
    current_url: Mutex<String>,
    loaded_resources: Mutex<Vec<String>>,
    last_loaded: Mutex<Option<String>>,
    predictions_run: AtomicU64,
    candidates_enqueued: AtomicU64,
}

impl PrefetchEngine {
    /// Assemble an engine over the host's ports
    pub fn new(
        config: EngineConfig,
        initial_url: &str,
        rendering: Arc<dyn RenderingPort>,
        probe: Arc<dyn NetworkProbe>,
        sink: Arc<dyn HintSink>,
        store: Arc<dyn HistoryStore>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        let monitor = NetworkMonitor::new(probe.snapshot(), config.idle_after_ms);
        let scheduler = Arc::new(PrefetchScheduler::new(
            config.scheduler.clone(),
            sink,
            monitor.settings_handle(),
        ));
        Self {
            observer: Mutex::new(BehaviorObserver::new(config.observer.clone())),
            monitor,
            aggregator: PredictionAggregator::new(),
            scheduler,
            outcome: OutcomeTracker::new(),
            scroll_model: ScrollTrajectoryModel::new(),
            click_model: ClickAffinityModel::new(),
            navigation_model: Mutex::new(NavigationSequenceModel::new()),
            dependency_model: Mutex::new(ResourceDependencyModel::new()),
            rendering,
            probe,
            store,
            telemetry,
            current_url: Mutex::new(initial_url.to_string()),
            loaded_resources: Mutex::new(Vec::new()),
            last_loaded: Mutex::new(None),
            predictions_run: AtomicU64::new(0),
            candidates_enqueued: AtomicU64::new(0),
            config,
        }
    }

    /// Load persisted pattern tables and counters, if available
    ///
    /// A missing or failing store is not an error; the engine starts
    /// cold and keeps learning in memory.
    pub async fn warm_start(&self) {
        match self.store.load().await {
            Ok(Some(state)) => {
                info!(
                    pages = state.navigation_transitions.len(),
                    resources = state.resource_dependencies.len(),
                    "warm-starting from persisted history"
                );
                *self.navigation_model.lock().unwrap() =
                    NavigationSequenceModel::from_table(state.navigation_transitions.clone());
                *self.dependency_model.lock().unwrap() =
                    ResourceDependencyModel::from_table(state.resource_dependencies.clone());
                self.outcome.warm_start(&state);
            }
            Ok(None) => debug!("no persisted history, starting cold"),
            Err(error) => self.outcome.note_persist_failure(&error),
        }
    }

    /// Run both cycles until the task is dropped
    pub async fn run(self: Arc<Self>) {
        self.warm_start().await;

        let mut predict =
            tokio::time::interval(Duration::from_millis(self.config.prediction_interval_ms));
        let mut learn =
            tokio::time::interval(Duration::from_millis(self.config.learning_interval_ms));
        loop {
            tokio::select! {
                _ = predict.tick() => self.prediction_tick(now_ms()),
                _ = learn.tick() => self.learning_tick().await,
            }
        }
    }

    /// One prediction cycle: observe, predict, rank, schedule
    ///
    /// Model inference, aggregation, and enqueueing are synchronous
    /// within the tick; only the issued fetches suspend.
    pub fn prediction_tick(&self, now_ms: u64) {
        {
            let observer = self.observer.lock().unwrap();
            if !observer.page_visible() {
                debug!("page hidden, prediction suspended");
                return;
            }
            // Idle means the user went quiet; a session with no
            // interactions yet stays on the active settings.
            if let Some(last_interaction) = observer.last_interaction_ms() {
                self.monitor.observe_idle(now_ms, last_interaction);
            }
        }
        if self.monitor.is_offline() {
            return;
        }

        let input = self.build_input(now_ms);
        let outputs = self.run_models(&input);

        let context = RankingContext {
            settings: self.monitor.settings(),
            profile: self.monitor.profile(),
            model_weights: self.outcome.model_weights(),
            known_urls: self.scheduler.known_urls(),
        };
        let ranked = self.aggregator.rank(outputs, &context);
        let enqueued = self.scheduler.enqueue_many(ranked, now_ms);

        self.predictions_run.fetch_add(1, Ordering::Relaxed);
        self.candidates_enqueued
            .fetch_add(enqueued as u64, Ordering::Relaxed);
        self.scheduler.drain();
    }

    /// One learning cycle: score outcomes, persist, report
    pub async fn learning_tick(&self) {
        let summary = self.outcome.score(&self.scheduler.records());
        if summary.newly_scored > 0 {
            info!(
                scored = summary.newly_scored,
                hit_rate = summary.hit_rate,
                "prefetch outcomes scored"
            );
        }

        let state = self.outcome.persistable(
            self.navigation_model.lock().unwrap().export(),
            self.dependency_model.lock().unwrap().export(),
        );
        if let Err(error) = self.store.save(&state).await {
            self.outcome.note_persist_failure(&error);
        }

        self.telemetry.report(
            "prefetch_cycle",
            serde_json::json!({
                "hits": summary.hits,
                "misses": summary.misses,
                "hit_rate": summary.hit_rate,
                "queued": self.scheduler.queue_len(),
            }),
        );
    }

    /// Snapshot the behavior state into one cycle's model input
    fn build_input(&self, now_ms: u64) -> PredictionInput {
        let viewport_height = self.rendering.viewport_height();
        let (scrolls, clicks, hovered, last_y) = {
            let mut observer = self.observer.lock().unwrap();
            let hovered = observer.dwelled_hover(now_ms);
            let history = observer.history();
            (
                history.recent_scrolls(SCROLL_INPUT_WINDOW),
                history.recent_clicks(CLICK_INPUT_WINDOW),
                hovered,
                history.last_scroll().map(|s| s.y).unwrap_or(0.0),
            )
        };

        // One rendering query per cycle, wide enough to cover the
        // current viewport and the extrapolated one in either scroll
        // direction.
        let mut top = last_y;
        let mut bottom = last_y + viewport_height * 2.0;
        if let Some(prediction) = self.scroll_model.extrapolate(&scrolls, viewport_height) {
            top = top.min(prediction.window.top);
            bottom = bottom.max(prediction.window.bottom);
        }
        let visible_elements = self
            .rendering
            .visible_elements(&ViewportWindow::new(top, bottom));

        PredictionInput {
            current_url: self.current_url.lock().unwrap().clone(),
            scrolls,
            clicks,
            hovered,
            visible_elements,
            loaded_resources: self.loaded_resources.lock().unwrap().clone(),
            viewport_height,
            timestamp_ms: now_ms,
        }
    }

    /// Run the four models plus the hover companion signal
    fn run_models(&self, input: &PredictionInput) -> Vec<ModelOutput> {
        let mut outputs = vec![
            self.scroll_model.predict(input),
            self.click_model.predict(input),
            self.navigation_model.lock().unwrap().predict(input),
            self.dependency_model.lock().unwrap().predict(input),
        ];
        if let Some(hover) = input.hovered.as_ref().and_then(|h| self.hover_output(input, h)) {
            outputs.push(hover);
        }
        outputs
    }

    /// A dwelled hover over a link is itself an intent signal
    fn hover_output(
        &self,
        input: &PredictionInput,
        hovered: &ElementSnapshot,
    ) -> Option<ModelOutput> {
        let href = hovered.href.as_ref()?;
        let affinity = self.click_model.hover_confidence(input, hovered);
        let confidence = HOVER_BASE_CONFIDENCE + (1.0 - HOVER_BASE_CONFIDENCE) * affinity;

        let mut candidates: SmallVec<[Candidate; 4]> = SmallVec::new();
        candidates.push(Candidate::new(
            href.clone(),
            ResourceKind::Navigation,
            confidence,
            ModelKind::ClickAffinity,
        ));
        for resource in &hovered.resources {
            candidates.push(Candidate::new(
                resource.url.clone(),
                resource.kind,
                confidence,
                ModelKind::ClickAffinity,
            ));
        }
        Some(ModelOutput {
            confidence,
            candidates,
        })
    }

    /// Scroll position changed
    pub fn on_scroll(&self, y: f64, timestamp_ms: u64) {
        self.observer.lock().unwrap().record_scroll(y, timestamp_ms);
        self.monitor.mark_interaction(timestamp_ms);
    }

    /// An element was clicked; runs an immediate prediction pass
    pub fn on_click(&self, target: &ElementSnapshot, x: f64, y: f64, timestamp_ms: u64) {
        let recorded = self
            .observer
            .lock()
            .unwrap()
            .record_click(target, x, y, timestamp_ms);
        self.monitor.mark_interaction(timestamp_ms);
        if recorded {
            self.prediction_tick(timestamp_ms);
        }
    }

    /// The pointer entered an element
    pub fn on_hover(&self, target: &ElementSnapshot, timestamp_ms: u64) {
        self.observer.lock().unwrap().record_hover(target, timestamp_ms);
        self.monitor.mark_interaction(timestamp_ms);
    }

    /// The pointer left the hovered element
    pub fn on_hover_exit(&self, timestamp_ms: u64) {
        self.observer.lock().unwrap().record_hover_exit(timestamp_ms);
    }

    /// The page navigated (full navigation or same-document route push)
    ///
    /// Learns the transition and resets the per-page resource state.
    pub fn on_navigation(&self, to_url: &str, timestamp_ms: u64) {
        let from_url = {
            let mut current = self.current_url.lock().unwrap();
            std::mem::replace(&mut *current, to_url.to_string())
        };
        self.observer
            .lock()
            .unwrap()
            .record_navigation(&from_url, to_url, timestamp_ms);
        self.navigation_model
            .lock()
            .unwrap()
            .learn(&LearnSample::Navigation {
                from: from_url,
                to: to_url.to_string(),
            });
        self.loaded_resources.lock().unwrap().clear();
        *self.last_loaded.lock().unwrap() = None;
        self.monitor.mark_interaction(timestamp_ms);
    }

    /// Page visibility changed
    pub fn on_visibility(&self, visible: bool, timestamp_ms: u64) {
        self.observer
            .lock()
            .unwrap()
            .record_visibility(visible, timestamp_ms);
        if visible {
            self.monitor.mark_interaction(timestamp_ms);
        }
    }

    /// Network conditions changed; re-reads the probe
    ///
    /// Going offline pauses admission; anything else resumes it under
    /// the recomputed profile.
    pub fn on_network_change(&self) {
        let context = self.probe.snapshot();
        self.monitor.on_change(context);
        if context.is_offline() {
            self.scheduler.pause();
        } else {
            self.scheduler.resume();
        }
    }

    /// The page finished loading a resource
    ///
    /// Consecutive loads become dependency observations.
    pub fn note_resource_loaded(&self, url: &str) {
        if url.is_empty() {
            return;
        }
        let previous = {
            let mut last = self.last_loaded.lock().unwrap();
            std::mem::replace(&mut *last, Some(url.to_string()))
        };
        if let Some(first) = previous {
            self.dependency_model
                .lock()
                .unwrap()
                .learn(&LearnSample::ResourceSequence {
                    first,
                    then: url.to_string(),
                });
        }
        self.loaded_resources.lock().unwrap().push(url.to_string());
    }

    /// Resource timing data for one use of a resource by the page
    ///
    /// `timestamp_ms` must be Unix epoch milliseconds, the clock the
    /// preload records are stamped with.
    pub fn on_resource_timing(
        &self,
        url: &str,
        transfer_size: u64,
        decoded_size: u64,
        timestamp_ms: u64,
    ) {
        self.outcome
            .record_resource_use(url, transfer_size, decoded_size, timestamp_ms);
    }

    /// The network monitor
    pub fn monitor(&self) -> &NetworkMonitor {
        &self.monitor
    }

    /// The prefetch scheduler
    pub fn scheduler(&self) -> &Arc<PrefetchScheduler> {
        &self.scheduler
    }

    /// Engine statistics
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            predictions_run: self.predictions_run.load(Ordering::Relaxed),
            candidates_enqueued: self.candidates_enqueued.load(Ordering::Relaxed),
            hit_rate: self.outcome.hit_rate(),
            scheduler: self.scheduler.stats(),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
