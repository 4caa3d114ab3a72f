//! Bounded prefetch scheduler
//!
//! A priority-ordered queue with admission control: items are
//! admitted strictly in priority order while concurrency and byte
//! budgets allow, each admission issues the kind-specific resource
//! hint, and every finished fetch immediately tries to admit the next
//! queued item (work-conserving, not purely cycle-driven).

use crate::RankedCandidate;
use dashmap::DashMap;
use foresight_core::{
    Candidate, FetchResult, HintSink, ModelKind, PrefetchError, ResourceKind, Settings,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum queued items; overflow is dropped with a warning
    pub max_queue: usize,
    /// Maximum retained preload records
    pub max_records: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_queue: 128,
            max_records: 512,
        }
    }
}

/// An entry owned by the scheduler's queue
#[derive(Debug, Clone)]
pub struct QueueItem {
    /// The prediction to act on
    pub candidate: Candidate,
    /// Priority computed by the aggregator
    pub priority: f32,
    /// Enqueue time in milliseconds
    pub enqueued_at_ms: u64,
}

/// Record of one prefetch, created at fetch start and terminal once
/// completed
#[derive(Debug, Clone)]
pub struct PreloadRecord {
    /// Resource URL
    pub url: String,
    /// Resource kind
    pub kind: ResourceKind,
    /// Model that proposed the fetch
    pub origin: ModelKind,
    /// Fetch start in milliseconds
    pub started_at_ms: u64,
    /// Fetch completion in milliseconds; always >= started_at_ms
    pub completed_at_ms: Option<u64>,
    /// Whether the fetch completed successfully
    pub success: bool,
    /// Transfer size in bytes
    pub byte_size: u64,
}

impl PreloadRecord {
    /// Whether the fetch has settled
    pub fn is_complete(&self) -> bool {
        self.completed_at_ms.is_some()
    }
}

/// Scheduler statistics
#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    /// Items waiting in the queue
    pub queued: usize,
    /// Fetches in flight
    pub active: usize,
    /// Fetches completed successfully
    pub completed: u64,
    /// Fetches that failed
    pub failed: u64,
    /// Items dropped for exceeding the byte budget
    pub skipped_too_large: u64,
}

/// Priority queue plus concurrency/size budget
pub struct PrefetchScheduler {
    config: SchedulerConfig,
    queue: Mutex<VecDeque<QueueItem>>,
    /// URLs currently fetching; a URL appears here at most once
    active: Mutex<HashSet<String>>,
    active_count: AtomicUsize,
    /// Session records keyed by URL
    records: DashMap<String, PreloadRecord>,
    paused: AtomicBool,
    sink: Arc<dyn HintSink>,
    settings: Arc<RwLock<Settings>>,
    completed: AtomicU64,
    failed: AtomicU64,
    skipped_too_large: AtomicU64,
}

impl PrefetchScheduler {
    /// Create a scheduler issuing hints through `sink`
    pub fn new(
        config: SchedulerConfig,
        sink: Arc<dyn HintSink>,
        settings: Arc<RwLock<Settings>>,
    ) -> Self {
        Self {
            config,
            queue: Mutex::new(VecDeque::new()),
            active: Mutex::new(HashSet::new()),
            active_count: AtomicUsize::new(0),
            records: DashMap::new(),
            paused: AtomicBool::new(false),
            sink,
            settings,
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped_too_large: AtomicU64::new(0),
        }
    }

    /// Insert a ranked candidate, maintaining descending priority
    ///
    /// Scans from the head and inserts before the first lower-priority
    /// item, so equal priorities keep arrival order. A URL already
    /// queued, in flight, or recorded this session is never enqueued
    /// twice.
    pub fn enqueue(&self, ranked: RankedCandidate, now_ms: u64) -> bool {
        let url = &ranked.candidate.url;

        if self.records.contains_key(url) {
            debug!(%url, "already recorded this session, not enqueued");
            return false;
        }
        if self.active.lock().unwrap().contains(url) {
            debug!(%url, "already in flight, not enqueued");
            return false;
        }

        let mut queue = self.queue.lock().unwrap();
        if queue.iter().any(|item| &item.candidate.url == url) {
            return false;
        }
        if queue.len() >= self.config.max_queue {
            warn!(%url, error = %PrefetchError::QueueFull, "dropping candidate");
            return false;
        }

        let item = QueueItem {
            candidate: ranked.candidate,
            priority: ranked.priority,
            enqueued_at_ms: now_ms,
        };
        let position = queue
            .iter()
            .position(|existing| existing.priority < item.priority)
            .unwrap_or(queue.len());
        queue.insert(position, item);
        true
    }

    /// Enqueue a batch of ranked candidates
    pub fn enqueue_many(
        &self,
        ranked: impl IntoIterator<Item = RankedCandidate>,
        now_ms: u64,
    ) -> usize {
        ranked
            .into_iter()
            .filter(|item| self.enqueue(item.clone(), now_ms))
            .count()
    }

    /// Admit queued items while budgets allow
    ///
    /// Runs once per prediction cycle and again after every fetch
    /// completion. Admission order is strictly queue order; items over
    /// the byte budget are discarded with a logged skip, not retried.
    pub fn drain(self: &Arc<Self>) {
        loop {
            if self.paused.load(Ordering::Relaxed) {
                return;
            }
            let settings = *self.settings.read().unwrap();

            // Reserve the slot before popping; drains run concurrently
            // (prediction ticks and completion tasks) and a plain
            // check-then-increment could admit past the budget.
            let reserved = self.active_count.fetch_update(
                Ordering::Relaxed,
                Ordering::Relaxed,
                |active| (active < settings.max_concurrent_prefetches).then_some(active + 1),
            );
            if reserved.is_err() {
                return;
            }

            let Some(item) = self.queue.lock().unwrap().pop_front() else {
                self.active_count.fetch_sub(1, Ordering::Relaxed);
                return;
            };

            if let Some(size) = item.candidate.estimated_bytes {
                if size > settings.max_resource_bytes {
                    let error = PrefetchError::ResourceTooLarge {
                        url: item.candidate.url.clone(),
                        size,
                        limit: settings.max_resource_bytes,
                    };
                    warn!(%error, "skipping over-budget prefetch");
                    self.skipped_too_large.fetch_add(1, Ordering::Relaxed);
                    self.active_count.fetch_sub(1, Ordering::Relaxed);
                    continue;
                }
            }

            self.admit(item);
        }
    }

    /// Open a record and spawn the fetch for one admitted item
    ///
    /// The caller has already reserved the concurrency slot.
    fn admit(self: &Arc<Self>, item: QueueItem) {
        let url = item.candidate.url.clone();
        let kind = item.candidate.kind;

        {
            let mut active = self.active.lock().unwrap();
            if !active.insert(url.clone()) {
                // Lost a race with an identical URL; give the slot back
                self.active_count.fetch_sub(1, Ordering::Relaxed);
                return;
            }
        }

        self.bound_records();
        self.records.insert(
            url.clone(),
            PreloadRecord {
                url: url.clone(),
                kind,
                origin: item.candidate.origin,
                started_at_ms: now_ms(),
                completed_at_ms: None,
                success: false,
                byte_size: 0,
            },
        );

        debug!(%url, kind = kind.hint_as(), priority = item.priority, "admitted prefetch");

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let result = match kind {
                ResourceKind::Navigation => {
                    scheduler.sink.warm_connection(&url);
                    scheduler.sink.issue_prefetch(&url).await
                }
                _ => scheduler.sink.issue_preload(&url, kind).await,
            };
            scheduler.finish(&url, result);
            // Work-conserving: a freed slot immediately admits the
            // next queued item.
            scheduler.drain();
        });
    }

    /// Close the record for a settled fetch and release its slot
    fn finish(&self, url: &str, result: FetchResult) {
        if let Some(mut record) = self.records.get_mut(url) {
            record.completed_at_ms = Some(now_ms().max(record.started_at_ms));
            match &result {
                FetchResult::Completed { bytes } => {
                    record.success = true;
                    record.byte_size = *bytes;
                }
                FetchResult::Failed { reason } => {
                    record.success = false;
                    info!(%url, reason, "prefetch failed, recorded as miss");
                }
            }
        }

        match result {
            FetchResult::Completed { .. } => self.completed.fetch_add(1, Ordering::Relaxed),
            FetchResult::Failed { .. } => self.failed.fetch_add(1, Ordering::Relaxed),
        };

        self.active.lock().unwrap().remove(url);
        self.active_count.fetch_sub(1, Ordering::Relaxed);
    }

    /// Evict the oldest completed record once the map is at capacity
    fn bound_records(&self) {
        if self.records.len() < self.config.max_records {
            return;
        }
        let oldest = self
            .records
            .iter()
            .filter(|r| r.is_complete())
            .min_by_key(|r| r.started_at_ms)
            .map(|r| r.url.clone());
        if let Some(url) = oldest {
            self.records.remove(&url);
        }
    }

    /// Pause admission (network loss); in-flight fetches complete
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::Relaxed) {
            info!("prefetch admission paused");
        }
    }

    /// Resume admission and drain immediately
    pub fn resume(self: &Arc<Self>) {
        if self.paused.swap(false, Ordering::Relaxed) {
            info!("prefetch admission resumed");
        }
        self.drain();
    }

    /// Whether admission is paused
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// URLs already preloaded or currently loading, for dedupe weighting
    pub fn known_urls(&self) -> HashSet<String> {
        let mut known: HashSet<String> =
            self.records.iter().map(|r| r.url.clone()).collect();
        known.extend(self.active.lock().unwrap().iter().cloned());
        known
    }

    /// Snapshot of a record by URL
    pub fn record(&self, url: &str) -> Option<PreloadRecord> {
        self.records.get(url).map(|r| r.clone())
    }

    /// Snapshot of all session records
    pub fn records(&self) -> Vec<PreloadRecord> {
        self.records.iter().map(|r| r.clone()).collect()
    }

    /// Fetches currently in flight
    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }

    /// Items waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Scheduler statistics
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            queued: self.queue_len(),
            active: self.active_count(),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped_too_large: self.skipped_too_large.load(Ordering::Relaxed),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
