//! Predictive resource prefetching engine
//!
//! Observes user behavior, predicts which resources will be needed
//! next, and issues bounded, prioritized prefetch hints under a
//! confidence threshold and network budget. Outcomes feed back into
//! the models so accuracy improves over a session.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Prefetch Engine                         │
//! ├────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  scroll/click/hover ──> Behavior Observer                   │
//! │                              │                              │
//! │                              ↓  (1s prediction cycle)       │
//! │  4 models ──> Aggregator ──> Bounded Scheduler ──> hints    │
//! │      ↑            │  confidence gate    │ concurrency +     │
//! │      │            │  priority sort      │ byte budget       │
//! │      │            ↓                     ↓                   │
//! │      └── Outcome Tracker <── PreloadRecords                 │
//! │              (30s learning cycle, hit/miss, persistence)    │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single-threaded cooperative model: model inference, aggregation,
//! and priority sorting are synchronous within a tick; the only
//! suspension points are the fetches issued by the scheduler.
//!
//! All timestamps crossing the API are Unix epoch milliseconds; host
//! event times and internally sampled times share that one clock.

mod aggregator;
mod engine;
mod monitor;
mod observer;
mod outcome;
mod scheduler;

pub use aggregator::{PredictionAggregator, RankedCandidate, RankingContext};
pub use engine::{EngineConfig, EngineStats, PrefetchEngine};
pub use monitor::NetworkMonitor;
pub use observer::{BehaviorObserver, ObserverConfig};
pub use outcome::{
    OutcomeTracker, ScoreSummary, MODEL_WEIGHT_MAX, MODEL_WEIGHT_MIN, MODEL_WEIGHT_STEP,
};
pub use scheduler::{
    PrefetchScheduler, PreloadRecord, QueueItem, SchedulerConfig, SchedulerStats,
};

/// Prediction cycle interval in milliseconds
pub const PREDICTION_INTERVAL_MS: u64 = 1000;

/// Learning/persistence cycle interval in milliseconds
pub const LEARNING_INTERVAL_MS: u64 = 30_000;

/// Hover dwell before a hover becomes an intent signal, in milliseconds
pub const HOVER_DWELL_MS: u64 = 200;

/// Interaction silence after which the user is considered idle
pub const IDLE_AFTER_MS: u64 = 30_000;

/// Prelude for common imports
pub mod prelude {
    pub use super::{EngineConfig, PrefetchEngine, PrefetchScheduler};
    pub use foresight_core::prelude::*;
}
