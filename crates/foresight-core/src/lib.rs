//! Core types for predictive resource prefetching
//!
//! This crate defines the shared data model of the engine:
//! - Resource and candidate-prediction types
//! - Network context snapshots and the profile derivation
//! - Adaptive settings (confidence threshold, concurrency, byte budget)
//! - The narrow ports through which the engine talks to its host
//!   (rendering queries, network probe, persistence, resource hints,
//!   telemetry)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Host page                          │
//! │  RenderingPort   NetworkProbe   HistoryStore   HintSink   │
//! └───────┬──────────────┬──────────────┬────────────┬───────┘
//!         │              │              │            │
//!         ↓              ↓              ↓            ↓
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Prefetching engine                      │
//! │   observe ──> predict ──> prioritize ──> schedule ──┐     │
//! │      ↑                                              │     │
//! │      └───────────── learn from outcomes <───────────┘     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is consumed by `foresight-models` and the
//! `foresight` engine crate.

mod error;
mod network;
mod ports;
mod settings;
mod types;

pub use error::{PrefetchError, Result};
pub use network::{BandwidthClass, NetworkContext, NetworkProfile};
pub use ports::{
    FetchResult, HintSink, HistoryStore, NetworkProbe, PersistedState, RenderingPort,
    TelemetrySink,
};
pub use settings::{AttentionState, Settings};
pub use types::{
    Bounds, Candidate, ElementSnapshot, ModelKind, ResourceKind, ResourceRef, ViewportWindow,
};

/// Priority weight applied to candidates flagged as critical
pub const CRITICAL_WEIGHT: f32 = 2.0;

/// Priority weight applied to resources already preloaded or in flight
pub const DEDUPE_WEIGHT: f32 = 0.1;

/// Prelude for common imports
pub mod prelude {
    pub use super::{
        Candidate, ElementSnapshot, NetworkContext, NetworkProfile, PrefetchError, ResourceKind,
        Result, Settings,
    };
}
