//! Network context monitor
//!
//! Sole owner of the engine's `Settings`: every change flows through
//! a profile recomputation here, so readers always see a consistent
//! snapshot derived from one `NetworkContext` plus the attention
//! state.

use foresight_core::{AttentionState, NetworkContext, NetworkProfile, Settings};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Tracks network conditions and derives the active settings profile
pub struct NetworkMonitor {
    context: RwLock<NetworkContext>,
    profile: RwLock<NetworkProfile>,
    attention: RwLock<AttentionState>,
    settings: Arc<RwLock<Settings>>,
    idle_after_ms: u64,
}

impl NetworkMonitor {
    /// Create a monitor from an initial snapshot
    pub fn new(context: NetworkContext, idle_after_ms: u64) -> Self {
        let profile = NetworkProfile::for_context(&context);
        Self {
            context: RwLock::new(context),
            profile: RwLock::new(profile),
            attention: RwLock::new(AttentionState::Active),
            settings: Arc::new(RwLock::new(profile.settings())),
            idle_after_ms,
        }
    }

    /// Handle to the settings snapshot shared with readers
    pub fn settings_handle(&self) -> Arc<RwLock<Settings>> {
        self.settings.clone()
    }

    /// Current settings snapshot
    pub fn settings(&self) -> Settings {
        *self.settings.read().unwrap()
    }

    /// Current profile
    pub fn profile(&self) -> NetworkProfile {
        *self.profile.read().unwrap()
    }

    /// Current attention state
    pub fn attention(&self) -> AttentionState {
        *self.attention.read().unwrap()
    }

    /// Whether the connection is down
    pub fn is_offline(&self) -> bool {
        self.context
            .read()
            .unwrap()
            .is_offline()
    }

    /// Apply a network-change notification
    ///
    /// The context is replaced wholesale and the profile recomputed;
    /// returns the newly selected profile.
    pub fn on_change(&self, context: NetworkContext) -> NetworkProfile {
        let profile = NetworkProfile::for_context(&context);
        *self.context.write().unwrap() = context;

        let previous = {
            let mut current = self.profile.write().unwrap();
            std::mem::replace(&mut *current, profile)
        };
        if previous != profile {
            info!(from = previous.name(), to = profile.name(), "network profile changed");
        }
        self.apply();
        profile
    }

    /// Note a user interaction at `timestamp_ms`
    pub fn mark_interaction(&self, _timestamp_ms: u64) {
        let was_idle = {
            let mut attention = self.attention.write().unwrap();
            std::mem::replace(&mut *attention, AttentionState::Active) == AttentionState::Idle
        };
        if was_idle {
            debug!("user active again, restoring profile settings");
            self.apply();
        }
    }

    /// Re-evaluate the idle heuristic
    ///
    /// Call once per prediction cycle with the current time and the
    /// observer's last-interaction time.
    pub fn observe_idle(&self, now_ms: u64, last_interaction_ms: u64) {
        if now_ms.saturating_sub(last_interaction_ms) < self.idle_after_ms {
            return;
        }
        let became_idle = {
            let mut attention = self.attention.write().unwrap();
            std::mem::replace(&mut *attention, AttentionState::Idle) == AttentionState::Active
        };
        if became_idle {
            debug!("no interaction for {} ms, tightening settings", self.idle_after_ms);
            self.apply();
        }
    }

    /// Recompute the settings snapshot from profile + attention
    fn apply(&self) {
        let base = self.profile().settings();
        let settings = match self.attention() {
            AttentionState::Active => base,
            AttentionState::Idle => base.for_idle(),
        };
        *self.settings.write().unwrap() = settings;
    }
}
