//! Network context snapshots and profile derivation

use crate::Settings;
use serde::{Deserialize, Serialize};

/// Coarse bandwidth classification of the current connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BandwidthClass {
    /// No connectivity; admission is paused until it returns
    Offline,
    /// 2G-class connection
    Low,
    /// 3G-class connection
    Medium,
    /// 4G and better
    High,
}

/// Snapshot of the current network conditions
///
/// Replaced wholesale on each network-change notification; read-only
/// to every component except the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkContext {
    /// Bandwidth classification
    pub bandwidth_class: BandwidthClass,
    /// Round-trip estimate in milliseconds
    pub round_trip_ms: u32,
    /// Whether the user requested reduced data usage
    pub save_data: bool,
}

impl NetworkContext {
    /// Create a snapshot
    pub fn new(bandwidth_class: BandwidthClass, round_trip_ms: u32, save_data: bool) -> Self {
        Self {
            bandwidth_class,
            round_trip_ms,
            save_data,
        }
    }

    /// Whether the connection is down
    pub fn is_offline(&self) -> bool {
        self.bandwidth_class == BandwidthClass::Offline
    }
}

impl Default for NetworkContext {
    fn default() -> Self {
        Self {
            bandwidth_class: BandwidthClass::High,
            round_trip_ms: 50,
            save_data: false,
        }
    }
}

/// Named prefetch profile derived from network conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkProfile {
    /// User asked for reduced data usage
    SaveData,
    /// Slow or absent connection
    Slow,
    /// Typical connection
    Balanced,
    /// Fast connection
    Fast,
}

impl NetworkProfile {
    /// Derive the profile for a context
    ///
    /// Total function of the snapshot; no hidden state. Save-data
    /// wins over everything else.
    pub fn for_context(context: &NetworkContext) -> Self {
        if context.save_data {
            return NetworkProfile::SaveData;
        }
        match context.bandwidth_class {
            BandwidthClass::Offline | BandwidthClass::Low => NetworkProfile::Slow,
            BandwidthClass::Medium => NetworkProfile::Balanced,
            BandwidthClass::High => NetworkProfile::Fast,
        }
    }

    /// Settings for this profile
    pub fn settings(&self) -> Settings {
        match self {
            NetworkProfile::SaveData => Settings::new(0.9, 1, 1024 * 1024),
            NetworkProfile::Slow => Settings::new(0.8, 1, 2 * 1024 * 1024),
            NetworkProfile::Balanced => Settings::new(0.7, 3, 5 * 1024 * 1024),
            NetworkProfile::Fast => Settings::new(0.6, 5, 10 * 1024 * 1024),
        }
    }

    /// Priority weight applied to candidates under this profile
    pub fn network_weight(&self) -> f32 {
        match self {
            NetworkProfile::Fast => 1.2,
            NetworkProfile::Slow | NetworkProfile::SaveData => 0.7,
            NetworkProfile::Balanced => 1.0,
        }
    }

    /// All profiles
    pub fn all() -> &'static [NetworkProfile] {
        &[
            NetworkProfile::SaveData,
            NetworkProfile::Slow,
            NetworkProfile::Balanced,
            NetworkProfile::Fast,
        ]
    }

    /// Short name for logging and telemetry payloads
    pub fn name(&self) -> &'static str {
        match self {
            NetworkProfile::SaveData => "save-data",
            NetworkProfile::Slow => "slow",
            NetworkProfile::Balanced => "balanced",
            NetworkProfile::Fast => "fast",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_derivation_is_deterministic() {
        let context = NetworkContext::new(BandwidthClass::Medium, 120, false);

        for _ in 0..10 {
            assert_eq!(
                NetworkProfile::for_context(&context),
                NetworkProfile::Balanced
            );
        }
    }

    #[test]
    fn test_save_data_wins_over_bandwidth() {
        // Even on a fast connection, save-data selects the strictest profile
        let context = NetworkContext::new(BandwidthClass::High, 20, true);
        let profile = NetworkProfile::for_context(&context);

        assert_eq!(profile, NetworkProfile::SaveData);

        let settings = profile.settings();
        assert_eq!(settings.confidence_threshold, 0.9);
        assert_eq!(settings.max_concurrent_prefetches, 1);
        assert_eq!(settings.max_resource_bytes, 1024 * 1024);
    }

    #[test]
    fn test_profile_settings_table() {
        assert_eq!(NetworkProfile::Slow.settings().confidence_threshold, 0.8);
        assert_eq!(NetworkProfile::Slow.settings().max_concurrent_prefetches, 1);

        assert_eq!(
            NetworkProfile::Balanced.settings().confidence_threshold,
            0.7
        );
        assert_eq!(
            NetworkProfile::Balanced.settings().max_concurrent_prefetches,
            3
        );

        assert_eq!(NetworkProfile::Fast.settings().confidence_threshold, 0.6);
        assert_eq!(NetworkProfile::Fast.settings().max_concurrent_prefetches, 5);
        assert_eq!(
            NetworkProfile::Fast.settings().max_resource_bytes,
            10 * 1024 * 1024
        );
    }

    #[test]
    fn test_offline_maps_to_slow() {
        let context = NetworkContext::new(BandwidthClass::Offline, 0, false);
        assert!(context.is_offline());
        assert_eq!(NetworkProfile::for_context(&context), NetworkProfile::Slow);
    }

    #[test]
    fn test_network_weights() {
        assert_eq!(NetworkProfile::Fast.network_weight(), 1.2);
        assert_eq!(NetworkProfile::Slow.network_weight(), 0.7);
        assert_eq!(NetworkProfile::SaveData.network_weight(), 0.7);
        assert_eq!(NetworkProfile::Balanced.network_weight(), 1.0);
    }

    #[test]
    fn test_all_profiles_satisfy_settings_invariants() {
        for profile in NetworkProfile::all() {
            let settings = profile.settings();
            assert!(settings.max_concurrent_prefetches >= 1);
            assert!((0.0..=1.0).contains(&settings.confidence_threshold));
        }
    }
}
