//! Classification thresholds.
//!
//! The rule shapes are fixed; every number is configuration.

use serde::{Deserialize, Serialize};

use crate::domain::reliability::Window;

/// Good when `reliability > min_reliability` and `count > min_count` in `window`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoodRule {
    pub window: Window,
    pub min_reliability: f64,
    pub min_count: f64,
}

/// Ban for `ban_secs` when the optimistic reliability in `window` is below
/// `max_score` with more than `min_count` observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BanRule {
    pub window: Window,
    pub max_score: f64,
    pub min_count: f64,
    pub ban_secs: u64,
}

/// Skip re-probing for `ignore_secs` under the same test as `BanRule`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IgnoreRule {
    pub window: Window,
    pub max_score: f64,
    pub min_count: f64,
    pub ignore_secs: u64,
}

/// Store policy: classification thresholds and retry pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Records probed at most this many times are judged on raw counts.
    pub small_sample_max_total: u32,
    /// Any one of these makes a record good.
    pub good_rules: Vec<GoodRule>,
    /// First matching rule gives the terrible-ban duration.
    pub ban_rules: Vec<BanRule>,
    /// First matching rule gives the ignore cooldown.
    pub ignore_rules: Vec<IgnoreRule>,
    /// Minimum seconds between two probes of the same tracked record.
    pub min_retry_secs: u64,
    /// Suggested wait when there is nothing to probe.
    pub empty_retry_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            small_sample_max_total: 3,
            good_rules: vec![
                GoodRule { window: Window::TwoHours, min_reliability: 0.85, min_count: 2.0 },
                GoodRule { window: Window::EightHours, min_reliability: 0.70, min_count: 4.0 },
                GoodRule { window: Window::OneDay, min_reliability: 0.55, min_count: 8.0 },
                GoodRule { window: Window::OneWeek, min_reliability: 0.45, min_count: 16.0 },
                GoodRule { window: Window::OneMonth, min_reliability: 0.35, min_count: 32.0 },
            ],
            ban_rules: vec![
                BanRule { window: Window::OneMonth, max_score: 0.15, min_count: 32.0, ban_secs: 30 * 86400 },
                BanRule { window: Window::OneWeek, max_score: 0.10, min_count: 16.0, ban_secs: 7 * 86400 },
            ],
            ignore_rules: vec![
                IgnoreRule { window: Window::OneMonth, max_score: 0.20, min_count: 2.0, ignore_secs: 10 * 86400 },
                IgnoreRule { window: Window::OneWeek, max_score: 0.16, min_count: 1.0, ignore_secs: 3 * 86400 },
                IgnoreRule { window: Window::OneDay, max_score: 0.12, min_count: 1.0, ignore_secs: 8 * 3600 },
                IgnoreRule { window: Window::EightHours, max_score: 0.08, min_count: 1.0, ignore_secs: 2 * 3600 },
            ],
            min_retry_secs: 1000,
            empty_retry_secs: 5,
        }
    }
}

impl PolicyConfig {
    /// No retry spacing, so tests can re-select immediately.
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            min_retry_secs: 0,
            ..Self::default()
        }
    }
}
