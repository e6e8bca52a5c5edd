//! Decayed success estimator.

use serde::{Deserialize, Serialize};

use super::window::Window;

/// Decayed estimate of probe success over one window.
///
/// `reliability` and `weight` stay in `[0, 1]`; `count` is the decayed
/// number of observations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityStat {
    reliability: f64,
    weight: f64,
    count: f64,
}

impl ReliabilityStat {
    /// Blend in one outcome observed `age_secs` after the previous one.
    pub fn update(&mut self, success: bool, age_secs: u64, window_secs: u64) {
        let decay = if window_secs == 0 {
            0.0
        } else {
            (-(age_secs as f64) / window_secs as f64).exp().clamp(0.0, 1.0)
        };
        let sample = if success { 1.0 } else { 0.0 };

        self.reliability = (self.reliability * decay + sample * (1.0 - decay)).min(1.0);
        self.weight = (self.weight * decay + (1.0 - decay)).min(1.0);
        self.count = self.count * decay + 1.0;
    }

    pub fn reliability(&self) -> f64 {
        self.reliability
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    /// Reliability with missing weight counted as success.
    ///
    /// Low only when the evidence both exists and is bad, which is what the
    /// ban and ignore rules compare against.
    pub fn optimistic_reliability(&self) -> f64 {
        self.reliability + 1.0 - self.weight
    }
}

/// The five windowed statistics of one address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityStats {
    stats: [ReliabilityStat; 5],
}

impl ReliabilityStats {
    /// Update every window with the same outcome.
    pub fn update_all(&mut self, success: bool, age_secs: u64) {
        for window in Window::ALL {
            self.stats[window.index()].update(success, age_secs, window.secs());
        }
    }

    /// Statistic for one window.
    pub fn get(&self, window: Window) -> &ReliabilityStat {
        &self.stats[window.index()]
    }

    /// Reliability of every window, shortest first.
    pub fn reliabilities(&self) -> [f64; 5] {
        self.stats.map(|s| s.reliability)
    }
}
