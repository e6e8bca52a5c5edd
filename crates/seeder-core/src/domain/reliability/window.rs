//! Statistic window lengths.

use serde::{Deserialize, Serialize};

/// One of the five fixed averaging windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "2h")]
    TwoHours,
    #[serde(rename = "8h")]
    EightHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1m")]
    OneMonth,
}

impl Window {
    /// All windows, shortest first.
    pub const ALL: [Window; 5] = [
        Window::TwoHours,
        Window::EightHours,
        Window::OneDay,
        Window::OneWeek,
        Window::OneMonth,
    ];

    /// Window length in seconds.
    pub const fn secs(self) -> u64 {
        match self {
            Window::TwoHours => 2 * 3600,
            Window::EightHours => 8 * 3600,
            Window::OneDay => 24 * 3600,
            Window::OneWeek => 7 * 24 * 3600,
            Window::OneMonth => 30 * 24 * 3600,
        }
    }

    /// Position in `ALL`.
    pub const fn index(self) -> usize {
        match self {
            Window::TwoHours => 0,
            Window::EightHours => 1,
            Window::OneDay => 2,
            Window::OneWeek => 3,
            Window::OneMonth => 4,
        }
    }

    /// Short label used in logs and dumps.
    pub const fn label(self) -> &'static str {
        match self {
            Window::TwoHours => "2h",
            Window::EightHours => "8h",
            Window::OneDay => "1d",
            Window::OneWeek => "1w",
            Window::OneMonth => "1m",
        }
    }
}
