//! # Reliability Statistics
//!
//! A continuous-time exponential moving average of probe outcomes. Each
//! address carries five of them over windows from two hours to a month, so
//! short windows react to flapping nodes while long ones smooth out blips.

mod stat;
mod window;

pub use stat::{ReliabilityStat, ReliabilityStats};
pub use window::Window;
