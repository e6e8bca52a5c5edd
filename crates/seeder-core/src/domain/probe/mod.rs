//! # Peer Probe
//!
//! One bounded connection attempt against a candidate: handshake, ask for
//! addresses, drain the answer. The state machine here does no I/O; a
//! driver (see `adapters::network::TcpProber`) feeds it socket events and
//! writes out what it queues.
//!
//! ```text
//! Connecting -> AwaitVersion -> AwaitVerack -> RequestingAddr -> Draining -> Done
//! ```

mod config;
mod machine;
mod outcome;

pub use config::ProbeConfig;
pub use machine::{ProbeMachine, ProbeState};
pub use outcome::{ProbeOutcome, ProbeReport, ProbeRequest};
