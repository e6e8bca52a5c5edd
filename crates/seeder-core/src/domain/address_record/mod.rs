//! # Address Record
//!
//! Per-endpoint crawl state: what the network told us about a peer, what our
//! own probes found, and the five reliability statistics that decide whether
//! it is handed out, left alone for a while, or banned.

mod policy;
mod record;

pub use policy::{BanRule, GoodRule, IgnoreRule, PolicyConfig};
pub use record::AddressRecord;
