//! Drought indicator core.
//!
//! The pipeline is synchronous and single-threaded: a caller resolves a
//! product name through the [`registry::Registry`], then drives the returned
//! indicator through `download()` and `process()`. Processing re-bases raw
//! source series onto the dekad calendar ([`align`]), resolves the requested
//! region against the source grid ([`resolve`]), derives the standardized
//! anomaly ([`anomaly`]) and persists one artifact per analysis key
//! ([`store`]). The combined indicator ([`cdi`]) runs three constituent
//! indicators and merges them into a categorical severity signal.

pub mod align;
pub mod anomaly;
pub mod cdi;
pub mod config;
pub mod gdo;
pub mod indicator;
pub mod registry;
pub mod resolve;
pub mod sma;
pub mod spi;
pub mod store;

pub use cdi::{classify, CdiIndicator, DroughtStatus};
pub use config::{AnalysisArgs, Backend, Config};
pub use indicator::DroughtIndicator;
pub use registry::{Product, Registry};
