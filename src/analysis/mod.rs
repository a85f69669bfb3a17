//! Analysis modules.
//!
//! Holiday counting and ranking over parsed provider data.

pub mod aggregator;

pub use aggregator::*;
