//! Analysis modules.
//!
//! Flattening of key-point results, the join with source records, and
//! the counts and mention statistics behind each chart.

pub mod aggregator;
pub mod flatten;
pub mod mentions;

pub use aggregator::*;
pub use flatten::flatten;
pub use mentions::{build_mention_index, top_concepts};
