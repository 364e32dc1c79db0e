//! Pure, deterministic logic: parsing, ranking, verdicts, loop state.
//!
//! Nothing in this tree performs I/O or talks to the network; everything is
//! testable in isolation.

pub mod feedback;
pub mod phase;
pub mod retrieval;
pub mod rule;
pub mod snapshot;
pub mod verdict;
