//! Bounded fork-join worker teams.
//!
//! A [`Runtime`] owns a fixed team of worker threads and offers the four
//! capabilities the kernels rely on: a worker ceiling, nested regions up to a
//! configured depth, index-range work sharing, and concurrent task groups.

mod budget;
mod config;
mod error;
mod split;
mod team;

pub use budget::{NestedBudget, ThreadBudget};
pub use config::{RuntimeConfig, RuntimeConfigBuilder, RuntimeConfigBuilderError, FLAT_LEVELS};
pub use error::RuntimeError;
pub use split::RangeSplitter;
pub use team::{nesting_level, Runtime, Task};
