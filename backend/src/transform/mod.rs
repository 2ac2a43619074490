//! Transformation module.
//!
//! - Adjust: lookup join and decimal shift
//! - Pipeline: async orchestration from file to export

pub mod adjust;
pub mod pipeline;

pub use adjust::{apply, Adjustment};
pub use pipeline::*;
