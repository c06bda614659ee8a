//! Build target execution.
//!
//! A [`BuildPipeline`] turns one [`BuildTargetConfig`](crate::config::BuildTargetConfig)
//! into written output files:
//!
//! ```text
//! Idle -> Before -> CollectingFiles -> GraphBuilding -> PerFileFinalize -> Writing -> After -> Done
//! ```
//!
//! Any stage may move the pipeline to `Failed`. Files written before a failure
//! are left in place.

mod pipeline;
mod types;

pub use pipeline::BuildPipeline;
pub use types::*;
