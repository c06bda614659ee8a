//! sheaf-lib: Core of the sheaf build orchestrator
//!
//! This crate turns build target configurations into written output files:
//! - `config`: build targets read from `sheaf.json` or `package.json`
//! - `file`: the `File` model and the factory that reads and scans sources
//! - `graph`: discovery of every file reachable from a target's entries
//! - `hook`: `before`, `afterEach` and `after` lifecycle hooks
//! - `build`: the pipeline that ties these together and writes outputs
//! - `resolve`: module resolution and installation of missing packages
//! - `filepath`: cache-busted filenames and path helpers

pub mod build;
pub mod config;
pub mod consts;
pub mod file;
pub mod filepath;
pub mod graph;
pub mod hook;
pub mod resolve;
pub mod util;
