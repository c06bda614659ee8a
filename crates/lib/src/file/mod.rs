//! Source files and the factory that constructs them.
//!
//! The build core treats file construction as an external concern reached
//! through [`FileFactory`]. [`SourceFileFactory`] is the default
//! implementation used by the CLI.

pub mod source;
mod types;

pub use source::SourceFileFactory;
pub use types::*;
