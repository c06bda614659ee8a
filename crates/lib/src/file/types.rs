use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::filepath::FileKind;
use crate::util::hash::{ContentHash, hash_bytes};

/// Errors raised while constructing files or resolving their dependencies.
#[derive(Debug, Error)]
pub enum FileError {
  /// The file could not be read.
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A dependency id could not be resolved from the referencing file.
  #[error("unable to resolve '{id}' from {from}")]
  Unresolved { id: String, from: PathBuf },

  /// Factory options were malformed.
  #[error("invalid file options: {0}")]
  InvalidOptions(String),
}

/// A source file participating in a build.
///
/// Files are identified by their absolute path. `hash` always reflects the
/// current `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
  pub path: PathBuf,
  pub kind: Option<FileKind>,
  pub hash: ContentHash,
  pub content: String,
  /// Module ids referenced by this file, in source order, without duplicates.
  pub dependencies: Vec<String>,
}

impl File {
  pub fn new(path: PathBuf, kind: Option<FileKind>, content: String, dependencies: Vec<String>) -> Self {
    let hash = hash_bytes(content.as_bytes());
    Self {
      path,
      kind,
      hash,
      content,
      dependencies,
    }
  }

  /// Replace the content, recomputing the hash.
  pub fn set_content(&mut self, content: String) {
    self.hash = hash_bytes(content.as_bytes());
    self.content = content;
  }

  /// Directory containing the file.
  pub fn dir(&self) -> &Path {
    self.path.parent().unwrap_or(Path::new(""))
  }

  /// The file's name, without directories.
  pub fn file_name(&self) -> String {
    self
      .path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default()
  }
}

/// Constructs [`File`] values and resolves the ids they reference.
///
/// The build pipeline only ever talks to files through this trait, so parsing
/// and transformation strategies stay outside the core.
pub trait FileFactory: Send + Sync {
  /// Construct the file at the resolved absolute `path`.
  fn create(&self, path: &Path) -> Result<File, FileError>;

  /// Resolve dependency `id` referenced by `from` to an absolute path.
  fn resolve_dependency(&self, from: &File, id: &str) -> Result<PathBuf, FileError>;
}
