//! Filepath classification and naming helpers.
//!
//! # Submodules
//!
//! - [`unique`] - Cache-busted `%hash%`/`%date%` filename generation and lookup

pub mod unique;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::TRUNCATE_LIMIT;

pub use unique::{
  find_generated_filepaths, find_unique_filepath, find_unique_filepaths, generate_unique_filepath, is_unique_filepath,
};

/// Broad classification of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
  Js,
  Css,
  Html,
}

impl FileKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      FileKind::Js => "js",
      FileKind::Css => "css",
      FileKind::Html => "html",
    }
  }
}

impl std::fmt::Display for FileKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Extension table used to classify files, keyed by kind.
///
/// Extensions are stored without the leading dot and compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileExtensions(pub BTreeMap<FileKind, Vec<String>>);

impl Default for FileExtensions {
  fn default() -> Self {
    let mut map = BTreeMap::new();
    map.insert(FileKind::Js, vec!["js".to_string(), "json".to_string()]);
    map.insert(FileKind::Css, vec!["css".to_string()]);
    map.insert(FileKind::Html, vec!["html".to_string()]);
    Self(map)
  }
}

impl FileExtensions {
  /// Extensions registered for `kind`, in declaration order.
  pub fn for_kind(&self, kind: FileKind) -> &[String] {
    self.0.get(&kind).map(Vec::as_slice).unwrap_or_default()
  }
}

/// Classify `path` by its extension.
///
/// Returns `None` when the path has no extension or the extension is not
/// registered for any kind.
pub fn filepath_type(path: &Path, extensions: &FileExtensions) -> Option<FileKind> {
  let ext = path.extension()?.to_str()?.to_ascii_lowercase();
  extensions
    .0
    .iter()
    .find(|(_, exts)| exts.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    .map(|(kind, _)| *kind)
}

/// Short `dir/file` name of a path, for log output.
///
/// Files that live directly in `cwd` render as `./file`.
pub fn filepath_name(path: &Path, cwd: &Path) -> String {
  let absolute = if path.is_absolute() {
    path.to_path_buf()
  } else {
    cwd.join(path)
  };

  let name = absolute
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();

  match absolute.parent() {
    Some(parent) if parent == cwd => format!("./{}", name),
    Some(parent) => match parent.file_name() {
      Some(dir) => format!("{}/{}", dir.to_string_lossy(), name),
      None => name,
    },
    None => name,
  }
}

/// Shorten `s` to at most `max` characters by eliding the middle.
pub fn truncate(s: &str, max: usize) -> String {
  let len = s.chars().count();
  if len <= max || max <= 3 {
    return s.to_string();
  }

  let keep = max - 3;
  let head = keep / 2;
  let tail = keep - head;

  let start: String = s.chars().take(head).collect();
  let end: String = s.chars().skip(len - tail).collect();
  format!("{}...{}", start, end)
}

/// [`truncate`] with the default diagnostic limit.
pub fn truncate_default(s: &str) -> String {
  truncate(s, TRUNCATE_LIMIT)
}
