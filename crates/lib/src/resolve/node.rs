//! Directory-walking module resolution.
//!
//! Relative and absolute ids are resolved against a base directory, probing
//! extensions and `index` files. Bare package ids are looked up in the
//! `node_modules` directory of the base directory and each of its ancestors,
//! honoring a package's `main` entry point.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::consts::{MANIFEST_FILE_NAME, MODULES_DIR_NAME};

use super::manifest::ProjectManifest;

/// Extensions probed when an id omits one.
pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "json", "css", "html"];

/// Returns true if `id` names a path rather than a package.
pub fn is_relative_id(id: &str) -> bool {
  id.starts_with("./") || id.starts_with("../") || id == "." || id == ".." || Path::new(id).is_absolute()
}

/// Resolve `id` from `base_dir`.
///
/// Returns the canonical path of the resolved file, or `None`.
pub fn resolve_module(id: &str, base_dir: &Path, extensions: &[&str]) -> Option<PathBuf> {
  if id.is_empty() {
    return None;
  }

  let found = if is_relative_id(id) {
    resolve_path(&base_dir.join(id), extensions)
  } else {
    base_dir
      .ancestors()
      .filter(|dir| dir.file_name().is_none_or(|name| name != MODULES_DIR_NAME))
      .find_map(|dir| resolve_in_modules_dir(&dir.join(MODULES_DIR_NAME), id, extensions))
  };

  trace!(id = %id, base = %base_dir.display(), found = ?found, "module resolution");
  found.and_then(|p| dunce::canonicalize(p).ok())
}

/// Resolve a bare `id` inside a single modules directory.
pub fn resolve_in_modules_dir(modules_dir: &Path, id: &str, extensions: &[&str]) -> Option<PathBuf> {
  if !modules_dir.is_dir() {
    return None;
  }
  resolve_path(&modules_dir.join(id), extensions)
}

fn resolve_path(candidate: &Path, extensions: &[&str]) -> Option<PathBuf> {
  resolve_as_file(candidate, extensions).or_else(|| resolve_as_directory(candidate, extensions))
}

fn resolve_as_file(candidate: &Path, extensions: &[&str]) -> Option<PathBuf> {
  if candidate.is_file() {
    return Some(candidate.to_path_buf());
  }

  let file_name = candidate.file_name()?.to_string_lossy();
  extensions
    .iter()
    .map(|ext| candidate.with_file_name(format!("{}.{}", file_name, ext)))
    .find(|p| p.is_file())
}

fn resolve_as_directory(candidate: &Path, extensions: &[&str]) -> Option<PathBuf> {
  if !candidate.is_dir() {
    return None;
  }

  let manifest_path = candidate.join(MANIFEST_FILE_NAME);
  if manifest_path.is_file()
    && let Ok(manifest) = ProjectManifest::load(&manifest_path)
    && let Some(main) = manifest.main.as_deref()
  {
    let main_path = candidate.join(main);
    if let Some(found) = resolve_as_file(&main_path, extensions).or_else(|| index_file(&main_path, extensions)) {
      return Some(found);
    }
  }

  index_file(candidate, extensions)
}

fn index_file(dir: &Path, extensions: &[&str]) -> Option<PathBuf> {
  extensions
    .iter()
    .map(|ext| dir.join(format!("index.{}", ext)))
    .find(|p| p.is_file())
}
