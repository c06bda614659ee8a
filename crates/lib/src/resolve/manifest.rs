//! Project manifest (`package.json`) inspection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::consts::MANIFEST_FILE_NAME;

/// Errors that can occur while reading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse manifest {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// The subset of a `package.json` used for module resolution.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
  #[serde(default)]
  pub name: Option<String>,

  /// Entry point of the package, relative to its directory.
  #[serde(default)]
  pub main: Option<String>,

  #[serde(default)]
  pub dependencies: BTreeMap<String, String>,

  #[serde(default)]
  pub dev_dependencies: BTreeMap<String, String>,
}

impl ProjectManifest {
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Returns true if `id` (or the package it belongs to) is declared as a
  /// dependency or dev dependency.
  pub fn is_declared(&self, id: &str) -> bool {
    let package = package_name(id);
    self.dependencies.contains_key(package) || self.dev_dependencies.contains_key(package)
  }
}

/// Walk up from `start` and return the first directory's manifest path.
pub fn find_nearest_manifest(start: &Path) -> Option<PathBuf> {
  start
    .ancestors()
    .map(|dir| dir.join(MANIFEST_FILE_NAME))
    .find(|candidate| candidate.is_file())
}

/// The package portion of a module id (`@scope/pkg/sub` -> `@scope/pkg`).
pub fn package_name(id: &str) -> &str {
  let mut parts = id.splitn(3, '/');
  let first = parts.next().unwrap_or_default();
  if first.starts_with('@') {
    match parts.next() {
      Some(second) => &id[..first.len() + 1 + second.len()],
      None => id,
    }
  } else {
    first
  }
}
