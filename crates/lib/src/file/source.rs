//! Default [`FileFactory`] reading sources from disk.
//!
//! Dependency ids are collected with a shallow pattern scan rather than a
//! parse, which is enough to walk a project's module graph:
//!
//! - scripts: `require('x')`, `import ... from 'x'`, `import 'x'`, `export ... from 'x'`
//! - stylesheets: `@import 'x'`, `@import url(x)`

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Map, Value};
use tracing::trace;

use crate::filepath::{FileExtensions, FileKind, filepath_type};
use crate::resolve::DependencyResolver;
use crate::resolve::node::{DEFAULT_EXTENSIONS, is_relative_id, resolve_module};

use super::types::{File, FileError, FileFactory};

/// Option key holding a [`FileExtensions`] override.
pub const EXTENSIONS_OPTION: &str = "fileExtensions";

static REQUIRE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("valid regex"));

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"(?m)^\s*(?:import|export)\s+(?:[^'";]*?\s+from\s+)?['"]([^'"]+)['"]"#).expect("valid regex")
});

static CSS_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"@import\s+(?:url\(\s*)?['"]?([^'"()\s;]+)['"]?\s*\)?"#).expect("valid regex")
});

/// Reads files from disk and resolves their dependencies.
pub struct SourceFileFactory {
  extensions: FileExtensions,
  resolver: Arc<DependencyResolver>,
}

impl SourceFileFactory {
  pub fn new(resolver: Arc<DependencyResolver>) -> Self {
    Self {
      extensions: FileExtensions::default(),
      resolver,
    }
  }

  /// Build a factory from a target's pass-through options.
  ///
  /// A `fileExtensions` entry adds extensions to the default table.
  pub fn from_options(resolver: Arc<DependencyResolver>, options: &Map<String, Value>) -> Result<Self, FileError> {
    let mut factory = Self::new(resolver);

    if let Some(value) = options.get(EXTENSIONS_OPTION) {
      let extra: FileExtensions =
        serde_json::from_value(value.clone()).map_err(|e| FileError::InvalidOptions(e.to_string()))?;
      for (kind, exts) in extra.0 {
        let entry = factory.extensions.0.entry(kind).or_default();
        for ext in exts {
          if !entry.contains(&ext) {
            entry.push(ext);
          }
        }
      }
    }

    Ok(factory)
  }

  pub fn extensions(&self) -> &FileExtensions {
    &self.extensions
  }
}

impl FileFactory for SourceFileFactory {
  fn create(&self, path: &Path) -> Result<File, FileError> {
    let read_err = |source| FileError::Read {
      path: path.to_path_buf(),
      source,
    };
    let path = dunce::canonicalize(path).map_err(read_err)?;
    let content = std::fs::read_to_string(&path).map_err(|source| FileError::Read {
      path: path.clone(),
      source,
    })?;

    let kind = filepath_type(&path, &self.extensions);
    let dependencies = scan_dependencies(kind, &content);
    trace!(path = %path.display(), kind = ?kind, dependencies = dependencies.len(), "created file");

    Ok(File::new(path, kind, content, dependencies))
  }

  fn resolve_dependency(&self, from: &File, id: &str) -> Result<PathBuf, FileError> {
    let unresolved = || FileError::Unresolved {
      id: id.to_string(),
      from: from.path.clone(),
    };

    if is_relative_id(id) {
      return resolve_module(id, from.dir(), DEFAULT_EXTENSIONS).ok_or_else(unresolved);
    }

    // Stylesheet imports are relative unless they name a package.
    if from.kind == Some(FileKind::Css)
      && let Some(found) = resolve_module(&format!("./{}", id), from.dir(), DEFAULT_EXTENSIONS)
    {
      return Ok(found);
    }

    let found = self.resolver.find(id);
    if found.as_os_str().is_empty() {
      Err(unresolved())
    } else {
      Ok(found)
    }
  }
}

/// Collect the module ids referenced by `content`, in source order.
pub fn scan_dependencies(kind: Option<FileKind>, content: &str) -> Vec<String> {
  let patterns: Vec<&Regex> = match kind {
    Some(FileKind::Js) => vec![&*REQUIRE_RE, &*IMPORT_RE],
    Some(FileKind::Css) => vec![&*CSS_IMPORT_RE],
    Some(FileKind::Html) | None => Vec::new(),
  };

  let mut found: Vec<(usize, &str)> = patterns
    .into_iter()
    .flat_map(|re| re.captures_iter(content))
    .filter_map(|caps| caps.get(1))
    .map(|m| (m.start(), m.as_str()))
    .filter(|(_, id)| !is_external_url(id))
    .collect();
  found.sort_by_key(|(pos, _)| *pos);

  let mut ids: Vec<String> = Vec::with_capacity(found.len());
  for (_, id) in found {
    if !ids.iter().any(|existing| existing == id) {
      ids.push(id.to_string());
    }
  }
  ids
}

fn is_external_url(id: &str) -> bool {
  id.starts_with("http:") || id.starts_with("https:") || id.starts_with("//") || id.starts_with("data:")
}
