//! Test utilities for sheaf-lib.
//!
//! Helpers for laying out throwaway project trees on disk.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Write `content` to `root/relative_path`, creating parent directories.
///
/// Returns the full path of the written file.
pub fn write_file(root: &Path, relative_path: &str, content: &str) -> PathBuf {
  let path = root.join(relative_path);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, content).unwrap();
  path
}

/// Create a temporary project containing `files` as `(relative_path, content)` pairs.
pub fn project(files: &[(&str, &str)]) -> TempDir {
  let temp = TempDir::new().unwrap();
  for (path, content) in files {
    write_file(temp.path(), path, content);
  }
  temp
}

/// Canonical form of `root/relative_path`, matching paths produced by resolution.
pub fn canonical(root: &Path, relative_path: &str) -> PathBuf {
  dunce::canonicalize(root.join(relative_path)).unwrap()
}

/// A small script tree:
///
/// ```text
/// src/js/bar.js -> ./foo, ./baz
/// src/js/foo.js -> ./baz
/// src/js/baz.js
/// src/js/bat.js
/// ```
///
/// `bar.js` reaches `baz.js` twice (directly and through `foo.js`).
pub fn script_project() -> TempDir {
  project(&[
    (
      "src/js/bar.js",
      "var foo = require('./foo');\nvar baz = require('./baz');\nmodule.exports = 'bar';\n",
    ),
    ("src/js/foo.js", "var baz = require('./baz');\nmodule.exports = 'foo';\n"),
    ("src/js/baz.js", "module.exports = 'baz';\n"),
    ("src/js/bat.js", "module.exports = 'bat';\n"),
  ])
}
