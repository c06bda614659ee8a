use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::consts::INPUT_SUMMARY_LIMIT;
use crate::file::FileError;
use crate::graph::GraphError;
use crate::hook::HookError;

/// A file written by a build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
  /// Absolute path of the written file.
  pub filepath: PathBuf,
  pub content: String,
}

/// Lifecycle state of a [`BuildPipeline`](super::BuildPipeline).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildState {
  #[default]
  Idle,
  Before,
  CollectingFiles,
  GraphBuilding,
  PerFileFinalize,
  Writing,
  After,
  Done,
  Failed,
}

impl BuildState {
  pub fn as_str(&self) -> &'static str {
    match self {
      BuildState::Idle => "idle",
      BuildState::Before => "before",
      BuildState::CollectingFiles => "collecting-files",
      BuildState::GraphBuilding => "graph-building",
      BuildState::PerFileFinalize => "per-file-finalize",
      BuildState::Writing => "writing",
      BuildState::After => "after",
      BuildState::Done => "done",
      BuildState::Failed => "failed",
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, BuildState::Done | BuildState::Failed)
  }
}

impl fmt::Display for BuildState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Errors that end a build run.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Hook(#[from] HookError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  File(#[from] FileError),

  /// A unique-filename input pattern matched no existing file.
  #[error("no file matches input '{0}'")]
  InputNotFound(String),

  #[error("failed to read input directory {path}: {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  /// Several entry files would be written to the same plain file output.
  #[error("cannot write {count} files to the single output '{output}'")]
  AmbiguousOutput { output: String, count: usize },

  /// Two entry files resolve to the same output path.
  #[error("{} and {} would both be written to {}", first.display(), second.display(), path.display())]
  OutputCollision {
    path: PathBuf,
    first: PathBuf,
    second: PathBuf,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Short description of a target's inputs for diagnostics.
///
/// Lists the first few names and counts the rest:
/// `"a.js, b.js, c.js ...and 2 other"`.
pub fn summarize_inputs<S: AsRef<str>>(names: &[S]) -> String {
  let shown: Vec<&str> = names.iter().take(INPUT_SUMMARY_LIMIT).map(AsRef::as_ref).collect();
  let summary = shown.join(", ");
  match names.len().saturating_sub(INPUT_SUMMARY_LIMIT) {
    0 => summary,
    rest => format!("{} ...and {} other", summary, rest),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn summary_of_single_input() {
    assert_eq!(summarize_inputs(&["js/foo.js"]), "js/foo.js");
  }

  #[test]
  fn summary_joins_up_to_limit() {
    assert_eq!(
      summarize_inputs(&["bar.js", "bat.js", "baz.js"]),
      "bar.js, bat.js, baz.js"
    );
  }

  #[test]
  fn summary_counts_remaining() {
    assert_eq!(
      summarize_inputs(&["bar.js", "bat.js", "baz.js", "qux.js"]),
      "bar.js, bat.js, baz.js ...and 1 other"
    );
    assert_eq!(
      summarize_inputs(&["a", "b", "c", "d", "e", "f"]),
      "a, b, c ...and 3 other"
    );
  }

  #[test]
  fn summary_of_nothing_is_empty() {
    assert_eq!(summarize_inputs::<String>(&[]), "");
  }

  #[test]
  fn terminal_states() {
    assert!(BuildState::Done.is_terminal());
    assert!(BuildState::Failed.is_terminal());
    assert!(!BuildState::Writing.is_terminal());
    assert_eq!(BuildState::default(), BuildState::Idle);
  }

  #[test]
  fn hook_failure_displays_reason() {
    let err = BuildError::from(HookError::Failed {
      kind: crate::hook::HookKind::Before,
      reason: "oops".to_string(),
    });
    assert_eq!(err.to_string(), "oops");
  }
}
