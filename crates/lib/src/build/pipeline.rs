use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::{BuildTargetConfig, output_is_file};
use crate::file::{File, FileFactory, SourceFileFactory};
use crate::filepath::{
  filepath_name, find_generated_filepaths, find_unique_filepath, generate_unique_filepath, is_unique_filepath,
  truncate_default,
};
use crate::graph::{DependencyGraph, FileGraphBuilder};
use crate::hook::{CONTENT_KEY, FILEPATH_KEY, Hook, HookContext, HookKind, run_hook};
use crate::resolve::DependencyResolver;

use super::types::{BuildError, BuildOutput, BuildState, summarize_inputs};

/// Runs a single build target.
///
/// Relative inputs and outputs resolve against `root`; the process working
/// directory is never consulted.
pub struct BuildPipeline {
  config: BuildTargetConfig,
  root: PathBuf,
  factory: Arc<dyn FileFactory>,
  hooks: HashMap<HookKind, Hook>,
  state: BuildState,
}

impl BuildPipeline {
  /// Create a pipeline for `config`, taking hooks from its Lua sources.
  pub fn new(config: BuildTargetConfig, root: impl Into<PathBuf>, factory: Arc<dyn FileFactory>) -> Self {
    let root = root.into();
    let root = std::path::absolute(&root).unwrap_or(root);

    let hooks = [HookKind::Before, HookKind::AfterEach, HookKind::After]
      .into_iter()
      .filter_map(|kind| config.hook(kind).map(|hook| (kind, hook)))
      .collect();

    Self {
      config,
      root,
      factory,
      hooks,
      state: BuildState::Idle,
    }
  }

  /// Create a pipeline reading sources from disk with project module resolution.
  pub fn for_project(config: BuildTargetConfig, root: impl Into<PathBuf>) -> Result<Self, BuildError> {
    let root = root.into();
    let resolver = Arc::new(DependencyResolver::for_project(&root));
    let factory = SourceFileFactory::from_options(resolver, &config.options)?;
    Ok(Self::new(config, root, Arc::new(factory)))
  }

  /// Replace the hook for `kind`.
  pub fn with_hook(mut self, kind: HookKind, hook: Hook) -> Self {
    self.hooks.insert(kind, hook);
    self
  }

  pub fn config(&self) -> &BuildTargetConfig {
    &self.config
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn state(&self) -> BuildState {
    self.state
  }

  fn transition(&mut self, next: BuildState) {
    debug!(from = %self.state, to = %next, "build state");
    self.state = next;
  }

  /// Absolute paths of the entry files.
  ///
  /// Directory inputs expand to the files directly inside them, sorted by
  /// name and skipping hidden files. Unique-filename inputs resolve to the
  /// existing file they match.
  pub fn input_paths(&self) -> Result<Vec<PathBuf>, BuildError> {
    let mut paths = Vec::new();

    for input in self.config.input.paths() {
      if is_unique_filepath(input) {
        let found = find_unique_filepath(input, &self.root);
        if found.as_os_str().is_empty() {
          return Err(BuildError::InputNotFound(input.to_string()));
        }
        paths.push(found);
        continue;
      }

      let path = self.root.join(input);
      if path.is_dir() {
        paths.extend(expand_dir(&path)?);
      } else {
        paths.push(path);
      }
    }

    Ok(paths)
  }

  /// Summary of the inputs for diagnostics, e.g. `js/bar.js, js/bat.js ...and 2 other`.
  pub fn input_string(&self) -> String {
    let names: Vec<String> = match self.input_paths() {
      Ok(paths) => paths.iter().map(|p| filepath_name(p, &self.root)).collect(),
      Err(_) => self.config.input.paths().into_iter().map(str::to_string).collect(),
    };
    summarize_inputs(&names)
  }

  /// Construct a file for each input path.
  pub fn init_files(&self, paths: &[PathBuf]) -> Result<Vec<File>, BuildError> {
    paths
      .iter()
      .map(|path| self.factory.create(path).map_err(BuildError::from))
      .collect()
  }

  /// Collect `files` and everything they depend on.
  pub fn process_files(&self, files: Vec<File>) -> Result<DependencyGraph, BuildError> {
    Ok(FileGraphBuilder::new(self.factory.as_ref()).process_files(files)?)
  }

  /// Run the build, returning the written entry files in input order.
  pub async fn run(&mut self) -> Result<Vec<BuildOutput>, BuildError> {
    let summary = truncate_default(&self.input_string());
    info!(input = %summary, output = %self.config.output, "build started");

    let result = self.execute().await;
    match &result {
      Ok(outputs) => {
        self.transition(BuildState::Done);
        info!(input = %summary, written = outputs.len(), "build complete");
      }
      Err(e) => {
        self.transition(BuildState::Failed);
        error!(input = %summary, error = %e, "build failed");
      }
    }
    result
  }

  async fn execute(&mut self) -> Result<Vec<BuildOutput>, BuildError> {
    // Inputs are seeded as configured; `before` may still create them.
    let seeded: Vec<PathBuf> = self.config.input.paths().iter().map(|p| self.root.join(p)).collect();
    let mut context = HookContext::seeded(&seeded, &self.config.output);

    self.transition(BuildState::Before);
    self.run_hook(HookKind::Before, &mut context).await?;

    self.transition(BuildState::CollectingFiles);
    let paths = self.input_paths()?;
    let files = self.init_files(&paths)?;

    self.transition(BuildState::GraphBuilding);
    let mut graph = self.process_files(files)?;

    self.transition(BuildState::PerFileFinalize);
    if let Some(hook) = self.hooks.get(&HookKind::AfterEach) {
      for file in graph.files_mut() {
        finalize_file(hook, file, &mut context).await?;
      }
    }

    self.transition(BuildState::Writing);
    let outputs = self.write_outputs(&graph).await?;

    self.transition(BuildState::After);
    self.run_hook(HookKind::After, &mut context).await?;

    Ok(outputs)
  }

  async fn run_hook(&self, kind: HookKind, context: &mut HookContext) -> Result<(), BuildError> {
    if let Some(hook) = self.hooks.get(&kind) {
      run_hook(kind, hook, context).await?;
    }
    Ok(())
  }

  /// Where `entry` is written.
  ///
  /// An existing directory is always written into, whatever its name looks like.
  fn output_path(&self, entry: &File, entry_count: usize) -> Result<PathBuf, BuildError> {
    let output = &self.config.output;
    let existing_dir = !is_unique_filepath(output) && self.root.join(output).is_dir();

    if existing_dir || !output_is_file(output) {
      return Ok(self.root.join(output).join(entry.file_name()));
    }

    if is_unique_filepath(output) {
      return Ok(self.root.join(generate_unique_filepath(output, Some(entry.content.as_bytes()))));
    }

    if entry_count > 1 {
      return Err(BuildError::AmbiguousOutput {
        output: output.clone(),
        count: entry_count,
      });
    }
    Ok(self.root.join(output))
  }

  async fn write_outputs(&self, graph: &DependencyGraph) -> Result<Vec<BuildOutput>, BuildError> {
    let entries: Vec<&File> = graph.entries().collect();

    // Resolve every destination before touching the disk.
    let mut planned: Vec<(PathBuf, &File)> = Vec::with_capacity(entries.len());
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    for entry in &entries {
      let path = self.output_path(entry, entries.len())?;
      if let Some(first) = claimed.insert(path.clone(), &entry.path) {
        return Err(BuildError::OutputCollision {
          path,
          first: first.to_path_buf(),
          second: entry.path.clone(),
        });
      }
      planned.push((path, *entry));
    }

    let mut outputs = Vec::with_capacity(planned.len());
    for (path, entry) in planned {
      write_file(&path, &entry.content).await?;
      debug!(
        path = %filepath_name(&path, &self.root),
        hash = %entry.hash.short(8),
        "wrote output"
      );
      outputs.push(BuildOutput {
        filepath: path,
        content: entry.content.clone(),
      });
    }

    if is_unique_filepath(&self.config.output) {
      let written: HashSet<&Path> = outputs.iter().map(|o| o.filepath.as_path()).collect();
      remove_stale(&self.config.output, &self.root, &written).await;
    }

    Ok(outputs)
  }
}

/// Expose `file` to the `afterEach` hook and apply any content change.
async fn finalize_file(hook: &Hook, file: &mut File, context: &mut HookContext) -> Result<(), BuildError> {
  context.insert(CONTENT_KEY, file.content.clone());
  context.insert(FILEPATH_KEY, file.path.to_string_lossy().into_owned());

  let result = run_hook(HookKind::AfterEach, hook, context).await;
  let content = context.remove(CONTENT_KEY);
  context.remove(FILEPATH_KEY);
  result?;

  match content {
    Some(serde_json::Value::String(content)) => {
      if content != file.content {
        debug!(path = %file.path.display(), "content replaced by afterEach");
        file.set_content(content);
      }
    }
    Some(other) => {
      warn!(path = %file.path.display(), value = %other, "afterEach set non-string content, ignoring");
    }
    None => {
      warn!(path = %file.path.display(), "afterEach removed content, keeping original");
    }
  }
  Ok(())
}

fn expand_dir(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
  let mut paths = Vec::new();
  let walker = WalkDir::new(dir)
    .min_depth(1)
    .max_depth(1)
    .follow_links(true)
    .sort_by_file_name();

  for entry in walker {
    let entry = entry.map_err(|source| BuildError::ReadDir {
      path: dir.to_path_buf(),
      source,
    })?;
    let hidden = entry.file_name().to_string_lossy().starts_with('.');
    if entry.file_type().is_file() && !hidden {
      paths.push(entry.into_path());
    }
  }

  debug!(dir = %dir.display(), files = paths.len(), "expanded input directory");
  Ok(paths)
}

async fn write_file(path: &Path, content: &str) -> Result<(), BuildError> {
  let write_err = |source| BuildError::Write {
    path: path.to_path_buf(),
    source,
  };
  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
  }
  tokio::fs::write(path, content).await.map_err(write_err)
}

/// Remove earlier outputs of a unique pattern that this run did not write.
///
/// Only names of the generated shape are candidates, so unrelated files that
/// happen to fit the pattern loosely are left alone.
async fn remove_stale(pattern: &str, root: &Path, written: &HashSet<&Path>) {
  for stale in find_generated_filepaths(pattern, root) {
    if written.contains(stale.as_path()) {
      continue;
    }
    match tokio::fs::remove_file(&stale).await {
      Ok(()) => debug!(path = %stale.display(), "removed stale output"),
      Err(e) => warn!(path = %stale.display(), error = %e, "failed to remove stale output"),
    }
  }
}
