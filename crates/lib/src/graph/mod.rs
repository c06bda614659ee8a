//! Dependency graph discovery.
//!
//! [`FileGraphBuilder::process_files`] walks the dependency ids of a list of
//! entry files depth-first and collects every reachable file exactly once.
//!
//! # Algorithm Overview
//!
//! 1. Insert each entry file, in configured order
//! 2. After inserting an entry, walk its dependency ids in declared order
//! 3. Resolve each id to a path through the [`FileFactory`]
//! 4. A path already in the graph only gains an edge; it is not re-visited,
//!    which also terminates circular references
//! 5. A new path is constructed, inserted, and walked before the next sibling
//!
//! Node indices are assigned on insertion and nodes are never removed, so index
//! order is first-discovery order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tracing::{debug, trace};

use crate::file::{File, FileError, FileFactory};

/// Errors that abort graph discovery.
#[derive(Debug, Error)]
pub enum GraphError {
  /// `process_files` was called without entry files.
  #[error("no entry files to process")]
  NoEntries,

  /// A dependency could not be resolved, read, or constructed.
  #[error("failed to load dependency '{id}' of {from}: {source}")]
  Dependency {
    from: PathBuf,
    id: String,
    #[source]
    source: FileError,
  },
}

/// The files reachable from a build's entry files.
///
/// Keyed by absolute path; a path appears at most once. Edges point from a
/// file to the files it depends on.
#[derive(Debug, Default)]
pub struct DependencyGraph {
  graph: DiGraph<File, ()>,
  index: HashMap<PathBuf, NodeIndex>,
  entries: Vec<NodeIndex>,
}

impl DependencyGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert `file` unless its path is already present.
  ///
  /// Returns the node index and whether the file was newly inserted.
  fn insert(&mut self, file: File) -> (NodeIndex, bool) {
    if let Some(&idx) = self.index.get(&file.path) {
      return (idx, false);
    }
    let path = file.path.clone();
    let idx = self.graph.add_node(file);
    self.index.insert(path, idx);
    (idx, true)
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  pub fn contains(&self, path: &Path) -> bool {
    self.index.contains_key(path)
  }

  pub fn get(&self, path: &Path) -> Option<&File> {
    self.index.get(path).map(|&idx| &self.graph[idx])
  }

  pub fn get_mut(&mut self, path: &Path) -> Option<&mut File> {
    let idx = *self.index.get(path)?;
    Some(&mut self.graph[idx])
  }

  /// All files in first-discovery order.
  pub fn files(&self) -> impl Iterator<Item = &File> {
    self.graph.node_weights()
  }

  /// All files in first-discovery order, mutably.
  pub fn files_mut(&mut self) -> impl Iterator<Item = &mut File> {
    self.graph.node_weights_mut()
  }

  /// Paths of all files in first-discovery order.
  pub fn paths(&self) -> Vec<PathBuf> {
    self.files().map(|f| f.path.clone()).collect()
  }

  /// The entry files, in configured order.
  pub fn entries(&self) -> impl Iterator<Item = &File> {
    self.entries.iter().map(|&idx| &self.graph[idx])
  }

  /// Direct dependencies of `path`, in declared order.
  pub fn dependencies_of(&self, path: &Path) -> Vec<&File> {
    self.neighbors(path, Direction::Outgoing)
  }

  /// Files that directly depend on `path`.
  pub fn dependents_of(&self, path: &Path) -> Vec<&File> {
    self.neighbors(path, Direction::Incoming)
  }

  fn neighbors(&self, path: &Path, direction: Direction) -> Vec<&File> {
    let Some(&idx) = self.index.get(path) else {
      return Vec::new();
    };
    // petgraph yields the most recently added edge first
    let mut files: Vec<&File> = self
      .graph
      .neighbors_directed(idx, direction)
      .map(|n| &self.graph[n])
      .collect();
    files.reverse();
    files
  }

  /// Consume the graph, returning files in first-discovery order.
  pub fn into_files(self) -> Vec<File> {
    let (nodes, _) = self.graph.into_nodes_edges();
    nodes.into_iter().map(|n| n.weight).collect()
  }
}

/// Collects the complete set of files touched by a build.
pub struct FileGraphBuilder<'a> {
  factory: &'a dyn FileFactory,
}

impl<'a> FileGraphBuilder<'a> {
  pub fn new(factory: &'a dyn FileFactory) -> Self {
    Self { factory }
  }

  /// Walk the dependencies of `entries` and return every reachable file once.
  ///
  /// Fails on the first dependency that cannot be resolved or constructed; no
  /// partial graph is returned.
  pub fn process_files(&self, entries: Vec<File>) -> Result<DependencyGraph, GraphError> {
    if entries.is_empty() {
      return Err(GraphError::NoEntries);
    }

    let mut graph = DependencyGraph::new();

    for file in entries {
      let (idx, inserted) = graph.insert(file);
      if !graph.entries.contains(&idx) {
        graph.entries.push(idx);
      }
      if inserted {
        self.walk(&mut graph, idx)?;
      }
    }

    debug!(
      entries = graph.entries.len(),
      files = graph.len(),
      "dependency graph complete"
    );

    Ok(graph)
  }

  /// Depth-first walk from `root` with an explicit stack of
  /// `(node, next dependency position)` frames.
  fn walk(&self, graph: &mut DependencyGraph, root: NodeIndex) -> Result<(), GraphError> {
    let mut stack: Vec<(NodeIndex, usize)> = vec![(root, 0)];

    while let Some(frame) = stack.last_mut() {
      let (idx, pos) = *frame;
      let Some(id) = graph.graph[idx].dependencies.get(pos).cloned() else {
        stack.pop();
        continue;
      };
      frame.1 += 1;

      let from = &graph.graph[idx];
      let fail = |source| GraphError::Dependency {
        from: from.path.clone(),
        id: id.clone(),
        source,
      };

      let path = self.factory.resolve_dependency(from, &id).map_err(fail)?;
      if let Some(&existing) = graph.index.get(&path) {
        trace!(id = %id, path = %path.display(), "already discovered");
        graph.graph.update_edge(idx, existing, ());
        continue;
      }

      let file = self.factory.create(&path).map_err(fail)?;
      let (dep_idx, inserted) = graph.insert(file);
      graph.graph.update_edge(idx, dep_idx, ());

      if inserted {
        trace!(id = %id, path = %path.display(), "discovered dependency");
        stack.push((dep_idx, 0));
      }
    }

    Ok(())
  }
}
