//! Module id resolution and missing-dependency installation.
//!
//! [`DependencyResolver::find`] runs an ordered list of [`ResolveStrategy`]
//! values and returns the first hit:
//!
//! 1. [`ToolResolver`] - modules shipped alongside the build tool
//! 2. [`ProjectResolver`] - the project's installed package tree, found by
//!    walking up to the nearest `package.json`
//!
//! A miss in every tier is an empty path, never an error. Installation is
//! best-effort: failures are logged and swallowed, and callers detect them by
//! calling `find` again.
//!
//! # Submodules
//!
//! - [`install`] - Package-manager selection and invocation
//! - [`manifest`] - `package.json` inspection
//! - [`node`] - Directory-walking module resolution

pub mod install;
pub mod manifest;
pub mod node;

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

pub use install::{CommandRunner, InstallError, PackageManager, ShellRunner};
pub use manifest::{ManifestError, ProjectManifest};

use manifest::find_nearest_manifest;
use node::{DEFAULT_EXTENSIONS, is_relative_id, resolve_in_modules_dir, resolve_module};

/// Environment variable listing extra tool module directories.
pub const TOOL_PATH_ENV: &str = "SHEAF_MODULES_PATH";

/// One tier of module resolution.
pub trait ResolveStrategy: Send + Sync {
  /// Short name used in logs.
  fn name(&self) -> &'static str;

  /// Resolve `id` to an absolute path, or `None` if this tier cannot.
  fn resolve(&self, id: &str) -> Option<PathBuf>;
}

/// Resolves package ids against the build tool's own module directories.
#[derive(Debug, Clone, Default)]
pub struct ToolResolver {
  search_paths: Vec<PathBuf>,
}

impl ToolResolver {
  pub fn new(search_paths: Vec<PathBuf>) -> Self {
    Self { search_paths }
  }

  /// Directories from [`TOOL_PATH_ENV`], then `node_modules` next to the executable.
  pub fn from_env() -> Self {
    let mut search_paths: Vec<PathBuf> = std::env::var_os(TOOL_PATH_ENV)
      .map(|v| std::env::split_paths(&v).collect())
      .unwrap_or_default();

    if let Ok(exe) = std::env::current_exe()
      && let Some(dir) = exe.parent()
    {
      search_paths.push(dir.join("node_modules"));
    }

    Self { search_paths }
  }

  pub fn search_paths(&self) -> &[PathBuf] {
    &self.search_paths
  }
}

impl ResolveStrategy for ToolResolver {
  fn name(&self) -> &'static str {
    "tool"
  }

  fn resolve(&self, id: &str) -> Option<PathBuf> {
    if is_relative_id(id) {
      return None;
    }
    self
      .search_paths
      .iter()
      .find_map(|dir| resolve_in_modules_dir(dir, id, DEFAULT_EXTENSIONS))
      .and_then(|p| dunce::canonicalize(p).ok())
  }
}

/// Resolves ids relative to the nearest project manifest.
#[derive(Debug, Clone)]
pub struct ProjectResolver {
  root: PathBuf,
  manifest: Option<ProjectManifest>,
}

impl ProjectResolver {
  /// Locate the nearest `package.json` at or above `cwd`.
  ///
  /// Without a manifest, `cwd` itself is the resolution root.
  pub fn new(cwd: &Path) -> Self {
    let manifest_path = find_nearest_manifest(cwd);
    let root = manifest_path
      .as_deref()
      .and_then(Path::parent)
      .map(Path::to_path_buf)
      .unwrap_or_else(|| cwd.to_path_buf());

    let manifest = manifest_path.and_then(|path| match ProjectManifest::load(&path) {
      Ok(m) => Some(m),
      Err(e) => {
        warn!(error = %e, "ignoring unreadable project manifest");
        None
      }
    });

    Self { root, manifest }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn manifest(&self) -> Option<&ProjectManifest> {
    self.manifest.as_ref()
  }
}

impl ResolveStrategy for ProjectResolver {
  fn name(&self) -> &'static str {
    "project"
  }

  fn resolve(&self, id: &str) -> Option<PathBuf> {
    let found = resolve_module(id, &self.root, DEFAULT_EXTENSIONS)?;

    if !is_relative_id(id)
      && let Some(manifest) = &self.manifest
      && !manifest.is_declared(id)
    {
      debug!(id = %id, "resolved package is not declared in the project manifest");
    }

    Some(found)
  }
}

/// Two-tier module resolver with best-effort installation.
pub struct DependencyResolver {
  cwd: PathBuf,
  package_manager: PackageManager,
  strategies: Vec<Box<dyn ResolveStrategy>>,
  runner: Box<dyn CommandRunner>,
}

impl DependencyResolver {
  /// Resolver with the default tool and project tiers.
  pub fn new(cwd: &Path, package_manager: PackageManager) -> Self {
    Self::with_strategies(
      cwd,
      package_manager,
      vec![Box::new(ToolResolver::from_env()), Box::new(ProjectResolver::new(cwd))],
    )
  }

  /// Resolver for `cwd`, detecting the package manager from its lockfile.
  pub fn for_project(cwd: &Path) -> Self {
    Self::new(cwd, PackageManager::detect(cwd))
  }

  pub fn with_strategies(
    cwd: &Path,
    package_manager: PackageManager,
    strategies: Vec<Box<dyn ResolveStrategy>>,
  ) -> Self {
    Self {
      cwd: cwd.to_path_buf(),
      package_manager,
      strategies,
      runner: Box::new(ShellRunner),
    }
  }

  /// Replace the runner used for install commands.
  pub fn with_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
    self.runner = Box::new(runner);
    self
  }

  pub fn package_manager(&self) -> PackageManager {
    self.package_manager
  }

  pub fn cwd(&self) -> &Path {
    &self.cwd
  }

  /// Resolve `id` to an absolute filepath, or an empty path if no tier can.
  pub fn find(&self, id: &str) -> PathBuf {
    for strategy in &self.strategies {
      if let Some(path) = strategy.resolve(id) {
        debug!(id = %id, tier = strategy.name(), path = %path.display(), "resolved dependency");
        return path;
      }
    }
    debug!(id = %id, "dependency not found");
    PathBuf::new()
  }

  /// Install every id in `ids` that [`find`](Self::find) cannot resolve.
  ///
  /// Issues at most one package-manager command. Failures are logged only.
  pub fn install(&self, ids: Option<&[String]>) {
    let Some(ids) = ids else {
      return;
    };

    let mut missing = Vec::new();
    for id in ids {
      if !self.find(id).as_os_str().is_empty() {
        continue;
      }
      match install::validate_id(id) {
        Ok(()) => missing.push(id.clone()),
        Err(e) => warn!(error = %e, "skipping dependency"),
      }
    }

    if missing.is_empty() {
      return;
    }

    let cmd = self.package_manager.install_command(&missing);
    info!(
      manager = self.package_manager.as_str(),
      ids = %missing.join(", "),
      "installing missing dependencies"
    );

    if let Err(e) = self.runner.run(&cmd, &self.cwd) {
      error!(error = %e, "dependency installation failed");
    }
  }
}
