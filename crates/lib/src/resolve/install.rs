//! Package-manager selection and invocation for missing dependencies.

use std::path::Path;
use std::process::Command;

use thiserror::Error;
use tracing::debug;

use crate::consts::YARN_LOCKFILE;

/// Errors from a package-manager invocation.
///
/// These are logged by [`super::DependencyResolver::install`] and never
/// propagated to callers.
#[derive(Debug, Error)]
pub enum InstallError {
  #[error("failed to spawn '{cmd}': {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  #[error("command failed with exit code {code:?}: {cmd}")]
  Failed { cmd: String, code: Option<i32> },

  #[error("refusing to install invalid package id '{0}'")]
  InvalidId(String),
}

/// The package manager used to install missing dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
  Npm,
  Yarn,
}

impl PackageManager {
  /// Pick the manager from the lockfile present in `cwd`.
  ///
  /// `yarn.lock` selects Yarn; anything else selects npm.
  pub fn detect(cwd: &Path) -> Self {
    if cwd.join(YARN_LOCKFILE).is_file() {
      PackageManager::Yarn
    } else {
      PackageManager::Npm
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      PackageManager::Npm => "npm",
      PackageManager::Yarn => "yarn",
    }
  }

  /// Command line installing `ids` as exact-pinned development dependencies.
  pub fn install_command(&self, ids: &[String]) -> String {
    let ids = ids.join(" ");
    match self {
      PackageManager::Npm => format!("npm --save-dev --save-exact install {}", ids),
      PackageManager::Yarn => format!("yarn add --dev --exact {}", ids),
    }
  }
}

/// Package ids are interpolated into a shell command line, so only plain
/// package specifiers are accepted. A leading `-` would be read as an option.
pub fn validate_id(id: &str) -> Result<(), InstallError> {
  let valid = !id.is_empty()
    && !id.starts_with('-')
    && id
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '/' | '.' | '_' | '-' | '^' | '~'));
  if valid {
    Ok(())
  } else {
    Err(InstallError::InvalidId(id.to_string()))
  }
}

/// Runs a shell command line synchronously.
pub trait CommandRunner: Send + Sync {
  fn run(&self, cmd: &str, cwd: &Path) -> Result<(), InstallError>;
}

/// [`CommandRunner`] that spawns the platform shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
  fn run(&self, cmd: &str, cwd: &Path) -> Result<(), InstallError> {
    let (shell, flag) = shell();
    debug!(shell = %shell, cmd = %cmd, cwd = %cwd.display(), "spawning process");

    let output = Command::new(shell)
      .arg(flag)
      .arg(cmd)
      .current_dir(cwd)
      .output()
      .map_err(|source| InstallError::Spawn {
        cmd: cmd.to_string(),
        source,
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "command stderr");
      }
      return Err(InstallError::Failed {
        cmd: cmd.to_string(),
        code: output.status.code(),
      });
    }

    Ok(())
  }
}

#[cfg(unix)]
fn shell() -> (&'static str, &'static str) {
  ("/bin/sh", "-c")
}

#[cfg(windows)]
fn shell() -> (&'static str, &'static str) {
  ("cmd.exe", "/C")
}
