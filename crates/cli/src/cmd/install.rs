//! Implementation of the `sheaf install` command.
//!
//! Installs the given packages with the project's package manager, skipping
//! any that already resolve.

use std::path::Path;

use anyhow::{Result, bail};

use sheaf_lib::resolve::DependencyResolver;
use sheaf_lib::resolve::install::validate_id;

use crate::output::{print_info, print_success, print_warning};

pub fn cmd_install(dir: &Path, ids: &[String]) -> Result<()> {
  for id in ids {
    validate_id(id)?;
  }

  let resolver = DependencyResolver::for_project(dir);
  let missing = unresolved(&resolver, ids);
  if missing.is_empty() {
    print_info("All packages already resolve");
    return Ok(());
  }

  print_info(&format!(
    "Installing {} with {}",
    missing.join(", "),
    resolver.package_manager().as_str()
  ));
  resolver.install(Some(ids));

  let remaining = unresolved(&resolver, ids);
  if remaining.is_empty() {
    print_success(&format!("Installed {} package(s)", missing.len()));
    Ok(())
  } else {
    print_warning(&format!("Still unresolved: {}", remaining.join(", ")));
    bail!("Failed to install {}", remaining.join(", "));
  }
}

fn unresolved(resolver: &DependencyResolver, ids: &[String]) -> Vec<String> {
  ids
    .iter()
    .filter(|id| resolver.find(id).as_os_str().is_empty())
    .cloned()
    .collect()
}
