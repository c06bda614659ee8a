//! Implementation of the `sheaf resolve` command.

use std::path::Path;

use anyhow::{Result, bail};

use sheaf_lib::resolve::DependencyResolver;

use crate::output::{OutputFormat, print_error, print_json};

pub fn cmd_resolve(dir: &Path, id: &str, format: OutputFormat) -> Result<()> {
  let resolver = DependencyResolver::for_project(dir);
  let found = resolver.find(id);

  if found.as_os_str().is_empty() {
    if format.is_json() {
      print_json(&serde_json::json!({ "id": id, "path": null }))?;
    } else {
      print_error(&format!("Unable to resolve '{}'", id));
    }
    bail!("Unable to resolve '{}'", id);
  }

  if format.is_json() {
    print_json(&serde_json::json!({ "id": id, "path": found }))?;
  } else {
    println!("{}", found.display());
  }
  Ok(())
}
