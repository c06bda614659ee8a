//! Implementation of the `sheaf build` command.
//!
//! Loads the project config and runs its build targets in order, stopping at
//! the first failed target.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;

use sheaf_lib::build::BuildPipeline;
use sheaf_lib::config::{self, BuildTargetConfig};
use sheaf_lib::filepath::filepath_name;

use crate::output::{OutputFormat, format_duration, print_error, print_info, print_json, print_stat, print_success, symbols};

#[derive(Serialize)]
struct TargetReport {
  target: usize,
  input: String,
  files: Vec<PathBuf>,
}

/// Execute the build command.
///
/// Target paths are relative to the directory holding the config file.
pub fn cmd_build(dir: &Path, config_path: Option<&Path>, target: Option<usize>, format: OutputFormat) -> Result<()> {
  let (config_path, project) = match config_path {
    Some(path) => {
      let path = dir.join(path);
      let project = config::load(&path).with_context(|| format!("Failed to load {}", path.display()))?;
      (path, project)
    }
    None => config::discover(dir).context("Failed to load config")?,
  };
  let root = config_path.parent().unwrap_or(dir).to_path_buf();
  info!(config = %config_path.display(), targets = project.build.len(), "loaded config");

  let targets: Vec<(usize, BuildTargetConfig)> = match target {
    Some(index) => {
      let selected = project
        .build
        .get(index)
        .cloned()
        .with_context(|| format!("No build target {} (config has {})", index, project.build.len()))?;
      vec![(index, selected)]
    }
    None => project.build.into_iter().enumerate().collect(),
  };

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let started = Instant::now();
  let mut reports = Vec::with_capacity(targets.len());

  for (index, target) in targets {
    let mut pipeline = BuildPipeline::for_project(target, &root)
      .with_context(|| format!("Failed to set up build target {}", index))?;
    let input = pipeline.input_string();

    let outputs = match rt.block_on(pipeline.run()) {
      Ok(outputs) => outputs,
      Err(e) => {
        if !format.is_json() {
          print_error(&format!("[{}] {}: {}", index, input, e));
        }
        bail!("Build target {} failed: {}", index, e);
      }
    };

    if !format.is_json() {
      for output in &outputs {
        print_success(&format!(
          "[{}] {} {} {}",
          index,
          input,
          symbols::ARROW,
          filepath_name(&output.filepath, &root)
        ));
      }
    }

    reports.push(TargetReport {
      target: index,
      input,
      files: outputs.into_iter().map(|o| o.filepath).collect(),
    });
  }

  if format.is_json() {
    print_json(&reports)?;
  } else {
    let written: usize = reports.iter().map(|r| r.files.len()).sum();
    println!();
    print_info(&format!("Built {} target(s)", reports.len()));
    print_stat("Files written", &written.to_string());
    print_stat("Elapsed", &format_duration(started.elapsed()));
  }

  Ok(())
}
