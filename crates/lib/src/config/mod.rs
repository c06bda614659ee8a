//! Build target configuration.
//!
//! Targets are read from `sheaf.json` (or the `"sheaf"` key of `package.json`):
//!
//! ```json
//! {
//!   "build": [
//!     { "input": "src/js/bar.js", "output": "temp", "afterEach": "done()" },
//!     { "input": ["a.css", "b.css"], "output": "www/%hash%.css" }
//!   ]
//! }
//! ```
//!
//! Keys other than `input`, `output`, and the hook names are kept as opaque
//! options for the file factory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::consts::{CONFIG_FILE_NAME, MANIFEST_CONFIG_KEY, MANIFEST_FILE_NAME};
use crate::filepath::is_unique_filepath;
use crate::hook::{Hook, HookKind};

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("no sheaf.json or \"sheaf\" key in package.json found in {0}")]
  NotFound(PathBuf),

  #[error("config defines no build targets")]
  NoTargets,

  #[error("build target {index} has no input")]
  EmptyInput { index: usize },

  #[error("build target {index} has no output")]
  EmptyOutput { index: usize },

  #[error("build target {index} writes {inputs} inputs to the single file '{output}'")]
  AmbiguousOutput { index: usize, inputs: usize, output: String },

  /// `%hash%` or `%date%` appears in a directory component of the output.
  #[error("build target {index} output '{output}' has a unique token outside the file name")]
  TokenInDirectory { index: usize, output: String },
}

/// One input path or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Input {
  One(String),
  Many(Vec<String>),
}

impl Input {
  pub fn paths(&self) -> Vec<&str> {
    match self {
      Input::One(path) => vec![path.as_str()],
      Input::Many(paths) => paths.iter().map(String::as_str).collect(),
    }
  }

  pub fn len(&self) -> usize {
    match self {
      Input::One(_) => 1,
      Input::Many(paths) => paths.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    match self {
      Input::One(path) => path.is_empty(),
      Input::Many(paths) => paths.iter().all(|p| p.is_empty()),
    }
  }
}

impl Default for Input {
  fn default() -> Self {
    Input::Many(Vec::new())
  }
}

impl From<&str> for Input {
  fn from(path: &str) -> Self {
    Input::One(path.to_string())
  }
}

impl From<Vec<String>> for Input {
  fn from(paths: Vec<String>) -> Self {
    Input::Many(paths)
  }
}

impl From<&[&str]> for Input {
  fn from(paths: &[&str]) -> Self {
    Input::Many(paths.iter().map(|p| p.to_string()).collect())
  }
}

/// Configuration of a single build target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTargetConfig {
  pub input: Input,

  /// File or directory path, optionally containing `%hash%` or `%date%`.
  pub output: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub before: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub after: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub after_each: Option<String>,

  /// Pass-through options for the file factory.
  #[serde(flatten)]
  pub options: Map<String, Value>,
}

impl BuildTargetConfig {
  pub fn new(input: impl Into<Input>, output: impl Into<String>) -> Self {
    Self {
      input: input.into(),
      output: output.into(),
      ..Default::default()
    }
  }

  pub fn hook_source(&self, kind: HookKind) -> Option<&str> {
    match kind {
      HookKind::Before => self.before.as_deref(),
      HookKind::AfterEach => self.after_each.as_deref(),
      HookKind::After => self.after.as_deref(),
    }
  }

  /// The configured hook for `kind`, as Lua source.
  pub fn hook(&self, kind: HookKind) -> Option<Hook> {
    self.hook_source(kind).map(Hook::lua)
  }

  /// Whether the output names a single file rather than a directory.
  pub fn output_is_file(&self) -> bool {
    output_is_file(&self.output)
  }

  pub fn validate(&self, index: usize) -> Result<(), ConfigError> {
    if self.input.is_empty() {
      return Err(ConfigError::EmptyInput { index });
    }
    if self.output.is_empty() {
      return Err(ConfigError::EmptyOutput { index });
    }
    let parent = Path::new(&self.output).parent().map(|p| p.to_string_lossy());
    if (self.output.ends_with('/') && is_unique_filepath(&self.output))
      || parent.is_some_and(|p| is_unique_filepath(&p))
    {
      return Err(ConfigError::TokenInDirectory {
        index,
        output: self.output.clone(),
      });
    }
    if self.output_is_file() && !is_unique_filepath(&self.output) && self.input.len() > 1 {
      return Err(ConfigError::AmbiguousOutput {
        index,
        inputs: self.input.len(),
        output: self.output.clone(),
      });
    }
    Ok(())
  }
}

/// Whether `output` names a file rather than a directory.
///
/// A trailing `/` always means a directory. Otherwise the last component is a
/// file name when it carries a unique token or an extension.
pub fn output_is_file(output: &str) -> bool {
  if output.ends_with('/') {
    return false;
  }
  let path = Path::new(output);
  let name_is_unique = path
    .file_name()
    .is_some_and(|name| is_unique_filepath(&name.to_string_lossy()));
  name_is_unique || path.extension().is_some()
}

/// All build targets of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
  #[serde(default)]
  pub build: Vec<BuildTargetConfig>,
}

impl ProjectConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.build.is_empty() {
      return Err(ConfigError::NoTargets);
    }
    for (index, target) in self.build.iter().enumerate() {
      target.validate(index)?;
    }
    Ok(())
  }
}

/// Load and validate a JSON config file.
pub fn load(path: &Path) -> Result<ProjectConfig, ConfigError> {
  let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  let config: ProjectConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
    path: path.to_path_buf(),
    source,
  })?;
  config.validate()?;
  debug!(path = %path.display(), targets = config.build.len(), "loaded config");
  Ok(config)
}

/// Find and load the config for the project in `dir`.
///
/// Returns the path the config was read from alongside it.
pub fn discover(dir: &Path) -> Result<(PathBuf, ProjectConfig), ConfigError> {
  let config_path = dir.join(CONFIG_FILE_NAME);
  if config_path.is_file() {
    return Ok((config_path.clone(), load(&config_path)?));
  }

  let manifest_path = dir.join(MANIFEST_FILE_NAME);
  if manifest_path.is_file() {
    let content = std::fs::read_to_string(&manifest_path).map_err(|source| ConfigError::Read {
      path: manifest_path.clone(),
      source,
    })?;
    let parse_err = |source| ConfigError::Parse {
      path: manifest_path.clone(),
      source,
    };
    let mut manifest: Map<String, Value> = serde_json::from_str(&content).map_err(parse_err)?;
    if let Some(section) = manifest.remove(MANIFEST_CONFIG_KEY) {
      let config: ProjectConfig = serde_json::from_value(section).map_err(parse_err)?;
      config.validate()?;
      debug!(path = %manifest_path.display(), targets = config.build.len(), "loaded config from manifest");
      return Ok((manifest_path, config));
    }
  }

  Err(ConfigError::NotFound(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::project;

  mod parse {
    use super::*;

    #[test]
    fn single_input_and_hooks() {
      let target: BuildTargetConfig = serde_json::from_str(
        r#"{ "input": "src/js/bar.js", "output": "temp", "before": "done()", "afterEach": "done()" }"#,
      )
      .unwrap();

      assert_eq!(target.input, Input::One("src/js/bar.js".to_string()));
      assert_eq!(target.output, "temp");
      assert_eq!(target.hook_source(HookKind::Before), Some("done()"));
      assert_eq!(target.hook_source(HookKind::AfterEach), Some("done()"));
      assert_eq!(target.hook_source(HookKind::After), None);
      assert!(target.options.is_empty());
    }

    #[test]
    fn input_list() {
      let target: BuildTargetConfig =
        serde_json::from_str(r#"{ "input": ["a.js", "b.js"], "output": "temp" }"#).unwrap();
      assert_eq!(target.input.paths(), vec!["a.js", "b.js"]);
      assert_eq!(target.input.len(), 2);
    }

    #[test]
    fn unknown_keys_become_options() {
      let target: BuildTargetConfig = serde_json::from_str(
        r#"{ "input": "a.js", "output": "temp", "fileExtensions": { "html": ["nunjs"] }, "minify": true }"#,
      )
      .unwrap();

      assert_eq!(target.options.len(), 2);
      assert_eq!(target.options.get("minify"), Some(&Value::Bool(true)));
      assert!(target.options.contains_key("fileExtensions"));
    }

    #[test]
    fn missing_output_is_parse_error() {
      assert!(serde_json::from_str::<BuildTargetConfig>(r#"{ "input": "a.js" }"#).is_err());
    }
  }

  mod validate {
    use super::*;

    #[test]
    fn file_output_with_single_input() {
      BuildTargetConfig::new("a.js", "dist/app.js").validate(0).unwrap();
    }

    #[test]
    fn file_output_with_many_inputs_rejected() {
      let target = BuildTargetConfig::new(&["a.js", "b.js"][..], "dist/app.js");
      assert!(matches!(
        target.validate(3),
        Err(ConfigError::AmbiguousOutput { index: 3, inputs: 2, .. })
      ));
    }

    #[test]
    fn unique_file_output_with_many_inputs_allowed() {
      BuildTargetConfig::new(&["a.js", "b.js"][..], "dist/app-%hash%.js")
        .validate(0)
        .unwrap();
    }

    #[test]
    fn directory_output_with_many_inputs_allowed() {
      BuildTargetConfig::new(&["a.js", "b.js"][..], "temp").validate(0).unwrap();
      BuildTargetConfig::new(&["a.js", "b.js"][..], "out.d/").validate(0).unwrap();
    }

    #[test]
    fn empty_fields_rejected() {
      assert!(matches!(
        BuildTargetConfig::new("", "temp").validate(0),
        Err(ConfigError::EmptyInput { index: 0 })
      ));
      assert!(matches!(
        BuildTargetConfig::new("a.js", "").validate(1),
        Err(ConfigError::EmptyOutput { index: 1 })
      ));
    }

    #[test]
    fn token_in_directory_rejected() {
      assert!(matches!(
        BuildTargetConfig::new("a.js", "www/%hash%/app.js").validate(2),
        Err(ConfigError::TokenInDirectory { index: 2, .. })
      ));
      assert!(matches!(
        BuildTargetConfig::new("a.js", "www/main-%hash%/").validate(0),
        Err(ConfigError::TokenInDirectory { index: 0, .. })
      ));
    }

    #[test]
    fn project_without_targets_rejected() {
      assert!(matches!(ProjectConfig::default().validate(), Err(ConfigError::NoTargets)));
    }
  }

  mod output_kind {
    use super::*;

    #[test]
    fn extension_means_file() {
      assert!(output_is_file("dist/app.js"));
      assert!(!output_is_file("dist"));
    }

    #[test]
    fn token_without_extension_is_file() {
      assert!(output_is_file("www/main-%hash%"));
      assert!(output_is_file("www/%date%"));
    }

    #[test]
    fn trailing_slash_is_directory() {
      assert!(!output_is_file("dist/v1.2/"));
      assert!(!output_is_file("out.d/"));
      assert!(output_is_file("dist/v1.2"));
    }
  }

  mod discovery {
    use super::*;

    #[test]
    fn prefers_config_file() {
      let temp = project(&[
        (CONFIG_FILE_NAME, r#"{ "build": [{ "input": "a.js", "output": "temp" }] }"#),
        (
          MANIFEST_FILE_NAME,
          r#"{ "name": "demo", "sheaf": { "build": [{ "input": "b.js", "output": "temp" }] } }"#,
        ),
      ]);

      let (path, config) = discover(temp.path()).unwrap();

      assert_eq!(path, temp.path().join(CONFIG_FILE_NAME));
      assert_eq!(config.build[0].input, Input::from("a.js"));
    }

    #[test]
    fn falls_back_to_manifest_key() {
      let temp = project(&[(
        MANIFEST_FILE_NAME,
        r#"{ "name": "demo", "sheaf": { "build": [{ "input": "b.js", "output": "temp" }] } }"#,
      )]);

      let (path, config) = discover(temp.path()).unwrap();

      assert_eq!(path, temp.path().join(MANIFEST_FILE_NAME));
      assert_eq!(config.build.len(), 1);
    }

    #[test]
    fn manifest_without_key_is_not_found() {
      let temp = project(&[(MANIFEST_FILE_NAME, r#"{ "name": "demo" }"#)]);
      assert!(matches!(discover(temp.path()), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn invalid_json_names_file() {
      let temp = project(&[(CONFIG_FILE_NAME, "{ not json")]);
      match load(&temp.path().join(CONFIG_FILE_NAME)) {
        Err(ConfigError::Parse { path, .. }) => assert_eq!(path, temp.path().join(CONFIG_FILE_NAME)),
        other => panic!("expected parse error, got {:?}", other),
      }
    }

    #[test]
    fn load_validates() {
      let temp = project(&[(CONFIG_FILE_NAME, r#"{ "build": [] }"#)]);
      assert!(matches!(
        load(&temp.path().join(CONFIG_FILE_NAME)),
        Err(ConfigError::NoTargets)
      ));
    }
  }
}
