//! Lifecycle hooks.
//!
//! A build target may carry three optional hooks:
//!
//! - `before`: runs once before any file is read
//! - `afterEach`: runs once per file after its final content is computed
//! - `after`: runs once after every output has been written
//!
//! A hook receives the run's [`HookContext`] and a [`Done`] completion handle.
//! The runner awaits the handle; signalling with a failure value aborts the
//! build with that value as the error. A hook that returns an error from its
//! body is treated the same as one that signals failure.
//!
//! Hooks are either Rust callbacks ([`Hook::callback`]) or Lua source evaluated
//! in a fresh interpreter per invocation ([`Hook::lua`]).

mod lua;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub use lua::LuaHook;

/// Context key holding the target's input paths.
pub const INPUT_KEY: &str = "input";
/// Context key holding the target's configured output.
pub const OUTPUT_KEY: &str = "output";
/// Context key exposing the current file's content to `afterEach`.
pub const CONTENT_KEY: &str = "content";
/// Context key exposing the current file's path to `afterEach`.
pub const FILEPATH_KEY: &str = "filepath";

/// Which lifecycle stage a hook belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
  Before,
  AfterEach,
  After,
}

impl HookKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      HookKind::Before => "before",
      HookKind::AfterEach => "afterEach",
      HookKind::After => "after",
    }
  }
}

impl fmt::Display for HookKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Mutable key/value record shared by every hook of a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookContext(BTreeMap<String, Value>);

impl HookContext {
  pub fn new() -> Self {
    Self::default()
  }

  /// A fresh context describing a target's inputs and output.
  pub fn seeded(input: &[PathBuf], output: &str) -> Self {
    let mut context = Self::new();
    let input: Vec<Value> = input
      .iter()
      .map(|p| Value::String(p.to_string_lossy().into_owned()))
      .collect();
    context.insert(INPUT_KEY, Value::Array(input));
    context.insert(OUTPUT_KEY, Value::String(output.to_string()));
    context
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  /// The value at `key` if it is a string.
  pub fn get_str(&self, key: &str) -> Option<&str> {
    self.0.get(key).and_then(Value::as_str)
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
    self.0.insert(key.into(), value.into())
  }

  pub fn remove(&mut self, key: &str) -> Option<Value> {
    self.0.remove(key)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.0.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn as_map(&self) -> &BTreeMap<String, Value> {
    &self.0
  }
}

impl From<BTreeMap<String, Value>> for HookContext {
  fn from(map: BTreeMap<String, Value>) -> Self {
    Self(map)
  }
}

/// The failure value a hook reports, rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure(pub String);

impl fmt::Display for HookFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for HookFailure {
  fn from(reason: String) -> Self {
    Self(reason)
  }
}

impl From<&str> for HookFailure {
  fn from(reason: &str) -> Self {
    Self(reason.to_string())
  }
}

/// Completion handle passed to every hook invocation.
///
/// Consumed on use, so a hook can complete at most once. It may be moved into
/// a spawned task and signalled later.
#[derive(Debug)]
pub struct Done {
  tx: oneshot::Sender<Result<(), HookFailure>>,
}

impl Done {
  fn channel() -> (Self, oneshot::Receiver<Result<(), HookFailure>>) {
    let (tx, rx) = oneshot::channel();
    (Self { tx }, rx)
  }

  /// Signal successful completion.
  pub fn success(self) {
    self.complete(Ok(()));
  }

  /// Signal failure with `reason`.
  pub fn fail(self, reason: impl Into<HookFailure>) {
    self.complete(Err(reason.into()));
  }

  pub fn complete(self, result: Result<(), HookFailure>) {
    // The runner only stops listening once it has given up on the hook.
    let _ = self.tx.send(result);
  }
}

/// A hook body.
///
/// Context mutations must happen during `call`; `done` may be signalled
/// during the call or later from elsewhere.
pub trait HookFn: Send + Sync {
  fn call(&self, context: &mut HookContext, done: Done) -> Result<(), HookFailure>;
}

impl<F> HookFn for F
where
  F: Fn(&mut HookContext, Done) -> Result<(), HookFailure> + Send + Sync,
{
  fn call(&self, context: &mut HookContext, done: Done) -> Result<(), HookFailure> {
    self(context, done)
  }
}

/// A configured hook.
#[derive(Clone)]
pub enum Hook {
  Callback(Arc<dyn HookFn>),
  Lua(LuaHook),
}

impl Hook {
  pub fn callback<F>(f: F) -> Self
  where
    F: Fn(&mut HookContext, Done) -> Result<(), HookFailure> + Send + Sync + 'static,
  {
    Hook::Callback(Arc::new(f))
  }

  pub fn lua(source: impl Into<String>) -> Self {
    Hook::Lua(LuaHook::new(source))
  }

  fn body(&self) -> &dyn HookFn {
    match self {
      Hook::Callback(f) => f.as_ref(),
      Hook::Lua(hook) => hook,
    }
  }
}

impl From<Arc<dyn HookFn>> for Hook {
  fn from(f: Arc<dyn HookFn>) -> Self {
    Hook::Callback(f)
  }
}

impl fmt::Debug for Hook {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Hook::Callback(_) => f.write_str("Hook::Callback(..)"),
      Hook::Lua(hook) => f.debug_tuple("Hook::Lua").field(&hook.source()).finish(),
    }
  }
}

/// Errors produced by running a hook.
#[derive(Debug, Error)]
pub enum HookError {
  /// The hook signalled failure or its body returned an error.
  #[error("{reason}")]
  Failed { kind: HookKind, reason: String },

  /// The completion handle was dropped without being signalled.
  #[error("{kind} hook finished without signalling completion")]
  Abandoned { kind: HookKind },
}

impl HookError {
  pub fn kind(&self) -> HookKind {
    match self {
      HookError::Failed { kind, .. } | HookError::Abandoned { kind } => *kind,
    }
  }
}

/// Run `hook` against `context` and wait for it to signal completion.
pub async fn run_hook(kind: HookKind, hook: &Hook, context: &mut HookContext) -> Result<(), HookError> {
  debug!(hook = %kind, "running hook");

  let (done, rx) = Done::channel();
  if let Err(failure) = hook.body().call(context, done) {
    warn!(hook = %kind, reason = %failure, "hook failed");
    return Err(HookError::Failed {
      kind,
      reason: failure.0,
    });
  }

  match rx.await {
    Ok(Ok(())) => {
      debug!(hook = %kind, "hook complete");
      Ok(())
    }
    Ok(Err(failure)) => {
      warn!(hook = %kind, reason = %failure, "hook failed");
      Err(HookError::Failed {
        kind,
        reason: failure.0,
      })
    }
    Err(_) => {
      warn!(hook = %kind, "hook dropped its completion handle");
      Err(HookError::Abandoned { kind })
    }
  }
}
