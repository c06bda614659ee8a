//! Hooks written as Lua source.
//!
//! The source is a chunk run with two globals:
//!
//! - `context`: the run's [`HookContext`] as a table; changes are copied back
//! - `done(err)`: completion callback; `nil`/`false`/no argument is success
//!
//! Every invocation gets a fresh interpreter, so hooks cannot leak state into
//! each other through Lua globals.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::prelude::*;

use super::{Done, HookContext, HookFailure, HookFn};

/// Lua hook source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuaHook {
  source: String,
}

impl LuaHook {
  pub fn new(source: impl Into<String>) -> Self {
    Self { source: source.into() }
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  fn eval(&self, context: &mut HookContext, done: Done) -> LuaResult<()> {
    let lua = Lua::new();

    let slot = Rc::new(RefCell::new(Some(done)));
    let done_fn = lua.create_function(move |_, value: Option<LuaValue>| {
      if let Some(done) = slot.borrow_mut().take() {
        done.complete(completion(value.unwrap_or(LuaValue::Nil)));
      }
      Ok(())
    })?;

    let globals = lua.globals();
    globals.set("done", done_fn)?;
    globals.set("context", lua.to_value(context.as_map())?)?;

    lua.load(&self.source).set_name("=hook").exec()?;

    let updated: LuaValue = globals.get("context")?;
    *context = lua.from_value(updated)?;
    Ok(())
  }
}

impl HookFn for LuaHook {
  fn call(&self, context: &mut HookContext, done: Done) -> Result<(), HookFailure> {
    self.eval(context, done).map_err(|e| HookFailure(error_message(&e)))
  }
}

/// Map the value passed to `done` onto a completion result.
fn completion(value: LuaValue) -> Result<(), HookFailure> {
  match value {
    LuaValue::Nil | LuaValue::Boolean(false) => Ok(()),
    LuaValue::Boolean(true) => Err(HookFailure::from("true")),
    LuaValue::Integer(i) => Err(HookFailure(i.to_string())),
    LuaValue::Number(n) => Err(HookFailure(n.to_string())),
    LuaValue::String(s) => Err(HookFailure(format!("{}", s.to_string_lossy()))),
    LuaValue::Error(e) => Err(HookFailure(error_message(&e))),
    other => Err(HookFailure(other.type_name().to_string())),
  }
}

fn error_message(err: &LuaError) -> String {
  match err {
    // drop the traceback lua appends to runtime errors
    LuaError::RuntimeError(msg) => msg.lines().next().unwrap_or_default().to_string(),
    LuaError::CallbackError { cause, .. } => error_message(cause),
    other => other.to_string(),
  }
}
