//! Tree-building shorthands for unit tests.
//!
//! Programs are built directly as `Value` trees; there is no reader here.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use crate::{default_globals, EvalContext, Globals, Value};

pub fn int(n: i64) -> Value {
    Value::int(n)
}

pub fn sym(name: &str) -> Value {
    Value::symbol(name)
}

pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
    Value::list(items.into_iter().collect())
}

pub fn globals() -> Arc<Globals> {
    Arc::new(default_globals())
}

/// Context with the reference built-ins and default budgets.
pub fn ctx() -> EvalContext {
    EvalContext::new(globals())
}

/// `run` a program, panicking on error.
pub fn run(ctx: &mut EvalContext, program: Value) -> Value {
    match ctx.run(program) {
        Ok(out) => out.value,
        Err(err) => panic!("evaluation failed: {err}"),
    }
}
