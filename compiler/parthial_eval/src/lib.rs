#![deny(clippy::arithmetic_side_effects)]
//! Parthial Eval - a sandboxed evaluator for a small Lisp.
//!
//! This crate runs untrusted programs inside a host process. Every session
//! is bounded by three budgets: live objects, recursion depth and total
//! evaluation steps. Adversarial input ends in a [`LispError`], never in
//! unbounded memory or CPU use.
//!
//! # Architecture
//!
//! - `Value`: the expression tree and runtime data, one representation
//! - `Context`: scope chain, globals table and object budget
//! - `EvalContext`: the evaluation loop with depth and step budgets
//! - `Globals` / `BuiltinSpec`: table-driven native procedures
//! - `ContextSnapshot`: versioned encoding for pausing and resuming
//!
//! Reading source text is the host's job; programs arrive as `Value` trees.
//!
//! ```text
//! let globals = Arc::new(default_globals());
//! let mut ctx = EvalContext::builder(globals).max_steps(1_000).build();
//! let out = ctx.run(program)?;
//! ```

pub mod builtins;
mod context;
pub mod errors;
mod eval;
mod scope;
mod snapshot;
mod value;

#[cfg(test)]
mod test_helpers;

pub use builtins::{
    default_globals, Arity, Builtin, BuiltinFn, BuiltinSpec, Globals, CORE_BUILTINS, MAX_LIST_LEN,
};
pub use context::{Context, ScopeGuard, Things, DEFAULT_MAX_THINGS};
pub use errors::{ErrorCategory, EvalResult, Expected, Limit, LispError};
pub use eval::{
    EvalContext, EvalContextBuilder, Evaluated, Limits, DEFAULT_MAX_DEPTH, DEFAULT_MAX_STEPS,
};
pub use scope::{Scope, ScopeArena, ScopeHandle, ScopeId};
pub use snapshot::{
    ChainMap, ContextSnapshot, EncodedFunction, EncodedScope, EncodedValue, SnapshotError,
    FORMAT_VERSION,
};
pub use value::{Brief, FunctionValue, Heap, Value};
