//! Native procedures and the globals table.
//!
//! Built-ins are declared as rows of a registration table
//! ([`BuiltinSpec`]): a name, an [`Arity`], a quoting flag and a plain
//! function pointer. Registering a row produces a [`Value::Builtin`] stored
//! in a [`Globals`] table, which a host builds once and shares, read-only,
//! between every context that uses it.
//!
//! # Calling convention
//!
//! A handler receives the builtin value itself (for error reporting), the
//! evaluation context, and the argument slice. For a `Fixed(n)` builtin the
//! framework has already checked that exactly `n` arguments were supplied;
//! a `Variadic` builtin validates its own arguments. When `quotes` is set,
//! arguments arrive unevaluated and the handler evaluates whichever of them
//! it needs through `ctx.eval`.

mod forms;

use std::fmt;

use rustc_hash::FxHashMap;

use crate::errors::{wrong_arg_count, EvalResult, Expected};
use crate::value::{Heap, Value};
use crate::EvalContext;

pub use forms::{CORE_BUILTINS, MAX_LIST_LEN};

/// Handler signature: `(self, env, args)`.
pub type BuiltinFn = fn(&Value, &mut EvalContext, &[Value]) -> EvalResult;

/// How many arguments a builtin accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Exactly this many; checked before the handler runs.
    Fixed(usize),
    /// Any number; the handler validates.
    Variadic,
}

/// One row of a registration table.
#[derive(Clone, Copy)]
pub struct BuiltinSpec {
    pub name: &'static str,
    pub arity: Arity,
    pub quotes: bool,
    pub handler: BuiltinFn,
}

impl fmt::Debug for BuiltinSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinSpec")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("quotes", &self.quotes)
            .finish_non_exhaustive()
    }
}

/// A registered native procedure.
pub struct Builtin {
    name: Heap<str>,
    arity: Arity,
    quotes: bool,
    handler: BuiltinFn,
}

impl Builtin {
    pub fn new(spec: &BuiltinSpec) -> Self {
        Builtin {
            name: Heap::from(spec.name),
            arity: spec.arity,
            quotes: spec.quotes,
            handler: spec.handler,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    #[inline]
    pub fn quotes(&self) -> bool {
        self.quotes
    }

    /// Check the argument count, then run the handler.
    ///
    /// `this` must be the value wrapping `self`; it is what errors report
    /// as the callable.
    pub fn invoke(&self, this: &Value, ctx: &mut EvalContext, args: &[Value]) -> EvalResult {
        if let Arity::Fixed(expected) = self.arity {
            if args.len() != expected {
                return Err(wrong_arg_count(this, Expected::Exactly(expected), args.len()));
            }
        }
        (self.handler)(this, ctx, args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &&*self.name)
            .field("arity", &self.arity)
            .field("quotes", &self.quotes)
            .finish_non_exhaustive()
    }
}

/// Read-only name → builtin table sitting beneath every scope chain.
#[derive(Clone, Debug, Default)]
pub struct Globals {
    table: FxHashMap<Heap<str>, Value>,
}

impl Globals {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the given rows.
    pub fn with_builtins(specs: &[BuiltinSpec]) -> Self {
        let mut globals = Self::new();
        globals.extend(specs);
        globals
    }

    /// Register one row, replacing any earlier entry of the same name.
    /// Returns the registered value.
    pub fn register(&mut self, spec: &BuiltinSpec) -> Value {
        let value = Value::builtin(Builtin::new(spec));
        self.table.insert(Heap::from(spec.name), value.clone());
        value
    }

    pub fn extend(&mut self, specs: &[BuiltinSpec]) {
        for spec in specs {
            self.register(spec);
        }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.table.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(|name| &**name).collect();
        names.sort_unstable();
        names
    }
}

/// A fresh table holding the reference built-ins.
pub fn default_globals() -> Globals {
    Globals::with_builtins(CORE_BUILTINS)
}

#[cfg(test)]
mod tests;
