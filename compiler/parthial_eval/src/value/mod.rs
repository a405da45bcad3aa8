//! Runtime values: the expression tree and the data it evaluates to.
//!
//! Code and data share one representation. A parsed program is a tree of
//! [`Value`]s, and evaluating it produces more of them.
//!
//! # Heap enforcement
//!
//! Heap-backed variants wrap a [`Heap<T>`], whose constructor is
//! crate-private. Build values through the factory methods:
//!
//! ```text
//! let call = Value::list(vec![Value::symbol("cons"), Value::int(1), Value::nil()]);
//! ```
//!
//! Heap payloads are `Arc`-backed, so values are `Send + Sync` and a
//! globals table can be shared by sandboxes on different threads. Only
//! heap-backed values have identity, and only they occupy entries in a
//! context's object registry; integers are plain data.

mod function;
mod heap;

use std::fmt;

use smallvec::SmallVec;

use crate::builtins::Builtin;
use crate::errors::{type_mismatch, unbound_symbol, EvalResult};
use crate::EvalContext;

pub use function::FunctionValue;
pub use heap::Heap;

/// Arguments collected for a call; most calls take a handful.
pub(crate) type ArgVec = SmallVec<[Value; 4]>;

/// A value in the object language.
#[derive(Clone)]
pub enum Value {
    /// Integer literal; evaluates to itself.
    Int(i64),
    /// Identifier, looked up in the scope chain when evaluated.
    Symbol(Heap<str>),
    /// Ordered sequence of values. Non-empty lists evaluate as calls.
    List(Heap<Vec<Value>>),
    /// Closure created by `lambda`.
    Function(Heap<FunctionValue>),
    /// Native procedure from the globals table.
    Builtin(Heap<Builtin>),
}

impl Value {
    // Factories

    #[inline]
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    pub fn symbol(name: impl Into<Heap<str>>) -> Self {
        Value::Symbol(name.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Heap::new(items))
    }

    /// The empty list, the only false value.
    pub fn nil() -> Self {
        Value::list(Vec::new())
    }

    pub fn function(function: FunctionValue) -> Self {
        Value::Function(Heap::new(function))
    }

    pub fn builtin(builtin: Builtin) -> Self {
        Value::Builtin(Heap::new(builtin))
    }

    // Inspection

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_symbol(&self) -> Option<&Heap<str>> {
        match self {
            Value::Symbol(name) => Some(name),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    pub fn as_function(&self) -> Option<&FunctionValue> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    #[inline]
    pub fn as_builtin(&self) -> Option<&Builtin> {
        match self {
            Value::Builtin(b) => Some(b),
            _ => None,
        }
    }

    /// Everything except the empty list is true.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::List(items) if items.is_empty())
    }

    #[inline]
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Builtin(_))
    }

    /// Whether applying this value passes its arguments unevaluated.
    #[inline]
    pub fn quotes(&self) -> bool {
        matches!(self, Value::Builtin(b) if b.quotes())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
        }
    }

    /// Identity of the heap allocation, `None` for plain data.
    pub(crate) fn identity(&self) -> Option<usize> {
        match self {
            Value::Int(_) => None,
            Value::Symbol(h) => Some(h.identity()),
            Value::List(h) => Some(h.identity()),
            Value::Function(h) => Some(h.identity()),
            Value::Builtin(h) => Some(h.identity()),
        }
    }

    /// Sub-values that must be registered along with this one.
    ///
    /// Used by recursive registration, never by evaluation.
    pub fn children(&self) -> &[Value] {
        match self {
            Value::List(items) => items,
            Value::Function(f) => std::slice::from_ref(f.body()),
            Value::Int(_) | Value::Symbol(_) | Value::Builtin(_) => &[],
        }
    }

    /// Evaluate one node. Budgets are enforced by [`EvalContext::eval`],
    /// which is what recursive evaluation must go through.
    pub fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        match self {
            Value::Symbol(name) => ctx.get(name).ok_or_else(|| unbound_symbol(self)),
            Value::List(items) => {
                let Some((head, rest)) = items.split_first() else {
                    return Err(type_mismatch(self, "a callable expression"));
                };
                let callee = ctx.eval(head)?;
                if callee.quotes() {
                    return ctx.call(&callee, rest);
                }
                let mut args = ArgVec::with_capacity(rest.len());
                for arg in rest {
                    args.push(ctx.eval(arg)?);
                }
                ctx.call(&callee, &args)
            }
            Value::Int(_) | Value::Function(_) | Value::Builtin(_) => Ok(self.clone()),
        }
    }

    /// Display form truncated for error messages.
    pub fn brief(&self) -> Brief<'_> {
        Brief(self)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            // Builtins compare by identity: two registrations are two builtins.
            (Value::Builtin(a), Value::Builtin(b)) => Heap::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Symbol(name) => write!(f, "Symbol({:?})", &**name),
            Value::List(items) => f.debug_tuple("List").field(&**items).finish(),
            Value::Function(func) => f.debug_tuple("Function").field(&**func).finish(),
            Value::Builtin(b) => f.debug_tuple("Builtin").field(&**b).finish(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, None)
    }
}

/// Truncating display wrapper; see [`Value::brief`].
pub struct Brief<'a>(&'a Value);

/// Elements shown per list in brief form.
const BRIEF_WIDTH: usize = 8;

/// Nesting shown in brief form.
const BRIEF_DEPTH: usize = 4;

impl fmt::Display for Brief<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self.0, Some(BRIEF_DEPTH))
    }
}

/// `depth` of `None` prints everything.
fn write_value(f: &mut fmt::Formatter<'_>, value: &Value, depth: Option<usize>) -> fmt::Result {
    match value {
        Value::Int(n) => write!(f, "{n}"),
        Value::Symbol(name) => f.write_str(name),
        Value::Function(func) => write!(f, "<function {}>", func.name()),
        Value::Builtin(b) => write!(f, "<builtin {}>", b.name()),
        Value::List(items) => {
            if depth == Some(0) && !items.is_empty() {
                return f.write_str("(...)");
            }
            let inner = depth.map(|d| d.saturating_sub(1));
            let shown = if depth.is_some() {
                BRIEF_WIDTH
            } else {
                items.len()
            };
            f.write_str("(")?;
            for (i, item) in items.iter().take(shown).enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                parthial_stack::ensure_sufficient_stack(|| write_value(f, item, inner))?;
            }
            if items.len() > shown {
                f.write_str(" ...")?;
            }
            f.write_str(")")
        }
    }
}
