//! The reference built-ins: the special forms and list primitives every
//! globals table starts from.

use super::{Arity, BuiltinSpec};
use crate::errors::{
    limit_exceeded, wrong_arg_count, wrong_arg_type, EvalResult, Expected, Limit, LispError,
};
use crate::value::{FunctionValue, Heap, Value};
use crate::EvalContext;

/// Longest list `cons` may produce.
pub const MAX_LIST_LEN: usize = 1024;

/// Display name given to closures built by `lambda`.
const LAMBDA_NAME: &str = "lambda";

/// Registration table for the reference built-ins.
pub const CORE_BUILTINS: &[BuiltinSpec] = &[
    BuiltinSpec {
        name: "eval",
        arity: Arity::Fixed(1),
        quotes: false,
        handler: builtin_eval,
    },
    BuiltinSpec {
        name: "apply",
        arity: Arity::Fixed(2),
        quotes: false,
        handler: builtin_apply,
    },
    BuiltinSpec {
        name: "progn",
        arity: Arity::Variadic,
        quotes: false,
        handler: builtin_progn,
    },
    BuiltinSpec {
        name: "quote",
        arity: Arity::Fixed(1),
        quotes: true,
        handler: builtin_quote,
    },
    BuiltinSpec {
        name: "lambda",
        arity: Arity::Fixed(2),
        quotes: true,
        handler: builtin_lambda,
    },
    BuiltinSpec {
        name: "set",
        arity: Arity::Fixed(2),
        quotes: true,
        handler: builtin_set,
    },
    BuiltinSpec {
        name: "if",
        arity: Arity::Fixed(3),
        quotes: true,
        handler: builtin_if,
    },
    BuiltinSpec {
        name: "cons",
        arity: Arity::Fixed(2),
        quotes: false,
        handler: builtin_cons,
    },
];

/// `args` as a fixed-size array, or the arity error `invoke` would raise.
/// Handlers are reachable through [`CORE_BUILTINS`] without `invoke`.
fn fixed<'a, const N: usize>(
    this: &Value,
    args: &'a [Value],
) -> Result<&'a [Value; N], LispError> {
    <&[Value; N]>::try_from(args)
        .map_err(|_| wrong_arg_count(this, Expected::Exactly(N), args.len()))
}

/// `(eval x)`: evaluate an already-evaluated value once more.
fn builtin_eval(this: &Value, ctx: &mut EvalContext, args: &[Value]) -> EvalResult {
    let [expr] = fixed::<1>(this, args)?;
    ctx.eval(expr)
}

/// `(apply f args)`: call `f` with the elements of the list `args`.
fn builtin_apply(this: &Value, ctx: &mut EvalContext, args: &[Value]) -> EvalResult {
    let [callee, list] = fixed::<2>(this, args)?;
    let Some(items) = list.as_list() else {
        return Err(wrong_arg_type(this, 2, list, "a list"));
    };
    ctx.call(callee, items)
}

/// `(progn a ... z)`: the arguments are already evaluated in order; return
/// the last.
fn builtin_progn(this: &Value, _ctx: &mut EvalContext, args: &[Value]) -> EvalResult {
    args.last()
        .cloned()
        .ok_or_else(|| wrong_arg_count(this, Expected::AtLeast(1), 0))
}

/// `(quote x)`: `x`, unevaluated.
fn builtin_quote(this: &Value, _ctx: &mut EvalContext, args: &[Value]) -> EvalResult {
    let [expr] = fixed::<1>(this, args)?;
    Ok(expr.clone())
}

/// `(lambda (params...) body)`: a closure over a fresh child of the
/// current scope.
///
/// If the object budget refuses the closure, dropping it gives its scope
/// back at the next collection point.
fn builtin_lambda(this: &Value, ctx: &mut EvalContext, args: &[Value]) -> EvalResult {
    let [param_list, body] = fixed::<2>(this, args)?;
    let params = param_list
        .as_list()
        .and_then(|items| {
            items
                .iter()
                .map(|param| param.as_symbol().cloned())
                .collect::<Option<Vec<Heap<str>>>>()
        })
        .ok_or_else(|| wrong_arg_type(this, 1, param_list, "a list of symbols"))?;
    let scope = ctx.capture_scope();
    let function = FunctionValue::new(params, body.clone(), Heap::from(LAMBDA_NAME), scope);
    ctx.new_thing(Value::function(function))
}

/// `(set name expr)`: bind `name` in the innermost scope.
fn builtin_set(this: &Value, ctx: &mut EvalContext, args: &[Value]) -> EvalResult {
    let [name, expr] = fixed::<2>(this, args)?;
    let Some(name) = name.as_symbol() else {
        return Err(wrong_arg_type(this, 1, name, "a symbol"));
    };
    let value = ctx.eval(expr)?;
    ctx.define(name.clone(), value.clone());
    Ok(value)
}

/// `(if cond then else)`: only the chosen branch is evaluated.
fn builtin_if(this: &Value, ctx: &mut EvalContext, args: &[Value]) -> EvalResult {
    let [cond, then, otherwise] = fixed::<3>(this, args)?;
    let branch = if ctx.eval(cond)?.is_truthy() {
        then
    } else {
        otherwise
    };
    ctx.eval(branch)
}

/// `(cons x list)`: a new list with `x` in front.
fn builtin_cons(this: &Value, ctx: &mut EvalContext, args: &[Value]) -> EvalResult {
    let [head, list] = fixed::<2>(this, args)?;
    let Some(tail) = list.as_list() else {
        return Err(wrong_arg_type(this, 2, list, "a list"));
    };
    if tail.len() >= MAX_LIST_LEN {
        return Err(limit_exceeded(Limit::ListLength, list));
    }
    let mut items = Vec::with_capacity(tail.len().saturating_add(1));
    items.push(head.clone());
    items.extend_from_slice(tail);
    ctx.new_thing(Value::list(items))
}
