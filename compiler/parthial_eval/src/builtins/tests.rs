use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;
use crate::test_helpers::{int, list, sym};
use crate::{EvalContext, LispError};

fn count_args(_this: &Value, _ctx: &mut EvalContext, args: &[Value]) -> EvalResult {
    Ok(Value::int(i64::try_from(args.len()).unwrap_or(i64::MAX)))
}

fn first_raw(_this: &Value, _ctx: &mut EvalContext, args: &[Value]) -> EvalResult {
    Ok(args.first().cloned().unwrap_or_else(Value::nil))
}

const PAIR: BuiltinSpec = BuiltinSpec {
    name: "pair",
    arity: Arity::Fixed(2),
    quotes: false,
    handler: count_args,
};

const COUNT: BuiltinSpec = BuiltinSpec {
    name: "count",
    arity: Arity::Variadic,
    quotes: false,
    handler: count_args,
};

const RAW: BuiltinSpec = BuiltinSpec {
    name: "raw",
    arity: Arity::Variadic,
    quotes: true,
    handler: first_raw,
};

fn context_with(specs: &[BuiltinSpec]) -> EvalContext {
    let mut globals = default_globals();
    globals.extend(specs);
    EvalContext::new(Arc::new(globals))
}

#[test]
fn test_default_globals_names() {
    let globals = default_globals();
    assert_eq!(
        globals.names(),
        ["apply", "cons", "eval", "if", "lambda", "progn", "quote", "set"]
    );
    assert_eq!(globals.len(), CORE_BUILTINS.len());
}

#[test]
fn test_register_returns_stored_value() {
    let mut globals = Globals::new();
    assert!(globals.is_empty());
    let value = globals.register(&PAIR);
    assert!(globals.contains("pair"));
    assert_eq!(globals.get("pair"), Some(&value));

    let builtin = value.as_builtin().unwrap();
    assert_eq!(builtin.name(), "pair");
    assert_eq!(builtin.arity(), Arity::Fixed(2));
    assert!(!builtin.quotes());
}

#[test]
fn test_register_replaces_same_name() {
    let mut globals = Globals::new();
    let first = globals.register(&PAIR);
    let second = globals.register(&PAIR);
    assert_ne!(first, second);
    assert_eq!(globals.get("pair"), Some(&second));
    assert_eq!(globals.len(), 1);
}

#[test]
fn test_fixed_arity_checked_before_handler() {
    let mut ctx = context_with(&[PAIR]);
    let err = ctx.run(list([sym("pair"), int(1)])).unwrap_err();
    match err {
        LispError::ArgCount {
            callable,
            expected,
            got,
        } => {
            assert_eq!(callable.to_string(), "<builtin pair>");
            assert_eq!(expected, Expected::Exactly(2));
            assert_eq!(got, 1);
        }
        other => panic!("expected ArgCount, got {other:?}"),
    }
    assert_eq!(ctx.run(list([sym("pair"), int(1), int(2)])).unwrap().value, int(2));
}

#[test]
fn test_variadic_accepts_any_count() {
    let mut ctx = context_with(&[COUNT]);
    for n in 0..6 {
        let mut call = vec![sym("count")];
        call.extend((0..n).map(int));
        assert_eq!(ctx.run(Value::list(call)).unwrap().value, int(n));
    }
}

#[test]
fn test_quoting_builtin_receives_unevaluated_args() {
    let mut ctx = context_with(&[RAW]);
    let arg = list([sym("undefined"), int(1)]);
    let out = ctx.run(list([sym("raw"), arg.clone()])).unwrap();
    assert_eq!(out.value, arg);
}

#[test]
fn test_non_quoting_builtin_receives_evaluated_args() {
    let mut ctx = context_with(&[COUNT]);
    let err = ctx
        .run(list([sym("count"), sym("undefined")]))
        .unwrap_err();
    assert!(matches!(err, LispError::Name { .. }));
}

#[test]
fn test_builtin_spec_debug_omits_handler() {
    let debug = format!("{PAIR:?}");
    assert!(debug.starts_with("BuiltinSpec { name: \"pair\""), "{debug}");
}

proptest! {
    #[test]
    fn prop_fixed_arity_rejects_other_counts(expected in 0usize..6, got in 0usize..6) {
        let spec = BuiltinSpec {
            name: "fixed",
            arity: Arity::Fixed(expected),
            quotes: false,
            handler: count_args,
        };
        let mut ctx = context_with(&[spec]);
        let mut call = vec![sym("fixed")];
        call.extend((0..got).map(|i| int(i64::try_from(i).unwrap())));
        let result = ctx.run(Value::list(call));
        if got == expected {
            prop_assert_eq!(result.unwrap().value, int(i64::try_from(got).unwrap()));
        } else {
            let is_arg_count = matches!(
                result,
                Err(LispError::ArgCount { expected: Expected::Exactly(n), got: g, .. })
                    if n == expected && g == got
            );
            prop_assert!(is_arg_count);
        }
    }
}
