//! End-to-end evaluation through the public API.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use common::{context, eval, eval_in, globals, read};
use parthial_eval::{
    ErrorCategory, EvalContext, Expected, Limit, LispError, Value, DEFAULT_MAX_STEPS,
};
use pretty_assertions::assert_eq;

#[test]
fn test_reader_sanity() {
    assert_eq!(
        read("(cons 1 '(a -2))"),
        Value::list(vec![
            Value::symbol("cons"),
            Value::int(1),
            Value::list(vec![
                Value::symbol("quote"),
                Value::list(vec![Value::symbol("a"), Value::int(-2)]),
            ]),
        ])
    );
}

#[test]
fn test_literals_and_quote() {
    assert_eq!(eval("7").unwrap(), Value::int(7));
    assert_eq!(eval("'(x (y z))").unwrap(), read("(x (y z))"));
    assert_eq!(eval("(quote undefined)").unwrap(), Value::symbol("undefined"));
}

#[test]
fn test_unbound_symbol() {
    let err = eval("nope").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Name);
    assert_eq!(err.message(), "name `nope` is not defined");
}

#[test]
fn test_empty_list_is_an_error() {
    let err = eval("()").unwrap_err();
    assert!(err.is_type_error(), "{err}");
}

#[test]
fn test_if_selects_branch() {
    assert_eq!(eval("(if 1 'yes 'no)").unwrap(), Value::symbol("yes"));
    assert_eq!(eval("(if '() 'yes 'no)").unwrap(), Value::symbol("no"));
    // The untaken branch would fail if it were evaluated.
    assert_eq!(eval("(if 1 'yes (undefined))").unwrap(), Value::symbol("yes"));
}

#[test]
fn test_apply_matches_direct_call() {
    assert_eq!(
        eval("(apply cons '(1 (2 3)))").unwrap(),
        eval("(cons 1 '(2 3))").unwrap()
    );
    let err = eval("(apply 5 '(1 2))").unwrap_err();
    assert!(matches!(err, LispError::Uncallable { .. }), "{err}");
}

#[test]
fn test_lambda_with_wrong_arg_count() {
    let err = eval("((lambda (a b) (cons a b)) 1)").unwrap_err();
    let LispError::ArgCount { expected, got, .. } = &err else {
        panic!("expected ArgCount, got {err:?}");
    };
    assert_eq!(*expected, Expected::Exactly(2));
    assert_eq!(*got, 1);
    assert_eq!(
        err.message(),
        "wrong number of args given to `<function lambda>`: expected 2, got 1"
    );
}

#[test]
fn test_session_state_persists_between_runs() {
    let mut ctx = context();
    eval_in(&mut ctx, "(set pair (lambda (a b) (cons a (cons b '()))))").unwrap();
    eval_in(&mut ctx, "(set p (pair 1 2))").unwrap();
    assert_eq!(eval_in(&mut ctx, "(pair p p)").unwrap(), read("((1 2) (1 2))"));
}

#[test]
fn test_higher_order_functions() {
    let mut ctx = context();
    eval_in(
        &mut ctx,
        "(set map (lambda (f xs)
            (if xs
                (apply (lambda (h t) (cons (f h) (map f t))) xs)
                xs)))",
    )
    .unwrap();
    let out = eval_in(&mut ctx, "(map (lambda (x) (cons x '())) '(1 2 3))").unwrap();
    assert_eq!(out, read("((1) (2) (3))"));
}

#[test]
fn test_closures_capture_independently() {
    let mut ctx = context();
    eval_in(&mut ctx, "(set const (lambda (v) (lambda () v)))").unwrap();
    eval_in(&mut ctx, "(set one (const 1))").unwrap();
    eval_in(&mut ctx, "(set two (const 2))").unwrap();
    assert_eq!(eval_in(&mut ctx, "(one)").unwrap(), Value::int(1));
    assert_eq!(eval_in(&mut ctx, "(two)").unwrap(), Value::int(2));
}

#[test]
fn test_eval_builtin() {
    assert_eq!(eval("(eval '(cons 1 '()))").unwrap(), read("(1)"));
}

#[test]
fn test_progn() {
    assert_eq!(eval("(progn (set a 1) (set b 2) a)").unwrap(), Value::int(1));
    let err = eval("(progn)").unwrap_err();
    assert!(
        matches!(
            err,
            LispError::ArgCount {
                expected: Expected::AtLeast(1),
                got: 0,
                ..
            }
        ),
        "{err}"
    );
}

#[test]
fn test_infinite_recursion_is_stopped() {
    let err = eval("((lambda (f) (f f)) (lambda (f) (f f)))").unwrap_err();
    assert_eq!(err.limit(), Some(Limit::Depth));
}

#[test]
fn test_long_program_is_stopped() {
    let mut source = String::from("(progn");
    for i in 0..=DEFAULT_MAX_STEPS {
        source.push_str(&format!(" {i}"));
    }
    source.push(')');
    let err = eval(&source).unwrap_err();
    assert_eq!(err.limit(), Some(Limit::Steps));
}

#[test]
fn test_allocation_loop_is_stopped() {
    // Builds an ever-longer list until the object budget runs out.
    let mut ctx = EvalContext::builder(globals()).max_things(50).max_depth(1000).build();
    eval_in(&mut ctx, "(set grow (lambda (xs) (grow (cons xs xs))))").unwrap();
    let err = eval_in(&mut ctx, "(grow '())").unwrap_err();
    assert_eq!(err.limit(), Some(Limit::Objects));
}

#[test]
fn test_budget_errors_leave_context_usable() {
    let mut ctx = context();
    eval_in(&mut ctx, "(set x 1)").unwrap();
    eval_in(&mut ctx, "((lambda (f) (f f)) (lambda (f) (f f)))").unwrap_err();
    assert_eq!(ctx.depth(), 0);
    assert_eq!(eval_in(&mut ctx, "x").unwrap(), Value::int(1));
}

#[test]
fn test_dropped_closures_do_not_exhaust_objects() {
    let mut ctx = EvalContext::builder(globals()).max_things(60).build();
    eval_in(&mut ctx, "(set g (lambda (x) (progn (lambda () x) 0)))").unwrap();
    for _ in 0..300 {
        assert_eq!(eval_in(&mut ctx, "(g (cons 1 '()))").unwrap(), Value::int(0));
    }
    assert!(ctx.scopes().len() <= 2, "{} scopes alive", ctx.scopes().len());
}

#[test]
fn test_returned_closure_outlives_its_frame() {
    let mut ctx = EvalContext::builder(globals()).max_things(60).build();
    eval_in(&mut ctx, "(set make (lambda (x) (lambda () x)))").unwrap();
    for n in 0..200 {
        eval_in(&mut ctx, &format!("(set get (make '({n})))")).unwrap();
        assert_eq!(eval_in(&mut ctx, "(get)").unwrap(), read(&format!("({n})")));
    }
}
