use std::panic::{catch_unwind, AssertUnwindSafe};

use pretty_assertions::assert_eq;

use super::*;
use crate::test_helpers::{globals, int};
use crate::DEFAULT_MAX_THINGS;

fn context() -> Context {
    Context::new(globals(), DEFAULT_MAX_THINGS)
}

#[test]
fn test_guard_restores_on_normal_exit() {
    let mut ctx = context();
    assert_eq!(ctx.scope_chain().len(), 1);
    {
        let frame = ctx.new_scope([("x", int(1))]);
        assert_eq!(frame.scope_chain().len(), 2);
        assert!(frame.pushed_scope().is_some());
    }
    assert_eq!(ctx.scope_chain().len(), 1);
    assert_eq!(ctx.get("x"), None);
}

#[test]
fn test_guard_restores_on_error() {
    fn failing(ctx: &mut Context) -> Result<(), &'static str> {
        let frame = ctx.new_scope([("x", int(1))]);
        assert_eq!(frame.scope_chain().len(), 2);
        frame.get("missing").ok_or("unbound")?;
        Ok(())
    }

    let mut ctx = context();
    assert!(failing(&mut ctx).is_err());
    assert_eq!(ctx.current_scope(), ScopeId::ROOT);
    assert_eq!(ctx.scopes().len(), 1);
}

#[test]
fn test_guard_restores_on_panic() {
    let mut ctx = context();
    let result = catch_unwind(AssertUnwindSafe(|| {
        let frame = ctx.new_scope([("x", int(1))]);
        assert_eq!(frame.scope_chain().len(), 2);
        panic!("test panic");
    }));
    assert!(result.is_err());
    assert_eq!(ctx.current_scope(), ScopeId::ROOT);
    assert_eq!(ctx.scopes().len(), 1);
}

#[test]
fn test_nested_guards_unwind_in_order() {
    let mut ctx = context();
    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut outer = ctx.new_scope([("a", int(1))]);
        let mut middle = outer.new_scope([("b", int(2))]);
        let inner = middle.new_scope([("c", int(3))]);
        assert_eq!(inner.scope_chain().len(), 4);
        panic!("deep panic");
    }));
    assert!(result.is_err());
    assert_eq!(ctx.scope_chain(), [ScopeId::ROOT]);
    assert_eq!(ctx.scopes().len(), 1);
}

#[test]
fn test_switch_guard_restores_without_releasing() {
    let mut ctx = context();
    let captured = {
        let mut frame = ctx.new_scope([("x", int(1))]);
        frame.capture_scope()
    };
    let live = ctx.scopes().len();
    {
        let switched = ctx.scopes_as(captured.id());
        assert_eq!(switched.pushed_scope(), None);
        assert_eq!(switched.current_scope(), captured.id());
    }
    assert_eq!(ctx.current_scope(), ScopeId::ROOT);
    assert_eq!(ctx.scopes().len(), live);
}

#[test]
fn test_captured_frame_lives_as_long_as_the_closure() {
    let mut ctx = context();
    let (frame_id, captured) = {
        let mut frame = ctx.new_scope([("x", int(1))]);
        let captured = frame.capture_scope();
        (frame.pushed_scope().unwrap(), captured)
    };
    assert!(ctx.scopes().contains(frame_id));
    assert_eq!(ctx.scopes().lookup(frame_id, "x"), Some(&int(1)));

    drop(captured);
    {
        // Any guard exit collects dropped closures' scopes.
        let _frame = ctx.new_scope([("y", int(2))]);
    }
    assert!(!ctx.scopes().contains(frame_id));
    assert_eq!(ctx.scopes().len(), 1);
}

#[test]
fn test_uncaptured_closure_scope_freed_at_guard_exit() {
    let mut ctx = context();
    {
        let mut frame = ctx.new_scope([("x", int(1))]);
        drop(frame.capture_scope());
    }
    assert_eq!(ctx.scopes().len(), 1);
}
