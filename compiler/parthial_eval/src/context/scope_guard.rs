//! RAII scope guards.
//!
//! A [`ScopeGuard`] is returned by `new_scope` and `scopes_as` on both
//! [`Context`] and [`EvalContext`](crate::EvalContext). It derefs to the
//! context it borrows, so the scoped region uses it exactly like the
//! context itself. Dropping the guard restores the chain that was active
//! before it was created, on every exit path: normal return, an early `?`
//! return with an error, or a panic unwinding through it.
//!
//! ```text
//! {
//!     let mut frame = ctx.new_scope([("x", Value::int(1))]);
//!     frame.eval(&body)?;
//! } // previous chain restored here
//! ```

use std::ops::{Deref, DerefMut};

use super::Context;
use crate::scope::ScopeId;
use crate::value::{Heap, Value};

/// Restores the previous scope chain when dropped.
///
/// The guard holds the scope it made current and gives that hold back on
/// drop, so a pushed scope is freed then unless a closure still needs it.
pub struct ScopeGuard<'a, C: AsMut<Context>> {
    inner: &'a mut C,
    saved: ScopeId,
    held: ScopeId,
    pushed: bool,
}

impl<'a, C: AsMut<Context>> ScopeGuard<'a, C> {
    /// Push a child of the current scope, pre-populated with `initial`.
    pub(crate) fn push<N, I>(inner: &'a mut C, initial: I) -> Self
    where
        N: Into<Heap<str>>,
        I: IntoIterator<Item = (N, Value)>,
    {
        let ctx = inner.as_mut();
        let saved = ctx.current_scope();
        let pushed = ctx.push_scope();
        for (name, value) in initial {
            ctx.define(name, value);
        }
        ScopeGuard {
            inner,
            saved,
            held: pushed,
            pushed: true,
        }
    }

    /// Make the chain starting at `scope` the active one.
    pub(crate) fn switch(inner: &'a mut C, scope: ScopeId) -> Self {
        let ctx = inner.as_mut();
        let saved = ctx.current_scope();
        ctx.retain_scope(scope);
        ctx.set_current(scope);
        ScopeGuard {
            inner,
            saved,
            held: scope,
            pushed: false,
        }
    }

    /// The scope pushed by this guard, if it pushed one.
    pub fn pushed_scope(&self) -> Option<ScopeId> {
        self.pushed.then_some(self.held)
    }
}

impl<C: AsMut<Context>> Drop for ScopeGuard<'_, C> {
    fn drop(&mut self) {
        let ctx = self.inner.as_mut();
        ctx.set_current(self.saved);
        ctx.release_scope(self.held);
    }
}

impl<C: AsMut<Context>> Deref for ScopeGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.inner
    }
}

impl<C: AsMut<Context>> DerefMut for ScopeGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.inner
    }
}

#[cfg(test)]
mod tests;
