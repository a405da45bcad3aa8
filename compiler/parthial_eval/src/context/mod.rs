//! Session state: the scope chain, the globals table, and the object budget.
//!
//! A [`Context`] is one sandbox. It is single-threaded; hosts running
//! several programs concurrently create one context each and share only
//! the read-only [`Globals`].

mod scope_guard;
mod things;

use std::sync::Arc;

pub use scope_guard::ScopeGuard;
pub use things::Things;

use crate::builtins::Globals;
use crate::errors::{EvalResult, LispError};
use crate::scope::{ScopeArena, ScopeHandle, ScopeId};
use crate::value::{Heap, Value};

/// Default object budget.
pub const DEFAULT_MAX_THINGS: usize = 5000;

/// Scope chain plus object budget for one evaluation session.
#[derive(Debug)]
pub struct Context {
    globals: Arc<Globals>,
    scopes: ScopeArena,
    current: ScopeId,
    things: Things,
}

impl Context {
    /// Fresh context with an empty root scope.
    pub fn new(globals: Arc<Globals>, max_things: usize) -> Self {
        Context {
            globals,
            scopes: ScopeArena::new(),
            current: ScopeId::ROOT,
            things: Things::new(max_things),
        }
    }

    /// Reassemble a context from restored parts.
    pub(crate) fn from_parts(
        globals: Arc<Globals>,
        scopes: ScopeArena,
        current: ScopeId,
        max_things: usize,
    ) -> Self {
        Context {
            globals,
            scopes,
            current,
            things: Things::new(max_things),
        }
    }

    #[inline]
    pub fn globals(&self) -> &Arc<Globals> {
        &self.globals
    }

    #[inline]
    pub fn max_things(&self) -> usize {
        self.things.max_things()
    }

    #[inline]
    pub fn scopes(&self) -> &ScopeArena {
        &self.scopes
    }

    /// Innermost scope of the active chain.
    #[inline]
    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    /// The active chain, innermost first.
    pub fn scope_chain(&self) -> Vec<ScopeId> {
        self.scopes.chain(self.current)
    }

    // Item access

    /// Resolve `name` along the active chain, then in the globals table.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.scopes
            .lookup(self.current, name)
            .or_else(|| self.globals.get(name))
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scopes.lookup(self.current, name).is_some() || self.globals.contains(name)
    }

    /// Bind `name` in the innermost scope.
    pub fn define(&mut self, name: impl Into<Heap<str>>, value: Value) {
        if let Some(scope) = self.scopes.get_mut(self.current) {
            scope.define(name.into(), value);
        }
    }

    // Object budget

    /// Register `value` against the object budget and hand it back.
    pub fn new_thing(&mut self, value: Value) -> EvalResult {
        self.track(&value)?;
        Ok(value)
    }

    /// Registration shared by `new_thing` and `rec_new`. A full registry
    /// first frees scopes no closure holds any more, so the values bound in
    /// them can be collected.
    fn track(&mut self, value: &Value) -> Result<(), LispError> {
        if self.things.is_full() {
            self.scopes.collect();
        }
        self.things.insert(value)
    }

    /// Register `value` and everything reachable through `children()`,
    /// children before parents.
    ///
    /// Iterative, so arbitrarily deep trees from an external reader cannot
    /// exhaust the native stack. Shared sub-trees are walked once.
    pub fn rec_new(&mut self, value: Value) -> EvalResult {
        let mut seen = rustc_hash::FxHashSet::default();
        // (node, children already pushed)
        let mut stack: Vec<(Value, bool)> = vec![(value.clone(), false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                self.track(&node)?;
                continue;
            }
            if let Some(key) = node.identity() {
                if !seen.insert(key) {
                    continue;
                }
            }
            let children: Vec<Value> = node.children().to_vec();
            stack.push((node, true));
            // Reversed so the leftmost child is registered first.
            stack.extend(children.into_iter().rev().map(|child| (child, false)));
        }
        Ok(value)
    }

    /// `rec_new(value)`, then bind it to `name` in the innermost scope.
    pub fn add_rec_new(&mut self, name: impl Into<Heap<str>>, value: Value) -> EvalResult {
        let value = self.rec_new(value)?;
        self.define(name, value.clone());
        Ok(value)
    }

    #[inline]
    pub fn things(&self) -> &Things {
        &self.things
    }

    /// Tracked values that are still alive.
    pub fn live_things(&self) -> Vec<Value> {
        self.things.live()
    }

    // Scopes

    /// Push a new innermost scope holding `initial`; the guard restores the
    /// previous chain when dropped.
    pub fn new_scope<N, I>(&mut self, initial: I) -> ScopeGuard<'_, Context>
    where
        N: Into<Heap<str>>,
        I: IntoIterator<Item = (N, Value)>,
    {
        ScopeGuard::push(self, initial)
    }

    /// Swap in the chain starting at `scope`; the guard restores the
    /// caller's chain when dropped.
    pub fn scopes_as(&mut self, scope: ScopeId) -> ScopeGuard<'_, Context> {
        ScopeGuard::switch(self, scope)
    }

    /// Allocate a scope under the current one for a closure to own.
    ///
    /// The new scope holds the current chain alive after the guards that
    /// pushed it are gone, for as long as the handle (or a clone) exists.
    pub(crate) fn capture_scope(&mut self) -> ScopeHandle {
        self.scopes.alloc_captured(self.current)
    }

    /// Free scopes whose last closure has been dropped; returns how many
    /// were freed. Runs on every guard exit and whenever the object
    /// registry fills up.
    pub fn collect_scopes(&mut self) -> usize {
        self.scopes.collect()
    }

    pub(crate) fn push_scope(&mut self) -> ScopeId {
        let id = self.scopes.alloc(Some(self.current));
        self.current = id;
        id
    }

    pub(crate) fn set_current(&mut self, scope: ScopeId) {
        self.current = scope;
    }

    pub(crate) fn retain_scope(&mut self, scope: ScopeId) {
        self.scopes.retain(scope);
    }

    pub(crate) fn release_scope(&mut self, scope: ScopeId) {
        self.scopes.release(scope);
        self.scopes.collect();
    }
}

impl AsMut<Context> for Context {
    fn as_mut(&mut self) -> &mut Context {
        self
    }
}
