//! Closures created by the `lambda` special form.

use super::{Heap, Value};
use crate::scope::{ScopeHandle, ScopeId};

/// A user-defined procedure.
///
/// The captured environment lives in the owning context's scope arena; the
/// closure keeps it alive through a [`ScopeHandle`], and the arena frees it
/// once the last closure sharing it is gone. A function is only meaningful
/// inside the context (or restored snapshot) that created it.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionValue {
    params: Vec<Heap<str>>,
    body: Value,
    name: Heap<str>,
    scope: ScopeHandle,
}

impl FunctionValue {
    pub fn new(params: Vec<Heap<str>>, body: Value, name: Heap<str>, scope: ScopeHandle) -> Self {
        FunctionValue {
            params,
            body,
            name,
            scope,
        }
    }

    #[inline]
    pub fn params(&self) -> &[Heap<str>] {
        &self.params
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn body(&self) -> &Value {
        &self.body
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Innermost scope of the captured environment.
    #[inline]
    pub fn scope(&self) -> ScopeId {
        self.scope.id()
    }
}
