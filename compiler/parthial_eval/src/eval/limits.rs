//! Budgets and construction of evaluation contexts.

use std::sync::Arc;

use serde::Deserialize;

use super::EvalContext;
use crate::builtins::Globals;
use crate::context::{Context, DEFAULT_MAX_THINGS};

/// Default recursion budget.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Default evaluation-step budget.
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// The three caps bounding what one session may consume.
///
/// Deserializable so a host can keep sandbox limits in its own config;
/// omitted fields take their defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Live tracked objects.
    pub max_things: usize,
    /// Nested `eval` calls.
    pub max_depth: usize,
    /// Total `eval` calls over the session.
    pub max_steps: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_things: DEFAULT_MAX_THINGS,
            max_depth: DEFAULT_MAX_DEPTH,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// Builder for [`EvalContext`].
///
/// ```text
/// let mut ctx = EvalContext::builder(globals)
///     .max_steps(500)
///     .max_depth(32)
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct EvalContextBuilder {
    globals: Arc<Globals>,
    limits: Limits,
}

impl EvalContextBuilder {
    pub fn new(globals: Arc<Globals>) -> Self {
        EvalContextBuilder {
            globals,
            limits: Limits::default(),
        }
    }

    /// Replace all three budgets at once.
    #[must_use]
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn max_things(mut self, max_things: usize) -> Self {
        self.limits.max_things = max_things;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.limits.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.limits.max_steps = max_steps;
        self
    }

    pub fn build(self) -> EvalContext {
        let context = Context::new(self.globals, self.limits.max_things);
        EvalContext::from_context(context, self.limits.max_depth, self.limits.max_steps)
    }
}
