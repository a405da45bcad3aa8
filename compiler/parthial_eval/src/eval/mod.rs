//! The evaluation loop.
//!
//! [`EvalContext`] is a [`Context`] plus two more budgets: how deep `eval`
//! may nest and how many `eval` calls a session may make in total. Both are
//! checked before any work is done, so a runaway program stops at a
//! predictable point instead of exhausting the host.
//!
//! Evaluation is a synchronous depth-first walk. Every recursive step goes
//! through [`EvalContext::eval`]; nothing else touches the counters.

mod limits;

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use smallvec::SmallVec;

pub use limits::{EvalContextBuilder, Limits, DEFAULT_MAX_DEPTH, DEFAULT_MAX_STEPS};

use crate::builtins::Globals;
use crate::context::{Context, ScopeGuard};
use crate::errors::{
    limit_exceeded, not_callable, wrong_arg_count, EvalResult, Expected, Limit, LispError,
};
use crate::scope::ScopeId;
use crate::value::{FunctionValue, Heap, Value};

/// Outcome of [`EvalContext::run`].
#[derive(Clone, Debug)]
pub struct Evaluated {
    /// What the program evaluated to.
    pub value: Value,
    /// Every tracked value still alive when the program finished.
    pub things: Vec<Value>,
}

/// A [`Context`] that can evaluate, with depth and step budgets.
#[derive(Debug)]
pub struct EvalContext {
    context: Context,
    depth: usize,
    steps: usize,
    max_depth: usize,
    max_steps: usize,
}

impl EvalContext {
    /// Context with default budgets.
    pub fn new(globals: Arc<Globals>) -> Self {
        Self::builder(globals).build()
    }

    pub fn builder(globals: Arc<Globals>) -> EvalContextBuilder {
        EvalContextBuilder::new(globals)
    }

    /// Resume evaluating on an existing context, e.g. one restored from a
    /// snapshot. The context keeps its own object budget.
    pub fn from_context(context: Context, max_depth: usize, max_steps: usize) -> Self {
        EvalContext {
            context,
            depth: 0,
            steps: 0,
            max_depth,
            max_steps,
        }
    }

    /// Hand the session state back, e.g. to snapshot it.
    pub fn into_context(self) -> Context {
        self.context
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_things: self.context.max_things(),
            max_depth: self.max_depth,
            max_steps: self.max_steps,
        }
    }

    /// Evaluate `expr` under the depth and step budgets.
    ///
    /// Both budgets are checked before anything else happens. `depth` is
    /// restored whether the evaluation succeeds or fails, so an error leaves
    /// the context usable for another attempt within the remaining steps.
    #[tracing::instrument(level = "trace", skip_all, fields(depth = self.depth, steps = self.steps))]
    pub fn eval(&mut self, expr: &Value) -> EvalResult {
        if self.depth >= self.max_depth {
            tracing::debug!(max_depth = self.max_depth, "recursion budget exhausted");
            return Err(limit_exceeded(Limit::Depth, expr));
        }
        if self.steps >= self.max_steps {
            tracing::debug!(max_steps = self.max_steps, "step budget exhausted");
            return Err(limit_exceeded(Limit::Steps, expr));
        }
        self.depth = self.depth.saturating_add(1);
        self.steps = self.steps.saturating_add(1);
        let result = parthial_stack::ensure_sufficient_stack(|| expr.eval(self));
        self.depth = self.depth.saturating_sub(1);
        result
    }

    /// Run a whole program: charge the object budget for the entire tree,
    /// then evaluate it.
    pub fn run(&mut self, expr: Value) -> Result<Evaluated, LispError> {
        tracing::debug!(
            steps = self.steps,
            things = self.context.things().len(),
            "run started"
        );
        let expr = self.context.rec_new(expr)?;
        let result = self.eval(&expr);
        match &result {
            Ok(_) => tracing::debug!(steps = self.steps, "run finished"),
            Err(err) => tracing::debug!(steps = self.steps, error = %err, "run failed"),
        }
        Ok(Evaluated {
            value: result?,
            things: self.context.live_things(),
        })
    }

    /// Call `callee` with already-prepared arguments.
    ///
    /// Arguments are passed as given: evaluated for ordinary calls,
    /// unevaluated for quoting builtins.
    pub fn call(&mut self, callee: &Value, args: &[Value]) -> EvalResult {
        match callee {
            Value::Builtin(builtin) => builtin.invoke(callee, self, args),
            Value::Function(function) => self.apply_function(callee, function, args),
            Value::Int(_) | Value::Symbol(_) | Value::List(_) => Err(not_callable(callee)),
        }
    }

    /// Bind parameters in a child of the closure's scope and evaluate the
    /// body there. Arity is exact, as for fixed-arity builtins.
    fn apply_function(
        &mut self,
        callee: &Value,
        function: &FunctionValue,
        args: &[Value],
    ) -> EvalResult {
        if args.len() != function.arity() {
            return Err(wrong_arg_count(
                callee,
                Expected::Exactly(function.arity()),
                args.len(),
            ));
        }
        let bindings: SmallVec<[(Heap<str>, Value); 4]> = function
            .params()
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        let mut closure = self.scopes_as(function.scope());
        let mut frame = closure.new_scope(bindings);
        frame.eval(function.body())
    }

    /// See [`Context::new_scope`].
    pub fn new_scope<N, I>(&mut self, initial: I) -> ScopeGuard<'_, EvalContext>
    where
        N: Into<Heap<str>>,
        I: IntoIterator<Item = (N, Value)>,
    {
        ScopeGuard::push(self, initial)
    }

    /// See [`Context::scopes_as`].
    pub fn scopes_as(&mut self, scope: ScopeId) -> ScopeGuard<'_, EvalContext> {
        ScopeGuard::switch(self, scope)
    }
}

impl Deref for EvalContext {
    type Target = Context;

    #[inline]
    fn deref(&self) -> &Context {
        &self.context
    }
}

impl DerefMut for EvalContext {
    #[inline]
    fn deref_mut(&mut self) -> &mut Context {
        &mut self.context
    }
}

impl AsMut<Context> for EvalContext {
    fn as_mut(&mut self) -> &mut Context {
        &mut self.context
    }
}
