//! Live-object registry backing the object-count budget.
//!
//! Entries are weak: the registry never keeps a value alive. An entry for a
//! value that has since been dropped still occupies a slot until the next
//! collection point, which is a registration that would otherwise overflow
//! the budget.

use std::sync::Weak;

use rustc_hash::FxHashMap;

use crate::builtins::Builtin;
use crate::errors::{limit_exceeded, Limit, LispError};
use crate::value::{FunctionValue, Heap, Value};

/// Weak counterpart of a heap-backed [`Value`].
#[derive(Clone, Debug)]
enum WeakValue {
    Symbol(Weak<str>),
    List(Weak<Vec<Value>>),
    Function(Weak<FunctionValue>),
    Builtin(Weak<Builtin>),
}

impl WeakValue {
    fn new(value: &Value) -> Option<Self> {
        match value {
            Value::Int(_) => None,
            Value::Symbol(h) => Some(WeakValue::Symbol(h.downgrade())),
            Value::List(h) => Some(WeakValue::List(h.downgrade())),
            Value::Function(h) => Some(WeakValue::Function(h.downgrade())),
            Value::Builtin(h) => Some(WeakValue::Builtin(h.downgrade())),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            WeakValue::Symbol(w) => w.strong_count() > 0,
            WeakValue::List(w) => w.strong_count() > 0,
            WeakValue::Function(w) => w.strong_count() > 0,
            WeakValue::Builtin(w) => w.strong_count() > 0,
        }
    }

    fn upgrade(&self) -> Option<Value> {
        Some(match self {
            WeakValue::Symbol(w) => Value::Symbol(Heap::from_arc(w.upgrade()?)),
            WeakValue::List(w) => Value::List(Heap::from_arc(w.upgrade()?)),
            WeakValue::Function(w) => Value::Function(Heap::from_arc(w.upgrade()?)),
            WeakValue::Builtin(w) => Value::Builtin(Heap::from_arc(w.upgrade()?)),
        })
    }
}

/// Bounded set of tracked values, keyed by allocation identity.
#[derive(Clone, Debug)]
pub struct Things {
    entries: FxHashMap<usize, WeakValue>,
    max_things: usize,
}

impl Things {
    pub fn new(max_things: usize) -> Self {
        Things {
            entries: FxHashMap::default(),
            max_things,
        }
    }

    #[inline]
    pub fn max_things(&self) -> usize {
        self.max_things
    }

    /// Occupied entries, including ones not yet collected.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the next new registration has to collect first.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_things
    }

    pub fn contains(&self, value: &Value) -> bool {
        value
            .identity()
            .and_then(|key| self.entries.get(&key))
            .is_some_and(WeakValue::is_alive)
    }

    /// Track `value`.
    ///
    /// Tracking an already-tracked value is a no-op, as is tracking plain
    /// data. Fails with a `Limitation` error when the registry is full even
    /// after dropping dead entries.
    pub fn insert(&mut self, value: &Value) -> Result<(), LispError> {
        let (Some(key), Some(weak)) = (value.identity(), WeakValue::new(value)) else {
            return Ok(());
        };
        let stale = match self.entries.get(&key) {
            Some(existing) if existing.is_alive() => return Ok(()),
            Some(_) => true,
            None => false,
        };
        // A dead entry at the same address is a stale slot; reuse it.
        if stale {
            self.entries.insert(key, weak);
            return Ok(());
        }
        if self.is_full() && self.collect() == 0 {
            tracing::debug!(max_things = self.max_things, "object budget exhausted");
            return Err(limit_exceeded(Limit::Objects, value));
        }
        self.entries.insert(key, weak);
        Ok(())
    }

    /// Drop entries whose values are gone; returns how many were dropped.
    pub fn collect(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, weak| weak.is_alive());
        let dropped = before.saturating_sub(self.entries.len());
        if dropped > 0 {
            tracing::trace!(dropped, remaining = self.entries.len(), "collected dead objects");
        }
        dropped
    }

    /// Every tracked value still alive.
    pub fn live(&self) -> Vec<Value> {
        self.entries.values().filter_map(WeakValue::upgrade).collect()
    }
}
