//! Snapshot and resume.
//!
//! A [`ContextSnapshot`] is a versioned, tagged encoding of a context's
//! scope graph. Every scope level is written once, keyed by its id; chains
//! (the current one and each closure's captured one) list level ids,
//! innermost first. Shared scopes and closures stored in their own
//! environment therefore encode without duplication or cycles.
//!
//! Heap values (symbols, lists, closures) are written once each into a
//! shared table, children before the values that contain them, and every
//! reference to one is a `lispref` index into that table. Restoring builds
//! each table entry once, so values shared in the session are shared again
//! afterwards and count once against the object budget.
//!
//! Builtins are written by name only. Restoring requires the globals table
//! the snapshot was taken against: each `lispbuiltin` resolves to the very
//! object registered there, and every restored binding is re-registered
//! against the object budget.
//!
//! Two wire forms are offered: JSON (`serde_json`) for inspection and
//! compact binary (`bincode`) for storage.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builtins::Globals;
use crate::context::Context;
use crate::errors::LispError;
use crate::scope::{Scope, ScopeArena, ScopeId};
use crate::value::{FunctionValue, Heap, Value};

/// Version written into every snapshot.
pub const FORMAT_VERSION: u32 = 2;

/// Failure while restoring (or transcoding) a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("unsupported snapshot version {found} (expected {FORMAT_VERSION})")]
    UnsupportedVersion { found: u32 },

    #[error("builtin `{name}` is not in the supplied globals")]
    UnknownBuiltin { name: String },

    #[error("chain refers to scope {id}, which the snapshot does not contain")]
    UnknownScope { id: usize },

    #[error("scope {id} appears more than once")]
    DuplicateScope { id: usize },

    #[error("a scope chain has no levels")]
    EmptyChain,

    #[error("chains disagree on the parent of scope {id}")]
    InconsistentChain { id: usize },

    /// A `lispref` pointing at or past the entry that contains it.
    #[error("reference to shared value {index}, which is not defined before its use")]
    UnknownValue { index: usize },

    #[error("snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot bytes: {0}")]
    Bincode(#[from] bincode::Error),

    /// Re-registering restored values exceeded the object budget.
    #[error("restored values do not fit the object budget: {0}")]
    Budget(#[from] LispError),
}

/// Encoded value, tagged by kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncodedValue {
    #[serde(rename = "lispint")]
    Int(i64),
    #[serde(rename = "lispsym")]
    Symbol(String),
    #[serde(rename = "lisplist")]
    List(Vec<EncodedValue>),
    #[serde(rename = "lispfunc")]
    Function(EncodedFunction),
    /// Name only; resolved against the globals on restore.
    #[serde(rename = "lispbuiltin")]
    Builtin(String),
    /// Index into [`ContextSnapshot::shared`].
    #[serde(rename = "lispref")]
    Ref(usize),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedFunction {
    pub params: Vec<String>,
    pub body: Box<EncodedValue>,
    pub name: String,
    /// Captured environment.
    pub scopes: ChainMap,
}

/// A scope chain as level ids, innermost first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "chainmap")]
pub struct ChainMap {
    pub levels: Vec<usize>,
}

/// One scope level and its bindings, sorted by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedScope {
    pub id: usize,
    pub bindings: Vec<(String, EncodedValue)>,
}

/// Everything needed to resume a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "context")]
pub struct ContextSnapshot {
    pub version: u32,
    pub max_things: usize,
    /// Heap values, each written once; an entry only refers to earlier ones.
    pub shared: Vec<EncodedValue>,
    /// Reachable scope levels, in id order.
    pub scopes: Vec<EncodedScope>,
    /// The chain that was active.
    pub chain: ChainMap,
}

impl ContextSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl Context {
    /// Encode the scopes reachable from the current chain.
    pub fn snapshot(&self) -> ContextSnapshot {
        let mut encoder = Encoder::new(self.scopes());
        let chain = encoder.chain(self.current_scope());
        let mut scopes = Vec::new();
        while let Some(id) = encoder.pending.pop() {
            let arena = encoder.arena;
            let Some(scope) = arena.get(id) else { continue };
            let bindings = scope
                .sorted_bindings()
                .into_iter()
                .map(|(name, value)| (name.to_string(), encoder.value(value)))
                .collect();
            scopes.push(EncodedScope {
                id: id.index(),
                bindings,
            });
        }
        scopes.sort_unstable_by_key(|scope| scope.id);
        tracing::debug!(
            scopes = scopes.len(),
            shared = encoder.shared.len(),
            "context snapshot taken"
        );
        ContextSnapshot {
            version: FORMAT_VERSION,
            max_things: self.max_things(),
            shared: encoder.shared,
            scopes,
            chain,
        }
    }

    /// Rebuild a context from `snapshot`, resolving builtins in `globals`.
    ///
    /// Scope ids are kept. The restored active chain is held for the life of
    /// the context, captured scopes for as long as their closures, and
    /// every bound value is registered against the snapshot's object budget.
    pub fn restore(
        snapshot: &ContextSnapshot,
        globals: Arc<Globals>,
    ) -> Result<Context, SnapshotError> {
        if snapshot.version != FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
            });
        }

        let mut arena = ScopeArena::empty();
        for scope in &snapshot.scopes {
            let id = ScopeId::from_index(scope.id);
            if arena.contains(id) {
                return Err(SnapshotError::DuplicateScope { id: scope.id });
            }
            arena.insert_at(id, Scope::with_parent(None));
        }
        arena.rebuild_free_list();

        let mut decoder = Decoder::new(&globals, &mut arena);
        let current = decoder.chain(&snapshot.chain)?;
        for entry in &snapshot.shared {
            let value = decoder.value(entry)?;
            decoder.shared.push(value);
        }
        let mut restored = Vec::new();
        for encoded in &snapshot.scopes {
            for (name, value) in &encoded.bindings {
                let value = decoder.value(value)?;
                restored.push(value.clone());
                if let Some(scope) = decoder.arena.get_mut(ScopeId::from_index(encoded.id)) {
                    scope.define(Heap::from(name.as_str()), value);
                }
            }
        }

        let parents = std::mem::take(&mut decoder.parents);
        for (id, parent) in parents {
            if let Some(parent) = parent {
                arena.attach(ScopeId::from_index(id), ScopeId::from_index(parent));
            }
        }
        arena.retain(current);

        let mut context = Context::from_parts(globals, arena, current, snapshot.max_things);
        for value in restored {
            context.rec_new(value)?;
        }
        tracing::debug!(
            scopes = snapshot.scopes.len(),
            things = context.things().len(),
            "context restored"
        );
        Ok(context)
    }
}

/// Walks values, writing each heap value to the shared table once and
/// queueing every scope level a chain mentions.
struct Encoder<'a> {
    arena: &'a ScopeArena,
    queued: FxHashSet<ScopeId>,
    pending: Vec<ScopeId>,
    /// Allocation identity to table index.
    indices: FxHashMap<usize, usize>,
    shared: Vec<EncodedValue>,
}

impl<'a> Encoder<'a> {
    fn new(arena: &'a ScopeArena) -> Self {
        Encoder {
            arena,
            queued: FxHashSet::default(),
            pending: Vec::new(),
            indices: FxHashMap::default(),
            shared: Vec::new(),
        }
    }

    fn chain(&mut self, start: ScopeId) -> ChainMap {
        let levels = self.arena.chain(start);
        for &id in &levels {
            if self.queued.insert(id) {
                self.pending.push(id);
            }
        }
        ChainMap {
            levels: levels.into_iter().map(ScopeId::index).collect(),
        }
    }

    fn value(&mut self, value: &Value) -> EncodedValue {
        let key = match value {
            Value::Int(n) => return EncodedValue::Int(*n),
            Value::Builtin(builtin) => return EncodedValue::Builtin(builtin.name().to_owned()),
            Value::Symbol(h) => h.identity(),
            Value::List(h) => h.identity(),
            Value::Function(h) => h.identity(),
        };
        if let Some(&index) = self.indices.get(&key) {
            return EncodedValue::Ref(index);
        }
        let entry = parthial_stack::ensure_sufficient_stack(|| self.entry(value));
        // Children were pushed while encoding the entry, so they come first.
        let index = self.shared.len();
        self.shared.push(entry);
        self.indices.insert(key, index);
        EncodedValue::Ref(index)
    }

    /// The table entry for a heap value; its children become references.
    fn entry(&mut self, value: &Value) -> EncodedValue {
        match value {
            Value::Int(n) => EncodedValue::Int(*n),
            Value::Symbol(name) => EncodedValue::Symbol(name.to_string()),
            Value::List(items) => {
                EncodedValue::List(items.iter().map(|item| self.value(item)).collect())
            }
            Value::Function(function) => EncodedValue::Function(EncodedFunction {
                params: function.params().iter().map(ToString::to_string).collect(),
                body: Box::new(self.value(function.body())),
                name: function.name().to_owned(),
                scopes: self.chain(function.scope()),
            }),
            Value::Builtin(builtin) => EncodedValue::Builtin(builtin.name().to_owned()),
        }
    }
}

/// Decodes values into a fresh arena and derives parent links from the
/// chains it meets.
struct Decoder<'a> {
    globals: &'a Globals,
    arena: &'a mut ScopeArena,
    parents: FxHashMap<usize, Option<usize>>,
    /// Shared-table entries decoded so far.
    shared: Vec<Value>,
}

impl<'a> Decoder<'a> {
    fn new(globals: &'a Globals, arena: &'a mut ScopeArena) -> Self {
        Decoder {
            globals,
            arena,
            parents: FxHashMap::default(),
            shared: Vec::new(),
        }
    }

    /// Record the parent links a chain implies; returns its innermost level.
    ///
    /// Every chain ends at a level with no parent, so links that agree
    /// across all chains cannot form a cycle.
    fn chain(&mut self, chain: &ChainMap) -> Result<ScopeId, SnapshotError> {
        let Some(&innermost) = chain.levels.first() else {
            return Err(SnapshotError::EmptyChain);
        };
        for (i, &id) in chain.levels.iter().enumerate() {
            if !self.arena.contains(ScopeId::from_index(id)) {
                return Err(SnapshotError::UnknownScope { id });
            }
            let parent = chain.levels.get(i.saturating_add(1)).copied();
            match self.parents.get(&id) {
                Some(&existing) if existing != parent => {
                    return Err(SnapshotError::InconsistentChain { id });
                }
                Some(_) => {}
                None => {
                    self.parents.insert(id, parent);
                }
            }
        }
        Ok(ScopeId::from_index(innermost))
    }

    fn value(&mut self, encoded: &EncodedValue) -> Result<Value, SnapshotError> {
        parthial_stack::ensure_sufficient_stack(|| -> Result<Value, SnapshotError> {
            Ok(match encoded {
                EncodedValue::Int(n) => Value::int(*n),
                EncodedValue::Symbol(name) => Value::symbol(name.as_str()),
                EncodedValue::List(items) => Value::list(
                    items
                        .iter()
                        .map(|item| self.value(item))
                        .collect::<Result<_, _>>()?,
                ),
                EncodedValue::Function(function) => {
                    let scope = self.chain(&function.scopes)?;
                    let params = function
                        .params
                        .iter()
                        .map(|param| Heap::from(param.as_str()))
                        .collect();
                    let body = self.value(&function.body)?;
                    Value::function(FunctionValue::new(
                        params,
                        body,
                        Heap::from(function.name.as_str()),
                        self.arena.capture(scope),
                    ))
                }
                EncodedValue::Builtin(name) => self
                    .globals
                    .get(name)
                    .filter(|value| matches!(value, Value::Builtin(_)))
                    .cloned()
                    .ok_or_else(|| SnapshotError::UnknownBuiltin { name: name.clone() })?,
                EncodedValue::Ref(index) => self
                    .shared
                    .get(*index)
                    .cloned()
                    .ok_or(SnapshotError::UnknownValue { index: *index })?,
            })
        })
    }
}
