//! Scope chain storage.
//!
//! Scopes live in an arena owned by the [`Context`](crate::Context) and
//! point at their parent by [`ScopeId`]. A chain is read innermost-first
//! by following parent links; the read-only globals table sits below the
//! outermost scope and is consulted by the context, not stored here.
//!
//! # Lifetime
//!
//! Every scope counts its holders: the guard that pushed or switched to it,
//! each child scope, and each closure [`ScopeHandle`] that captured it. A
//! scope is freed, and its bindings dropped, when the count reaches zero;
//! freeing a scope gives back the hold it had on its parent. Only the root
//! of a fresh arena carries a hold nobody gives back.
//!
//! A closure bound in one of the scopes it keeps alive forms a cycle that
//! counting never frees. Such a scope still holds a tracked function, so
//! these cycles stay charged to the object budget.

mod handle;

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::value::{Heap, Value};

pub(crate) use handle::ReleaseQueue;
pub use handle::ScopeHandle;

/// Index of a scope in a context's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    /// The outermost mutable scope every fresh context starts with.
    pub const ROOT: ScopeId = ScopeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        ScopeId(index)
    }
}

/// One level of name → value bindings.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    bindings: FxHashMap<Heap<str>, Value>,
    parent: Option<ScopeId>,
    holders: usize,
}

impl Scope {
    pub fn with_parent(parent: Option<ScopeId>) -> Self {
        Scope {
            bindings: FxHashMap::default(),
            parent,
            holders: 0,
        }
    }

    #[inline]
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Guards, child scopes and closures currently keeping this scope alive.
    #[inline]
    pub fn holders(&self) -> usize {
        self.holders
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    #[inline]
    pub fn define(&mut self, name: Heap<str>, value: Value) {
        self.bindings.insert(name, value);
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings sorted by name, for deterministic output.
    pub fn sorted_bindings(&self) -> Vec<(&Heap<str>, &Value)> {
        let mut out: Vec<_> = self.bindings.iter().collect();
        out.sort_unstable_by(|(a, _), (b, _)| <str as Ord>::cmp(a, b));
        out
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.bindings.values()
    }
}

/// Arena of scopes addressed by [`ScopeId`].
///
/// Released slots are recycled. An id stays valid while its scope has at
/// least one holder.
#[derive(Debug, Default)]
pub struct ScopeArena {
    slots: Vec<Option<Scope>>,
    free: Vec<ScopeId>,
    releases: ReleaseQueue,
}

impl ScopeArena {
    /// Arena holding only the root scope, which is never freed.
    pub fn new() -> Self {
        let mut root = Scope::with_parent(None);
        root.holders = 1;
        ScopeArena {
            slots: vec![Some(root)],
            free: Vec::new(),
            releases: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Empty arena, filled slot by slot when restoring a snapshot.
    pub(crate) fn empty() -> Self {
        ScopeArena::default()
    }

    /// Allocate a fresh scope under `parent`, held once by the caller.
    pub fn alloc(&mut self, parent: Option<ScopeId>) -> ScopeId {
        if let Some(parent) = parent {
            self.retain(parent);
        }
        let mut scope = Scope::with_parent(parent);
        scope.holders = 1;
        if let Some(id) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(id.index()) {
                *slot = Some(scope);
                return id;
            }
        }
        let id = ScopeId(self.slots.len());
        self.slots.push(Some(scope));
        id
    }

    /// Allocate a scope under `parent` owned by the returned handle.
    pub(crate) fn alloc_captured(&mut self, parent: ScopeId) -> ScopeHandle {
        let id = self.alloc(Some(parent));
        ScopeHandle::adopt(id, &self.releases)
    }

    /// Take a new hold on an existing scope, owned by the returned handle.
    pub(crate) fn capture(&mut self, id: ScopeId) -> ScopeHandle {
        self.retain(id);
        ScopeHandle::adopt(id, &self.releases)
    }

    /// Put `scope` at a specific id, growing the arena as needed.
    pub(crate) fn insert_at(&mut self, id: ScopeId, scope: Scope) {
        if self.slots.len() <= id.index() {
            self.slots.resize_with(id.index().saturating_add(1), || None);
        }
        if let Some(slot) = self.slots.get_mut(id.index()) {
            *slot = Some(scope);
        }
    }

    /// Link a restored scope to its parent, holding the parent on its behalf.
    pub(crate) fn attach(&mut self, id: ScopeId, parent: ScopeId) {
        if let Some(scope) = self.get_mut(id) {
            scope.parent = Some(parent);
            self.retain(parent);
        }
    }

    /// Recompute the free list after slots were placed with `insert_at`.
    pub(crate) fn rebuild_free_list(&mut self) {
        self.free = self
            .slots
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, slot)| slot.is_none())
            .map(|(index, _)| ScopeId(index))
            .collect();
    }

    #[inline]
    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ScopeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live scopes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look `name` up along the chain starting at `start`.
    pub fn lookup(&self, start: ScopeId, name: &str) -> Option<&Value> {
        let mut next = Some(start);
        while let Some(id) = next {
            let scope = self.get(id)?;
            if let Some(value) = scope.get(name) {
                return Some(value);
            }
            next = scope.parent();
        }
        None
    }

    /// The chain starting at `start`, innermost first.
    pub fn chain(&self, start: ScopeId) -> Vec<ScopeId> {
        let mut out = Vec::new();
        let mut next = Some(start);
        while let Some(id) = next {
            let Some(scope) = self.get(id) else { break };
            out.push(id);
            next = scope.parent();
        }
        out
    }

    /// Add a holder to `id`.
    pub fn retain(&mut self, id: ScopeId) {
        if let Some(scope) = self.get_mut(id) {
            scope.holders = scope.holders.saturating_add(1);
        }
    }

    /// Give back one hold on `id`, freeing it and any ancestors left
    /// without holders. Returns how many scopes were freed.
    ///
    /// Bindings of freed scopes are dropped before returning; closures
    /// among them post their own scopes for the next [`collect`](Self::collect).
    pub fn release(&mut self, id: ScopeId) -> usize {
        let mut freed = Vec::new();
        let mut next = Some(id);
        while let Some(id) = next.take() {
            let Some(slot) = self.slots.get_mut(id.index()) else {
                break;
            };
            let Some(scope) = slot.as_mut() else { break };
            scope.holders = scope.holders.saturating_sub(1);
            if scope.holders > 0 {
                break;
            }
            let Some(scope) = slot.take() else { break };
            self.free.push(id);
            next = scope.parent;
            freed.push(scope);
        }
        let count = freed.len();
        drop(freed);
        count
    }

    /// Give back the holds of every dropped [`ScopeHandle`], repeating until
    /// freeing scopes drops no further handles. Returns how many scopes
    /// were freed.
    pub fn collect(&mut self) -> usize {
        let mut freed = 0usize;
        loop {
            let batch = std::mem::take(&mut *self.releases.lock());
            if batch.is_empty() {
                break;
            }
            for id in batch {
                freed = freed.saturating_add(self.release(id));
            }
        }
        if freed > 0 {
            tracing::trace!(freed, live = self.len(), "collected scopes");
        }
        freed
    }

    /// Live scopes with their ids, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|scope| (ScopeId(index), scope)))
    }
}
