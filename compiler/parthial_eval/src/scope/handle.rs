//! Owning handles to captured scopes.
//!
//! A closure keeps its environment alive through a [`ScopeHandle`]. The
//! handle cannot touch the arena when it is dropped, so it posts its scope
//! id to the arena's release queue instead; the arena drains the queue at
//! its next collection point.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::ScopeId;

/// Scope ids whose last handle has been dropped.
pub(crate) type ReleaseQueue = Arc<Mutex<Vec<ScopeId>>>;

/// Shared ownership of one hold on a scope.
///
/// Clones share the hold; it is given back when the last clone drops.
#[derive(Clone)]
pub struct ScopeHandle(Arc<Hold>);

struct Hold {
    id: ScopeId,
    releases: ReleaseQueue,
}

impl ScopeHandle {
    /// Wrap a hold the caller already took on `id`.
    pub(crate) fn adopt(id: ScopeId, releases: &ReleaseQueue) -> Self {
        ScopeHandle(Arc::new(Hold {
            id,
            releases: Arc::clone(releases),
        }))
    }

    #[inline]
    pub fn id(&self) -> ScopeId {
        self.0.id
    }
}

impl Drop for Hold {
    fn drop(&mut self) {
        self.releases.lock().push(self.id);
    }
}

impl PartialEq for ScopeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for ScopeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopeHandle").field(&self.id()).finish()
    }
}
