//! Shared, immutable heap storage for values.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// Reference-counted payload of a heap-backed [`Value`](super::Value).
///
/// Construction is crate-private: outside code goes through the `Value`
/// factory methods. The allocation address doubles as the value's identity
/// in the object registry.
#[repr(transparent)]
pub struct Heap<T: ?Sized>(Arc<T>);

impl<T> Heap<T> {
    #[inline]
    pub(crate) fn new(value: T) -> Self {
        Heap(Arc::new(value))
    }
}

impl<T: ?Sized> Heap<T> {
    /// Whether both handles point at the same allocation.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }

    /// Address of the shared allocation.
    #[inline]
    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<u8>() as usize
    }

    #[inline]
    pub(crate) fn downgrade(&self) -> Weak<T> {
        Arc::downgrade(&self.0)
    }

    #[inline]
    pub(crate) fn from_arc(arc: Arc<T>) -> Self {
        Heap(arc)
    }
}

impl<T: ?Sized> Clone for Heap<T> {
    #[inline]
    fn clone(&self) -> Self {
        Heap(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> Deref for Heap<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

impl<T: ?Sized + PartialEq> PartialEq for Heap<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Heap::ptr_eq(self, other) || **self == **other
    }
}

impl<T: ?Sized + Eq> Eq for Heap<T> {}

impl<T: ?Sized + Hash> Hash for Heap<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (**self).hash(state);
    }
}

// Lets scope maps keyed by `Heap<str>` be queried with a plain `&str`.
impl Borrow<str> for Heap<str> {
    fn borrow(&self) -> &str {
        self
    }
}

impl From<&str> for Heap<str> {
    fn from(name: &str) -> Self {
        Heap(Arc::from(name))
    }
}

impl From<String> for Heap<str> {
    fn from(name: String) -> Self {
        Heap(Arc::from(name))
    }
}

impl fmt::Display for Heap<str> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self)
    }
}
