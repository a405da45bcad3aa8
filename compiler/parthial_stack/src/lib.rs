//! Native stack growth for the recursive evaluator.
//!
//! The evaluator walks expression trees recursively: every nested list,
//! every closure body and every special-form branch is another Rust frame.
//! The recursion budget (`max_depth`) bounds how deep a program may go, but
//! a host is free to configure a large budget, and the frames involved are
//! not small. Wrapping each step in [`ensure_sufficient_stack`] lets the
//! depth budget, not the thread's stack size, decide when a program is too
//! deep.
//!
//! On `wasm32` the wrapper is a passthrough; the runtime owns the stack there.

/// Grow the stack when fewer than this many bytes remain (128KB).
pub const RED_ZONE: usize = 128 * 1024;

/// Size of each freshly allocated stack segment (2MB).
pub const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, first switching to a fresh stack segment if the current one is
/// nearly exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// Passthrough on `wasm32`.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Bytes of stack left on the current segment, when the platform can tell.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn remaining_stack() -> Option<usize> {
    stacker::remaining_stack()
}

/// Always `None` on `wasm32`.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn remaining_stack() -> Option<usize> {
    None
}

#[cfg(test)]
mod tests;
