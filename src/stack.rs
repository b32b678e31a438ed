//! Native stack headroom for the recursive evaluator.
//!
//! Every Lox call nests several `execute`/`evaluate` frames, so a modest
//! recursion depth in a script would overflow the thread's stack. Each entry
//! point checks for a red zone and switches to a fresh heap-allocated segment
//! when it is reached.

/// Headroom that must remain before a frame runs.
const RED_ZONE: usize = 128 * 1024;

/// Size of each additional stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
