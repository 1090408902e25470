//! Scoped access to the session gate.
//!
//! The gate is provided once, at the top of the view tree, and every consumer
//! reads it through [`use_session`]. Reading it anywhere else is a wiring bug.

use std::cell::RefCell;

use crate::gate::SessionHandle;

thread_local! {
    static CURRENT: RefCell<Vec<SessionHandle>> = const { RefCell::new(Vec::new()) };
}

/// Keeps a provided gate installed until dropped.
#[must_use = "the gate is only provided while the guard is alive"]
#[derive(Debug)]
pub struct ContextGuard {
    _private: (),
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Install `handle` for the current thread. Nested provides shadow outer ones.
pub fn provide(handle: SessionHandle) -> ContextGuard {
    CURRENT.with(|stack| stack.borrow_mut().push(handle));
    ContextGuard { _private: () }
}

/// The gate provided for this scope, if any.
pub fn try_use_session() -> Option<SessionHandle> {
    CURRENT.with(|stack| stack.borrow().last().cloned())
}

/// The gate provided for this scope.
///
/// # Panics
///
/// Panics when called outside a [`provide`] scope.
pub fn use_session() -> SessionHandle {
    match try_use_session() {
        Some(handle) => handle,
        None => panic!(
            "use_session() called outside a session gate context; wrap the caller in context::provide"
        ),
    }
}
