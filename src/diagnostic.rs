//! Thread-local diagnostic contexts.
//!
//! [`Mdc`] is a mapped diagnostic context: key-value pairs stamped onto every
//! event emitted from the current thread. [`Ndc`] is a nested diagnostic
//! context: a stack of strings rendered space separated. Both are read by the
//! `log` bridge when it captures an event; callers of
//! [`ForwarderAppender::append`](crate::ForwarderAppender::append) supplying
//! their own events do not need them.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::record::FieldValue;

thread_local! {
    static MDC: RefCell<BTreeMap<String, FieldValue>> = const { RefCell::new(BTreeMap::new()) };
    static NDC: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Mapped diagnostic context for the current thread.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct Mdc;

impl Mdc {
    /// Insert or replace a key in the current thread's context.
    pub fn insert<K, V>(key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        MDC.with(|map| {
            map.borrow_mut().insert(key.into(), value.into());
        });
    }

    pub fn remove(key: &str) {
        MDC.with(|map| {
            map.borrow_mut().remove(key);
        });
    }

    pub fn get(key: &str) -> Option<FieldValue> {
        MDC.with(|map| map.borrow().get(key).cloned())
    }

    pub fn clear() {
        MDC.with(|map| map.borrow_mut().clear());
    }

    /// Copy the current thread's context.
    pub fn snapshot() -> BTreeMap<String, FieldValue> {
        MDC.with(|map| map.borrow().clone())
    }
}

/// Nested diagnostic context for the current thread.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct Ndc;

impl Ndc {
    pub fn push(message: impl Into<String>) {
        NDC.with(|stack| stack.borrow_mut().push(message.into()));
    }

    pub fn pop() -> Option<String> {
        NDC.with(|stack| stack.borrow_mut().pop())
    }

    pub fn depth() -> usize {
        NDC.with(|stack| stack.borrow().len())
    }

    pub fn clear() {
        NDC.with(|stack| stack.borrow_mut().clear());
    }

    /// Render the stack outermost first, or `None` when it is empty.
    pub fn get() -> Option<String> {
        NDC.with(|stack| {
            let stack = stack.borrow();
            (!stack.is_empty()).then(|| stack.join(" "))
        })
    }
}
