//! Explicit publish/subscribe primitives for single-threaded reactive state.
//!
//! - [`Listeners`]: a callback list. `add` returns a [`Subscription`];
//!   `emit` calls every listener synchronously.
//! - [`Observable`]: a value plus listeners. Listeners run after a committed
//!   change, never mid-mutation, and only when the value actually changed.
//! - [`ReentrancyGuard`]: the boolean flag that stops two bidirectionally
//!   synced holders from echoing each other forever.
//!
//! No borrow is held while listeners run, so a listener may read or write
//! the observable that notified it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Callback<T> = Rc<dyn Fn(&T)>;

struct ListenerList<T: ?Sized> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Callback<T>)>>,
}

/// A list of callbacks receiving `&T`.
pub struct Listeners<T: ?Sized> {
    inner: Rc<ListenerList<T>>,
}

impl<T: ?Sized + 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ListenerList {
                next_id: Cell::new(0),
                entries: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register a listener. It stays registered until the returned
    /// subscription is dropped or unsubscribed.
    pub fn add(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let callback: Callback<T> = Rc::new(listener);
        self.inner.entries.borrow_mut().push((id, callback));

        let weak: Weak<ListenerList<T>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(list) = weak.upgrade() {
                list.entries.borrow_mut().retain(|(entry, _)| *entry != id);
            }
        })
    }

    /// Call every registered listener with `value`.
    pub fn emit(&self, value: &T) {
        // Snapshot so listeners may (un)subscribe while being called.
        let callbacks: Vec<Callback<T>> = self
            .inner
            .entries
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for cb in callbacks {
            cb(value);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by every `subscribe`/`on_*` call. Unsubscribes when
/// dropped; `unsubscribe` does it explicitly.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to cancel (e.g. returned by an unmounted
    /// engine).
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// A shared value with change notification. Cloning shares the value.
pub struct Observable<T> {
    value: Rc<RefCell<T>>,
    listeners: Listeners<T>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
            listeners: Listeners {
                inner: Rc::clone(&self.listeners.inner),
            },
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Rc::new(RefCell::new(value)),
            listeners: Listeners::new(),
        }
    }

    /// A clone of the current value.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Read the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Replace the value. Listeners run only if it changed.
    /// Returns whether it changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.notify();
        true
    }

    /// Mutate the value in place; listeners run once afterwards if the
    /// result differs from the previous value.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let (out, changed) = {
            let mut current = self.value.borrow_mut();
            let before = current.clone();
            let out = f(&mut current);
            (out, *current != before)
        };
        if changed {
            self.notify();
        }
        out
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        self.listeners.add(listener)
    }

    /// Subscribe and call the listener once right away with the current value.
    pub fn subscribe_immediate(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let current = self.get();
        listener(&current);
        self.listeners.add(listener)
    }

    /// A derived observable holding `f(value)`, recomputed on every change of
    /// `self`. Its own listeners fire only when the derived value changes.
    /// The link lives as long as the returned subscription.
    pub fn derive<U, F>(&self, f: F) -> (Observable<U>, Subscription)
    where
        U: Clone + PartialEq + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let derived = Observable::new(self.with(&f));
        let target = derived.clone();
        let link = self.subscribe(move |value| {
            target.set(f(value));
        });
        (derived, link)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&self) {
        let snapshot = self.get();
        self.listeners.emit(&snapshot);
    }
}

/// Scoped boolean flag shared between the two directions of a sync.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    flag: Rc<Cell<bool>>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.flag.get()
    }

    /// Raise the flag until the returned scope is dropped. Nested scopes
    /// restore the outer state.
    pub fn enter(&self) -> GuardScope {
        let previous = self.flag.replace(true);
        GuardScope {
            flag: Rc::clone(&self.flag),
            previous,
        }
    }
}

pub struct GuardScope {
    flag: Rc<Cell<bool>>,
    previous: bool,
}

impl Drop for GuardScope {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}
