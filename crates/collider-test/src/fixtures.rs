//! Shared state for collision tests: correct and deliberately broken
//! implementations of the same small data structures.
//!
//! The broken ones are memory safe. They split a read-modify-write into a
//! separate read and write, which loses updates when two threads interleave,
//! exactly what a collision is meant to provoke.

use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;

/// Counter whose increment is a load followed by a store.
#[derive(Debug, Default)]
pub struct ThreadUnsafeCounter {
    value: AtomicI64,
}

impl ThreadUnsafeCounter {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one. Concurrent calls can lose updates.
    pub fn increment(&self) {
        let current = self.value.load(Ordering::Relaxed);
        self.value.store(current + 1, Ordering::Relaxed);
    }

    /// Subtracts one. Concurrent calls can lose updates.
    pub fn decrement(&self) {
        let current = self.value.load(Ordering::Relaxed);
        self.value.store(current - 1, Ordering::Relaxed);
    }

    /// Returns the current value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counter with atomic increments.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicI64,
}

impl Counter {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one.
    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::SeqCst);
    }

    /// Subtracts one.
    pub fn decrement(&self) {
        self.value.fetch_sub(1, Ordering::SeqCst);
    }

    /// Returns the current value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }
}

/// List appended to under a single lock.
#[derive(Debug)]
pub struct SharedList<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Default for SharedList<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> SharedList<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item.
    pub fn push(&self, item: T) {
        self.items.lock().push(item);
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Returns a copy of the items.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().clone()
    }
}

/// List whose append copies the contents out, pushes, and writes the copy
/// back. Each step holds the lock, the whole append does not.
#[derive(Debug)]
pub struct RacyList<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Default for RacyList<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> RacyList<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item. Concurrent calls can lose items.
    pub fn push(&self, item: T) {
        let mut copy = self.items.lock().clone();
        copy.push(item);
        *self.items.lock() = copy;
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

/// An apple, identified by its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Apple(pub String);

impl Apple {
    /// Creates an apple.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Set of apples without duplicates.
#[derive(Debug, Default)]
pub struct UniqueApples {
    apples: Mutex<Vec<Apple>>,
}

impl UniqueApples {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the apple unless an equal one is present. Check and insert
    /// happen under one lock.
    pub fn add(&self, apple: Apple) {
        let mut apples = self.apples.lock();
        if !apples.contains(&apple) {
            apples.push(apple);
        }
    }

    /// Like [`UniqueApples::add`], but releases the lock between the check
    /// and the insert, so concurrent calls can add duplicates.
    pub fn add_racy(&self, apple: Apple) {
        let present = self.apples.lock().contains(&apple);
        if !present {
            self.apples.lock().push(apple);
        }
    }

    /// Returns the number of apples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.apples.lock().len()
    }

    /// Returns true if there are no apples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apples.lock().is_empty()
    }

    /// Returns a copy of the apples.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Apple> {
        self.apples.lock().clone()
    }
}
