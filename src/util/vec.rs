//! Growable arrays.
//!
//! [`GrowVec`] reserves ahead with a 4/3 growth factor and is used wherever
//! the engine accumulates argument vectors, tokens or object lists.
//! [`PlainArray`] grows by exactly one slot per push and suits short-lived,
//! small collections.

use std::ops::Deref;

/// Contiguous growable storage with amortized 4/3 growth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowVec<T> {
    items: Vec<T>,
}

impl<T> GrowVec<T> {
    /// Create an empty vector without allocating.
    pub fn new() -> Self {
        GrowVec { items: Vec::new() }
    }

    /// Create an empty vector with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        GrowVec {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Ensure the total capacity is at least `amount` items.
    pub fn reserve_total(&mut self, amount: usize) {
        if amount <= self.items.capacity() {
            return;
        }
        self.items.reserve_exact(amount - self.items.len());
    }

    fn maybe_grow(&mut self) {
        if self.items.len() < self.items.capacity() {
            return;
        }

        let growth_target = ((self.items.len() + 1) * 4) / 3;
        debug_assert!(growth_target > self.items.len());
        self.reserve_total(growth_target);
    }

    /// Append an item at the end.
    pub fn push(&mut self, value: T) {
        self.maybe_grow();
        self.items.push(value);
    }

    /// Remove the item at `index`, shifting the tail left.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        assert!(
            index < self.items.len(),
            "remove index {} out of bounds (len {})",
            index,
            self.items.len()
        );
        self.items.remove(index)
    }

    /// Remove and return the last item.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Number of items the vector can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// View the items as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Consume into a plain `Vec`.
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for GrowVec<T> {
    fn default() -> Self {
        GrowVec::new()
    }
}

impl<T> Deref for GrowVec<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> Extend<T> for GrowVec<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

impl<T> FromIterator<T> for GrowVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut vec = GrowVec::new();
        vec.extend(iter);
        vec
    }
}

impl<T> IntoIterator for GrowVec<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a GrowVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> From<GrowVec<T>> for Vec<T> {
    fn from(vec: GrowVec<T>) -> Self {
        vec.items
    }
}

/// Array that grows by exactly one slot per push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainArray<T> {
    items: Vec<T>,
}

impl<T> PlainArray<T> {
    pub fn new() -> Self {
        PlainArray { items: Vec::new() }
    }

    pub fn push(&mut self, value: T) {
        self.items.reserve_exact(1);
        self.items.push(value);
    }

    /// Remove the item at `index`, shifting the tail left.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        assert!(
            index < self.items.len(),
            "remove index {} out of bounds (len {})",
            index,
            self.items.len()
        );
        self.items.remove(index)
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for PlainArray<T> {
    fn default() -> Self {
        PlainArray::new()
    }
}

impl<T> Deref for PlainArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}
