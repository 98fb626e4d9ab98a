//! Generic arena for ID-indexed storage of circuit entities.
//!
//! The [`Arena`] provides O(1) insertion, lookup and removal by opaque
//! [`ArenaId`] keys. Removed slots are left as tombstones so that the IDs of
//! surviving entries never change and a removed ID is never handed out again.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait for opaque ID types used as arena keys.
///
/// Implementors must provide a bijection between `u32` indices and the ID type.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// An ID-indexed container with stable keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena<I: ArenaId, T> {
    slots: Vec<Option<T>>,
    live: usize,
    #[serde(skip)]
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
            _marker: PhantomData,
        }
    }

    /// Allocates a new item in the arena and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.slots.len() as u32);
        self.slots.push(Some(item));
        self.live += 1;
        id
    }

    /// Returns the ID the next [`alloc`](Self::alloc) will hand out.
    pub fn next_id(&self) -> I {
        I::from_raw(self.slots.len() as u32)
    }

    /// Returns a reference to the item with the given ID, if it is live.
    pub fn get(&self, id: I) -> Option<&T> {
        self.slots.get(id.as_raw() as usize).and_then(Option::as_ref)
    }

    /// Returns a mutable reference to the item with the given ID, if it is live.
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots
            .get_mut(id.as_raw() as usize)
            .and_then(Option::as_mut)
    }

    /// Returns `true` if `id` refers to a live item.
    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    /// Removes and returns the item, leaving a tombstone in its slot.
    pub fn remove(&mut self, id: I) -> Option<T> {
        let item = self.slots.get_mut(id.as_raw() as usize)?.take();
        if item.is_some() {
            self.live -= 1;
        }
        item
    }

    /// Returns the number of live items.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if the arena contains no live items.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates over `(ID, &T)` pairs of live items in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|item| (I::from_raw(i as u32), item)))
    }

    /// Iterates over `(ID, &mut T)` pairs of live items in allocation order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|item| (I::from_raw(i as u32), item)))
    }

    /// Iterates over the IDs of live items in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = I> + '_ {
        self.iter().map(|(id, _)| id)
    }

    /// Iterates over references to live items in allocation order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Option::as_ref)
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if the ID is out of bounds or was removed.
    fn index(&self, id: I) -> &T {
        match self.get(id) {
            Some(item) => item,
            None => panic!("arena index {} is not live", id.as_raw()),
        }
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        match self.get_mut(id) {
            Some(item) => item,
            None => panic!("arena index {} is not live", id.as_raw()),
        }
    }
}
