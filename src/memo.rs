//! Memo keyed by argument sequences.
//!
//! Each key position is one level of a trie, so `[a]`, `[a, b]` and `[]` are
//! three distinct entries even though they share a prefix. Every level keeps
//! its own slot; the slot is an `Option<V>` wrapping the stored value, so
//! storing e.g. `None` for an `Option` value is retrievable like anything
//! else.

use crate::hash::{FastHashMap, fast_map};
use std::hash::Hash;

struct Level<A, V> {
    slot: Option<V>,
    children: FastHashMap<A, Level<A, V>>,
}

impl<A, V> Level<A, V> {
    fn new() -> Self {
        Self {
            slot: None,
            children: fast_map(),
        }
    }
}

/// Trie-backed map from `[A]` argument sequences to values.
pub struct ArgKeyedMemo<A, V> {
    root: Level<A, V>,
}

impl<A, V> Default for ArgKeyedMemo<A, V>
where
    A: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A, V> ArgKeyedMemo<A, V>
where
    A: Hash + Eq + Clone,
{
    /// Create an empty memo.
    pub fn new() -> Self {
        Self { root: Level::new() }
    }

    fn level(&self, key: &[A]) -> Option<&Level<A, V>> {
        let mut level = &self.root;
        for item in key {
            level = level.children.get(item)?;
        }
        Some(level)
    }

    fn level_mut(&mut self, key: &[A]) -> Option<&mut Level<A, V>> {
        let mut level = &mut self.root;
        for item in key {
            level = level.children.get_mut(item)?;
        }
        Some(level)
    }

    fn level_or_insert(&mut self, key: &[A]) -> &mut Level<A, V> {
        let mut level = &mut self.root;
        for item in key {
            level = level
                .children
                .entry(item.clone())
                .or_insert_with(Level::new);
        }
        level
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: &[A], value: V) {
        self.level_or_insert(key).slot = Some(value);
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: &[A]) -> Option<&V> {
        self.level(key)?.slot.as_ref()
    }

    /// Return the value under `key`, creating it with `factory` if absent.
    ///
    /// `factory` runs at most once per key for as long as the entry is kept.
    pub fn get_or_add<F>(&mut self, key: &[A], factory: F) -> &V
    where
        F: FnOnce(&[A]) -> V,
    {
        self.level_or_insert(key)
            .slot
            .get_or_insert_with(|| factory(key))
    }

    /// Reset the entry for `key` to absent and return what it held.
    ///
    /// Longer keys sharing this prefix are left untouched.
    pub fn delete(&mut self, key: &[A]) -> Option<V> {
        self.level_mut(key)?.slot.take()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.root = Level::new();
    }

    /// Visit every stored value.
    pub fn for_each(&self, mut f: impl FnMut(&V)) {
        fn walk<A, V>(level: &Level<A, V>, f: &mut impl FnMut(&V)) {
            if let Some(value) = &level.slot {
                f(value);
            }
            for child in level.children.values() {
                walk(child, f);
            }
        }
        walk(&self.root, &mut f);
    }
}
