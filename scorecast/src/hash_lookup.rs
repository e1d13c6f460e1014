//! Bidirectional mapping between a set of distinct items and dense indices `0..len`.

use rustc_hash::FxHashMap;
use std::borrow::Borrow;
use std::hash::Hash;
use std::ops::Index;

#[derive(Debug, Clone)]
pub struct HashLookup<T: Eq + Hash> {
    item_to_index: FxHashMap<T, usize>,
    index_to_item: Vec<T>,
}
impl<T: Eq + Hash> HashLookup<T> {
    pub fn item_at(&self, index: usize) -> Option<&T> {
        self.index_to_item.get(index)
    }

    /// Resolves the index of an item by any borrowed form of it, so that a `HashLookup<String>`
    /// can be queried with a `&str`.
    pub fn index_of<Q>(&self, item: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.item_to_index.get(item).copied()
    }

    pub fn contains<Q>(&self, item: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.item_to_index.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.index_to_item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_item.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.index_to_item
    }
}

impl<T: Eq + Hash> Index<usize> for HashLookup<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.item_at(index)
            .unwrap_or_else(|| panic!("no item at index {index}"))
    }
}

impl<T: Eq + Hash + Clone> From<Vec<T>> for HashLookup<T> {
    fn from(index_to_item: Vec<T>) -> Self {
        let mut item_to_index =
            FxHashMap::with_capacity_and_hasher(index_to_item.len(), Default::default());
        for (index, item) in index_to_item.iter().enumerate() {
            if let Some(existing_index) = item_to_index.insert(item.clone(), index) {
                panic!("duplicate item at index {index}, previously at {existing_index}")
            }
        }
        Self {
            item_to_index,
            index_to_item,
        }
    }
}
