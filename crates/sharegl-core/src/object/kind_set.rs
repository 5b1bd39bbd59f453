// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! An ordered, growable list of object ids for a single kind.

use super::kind::{ObjectDeleter, ObjectId, ObjectKind};
use crate::error::DeletionError;

/// The smallest capacity a non-empty [`KindSet`] shrinks back to.
pub const MIN_CAPACITY: usize = 16;

/// The outcome of draining a [`KindSet`] through a deleter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Number of ids successfully deleted.
    pub deleted: usize,
    /// Number of ids whose deletion failed. They remain in the set.
    pub failed: usize,
    /// The last failure encountered, if any.
    pub last_error: Option<DeletionError>,
}

impl DrainReport {
    /// Folds another report into this one, keeping the most recent error.
    pub fn merge(&mut self, other: DrainReport) {
        self.deleted += other.deleted;
        self.failed += other.failed;
        if other.last_error.is_some() {
            self.last_error = other.last_error;
        }
    }

    /// Returns `true` if no deletion failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// The live ids of one object kind.
///
/// Storage grows geometrically and shrinks to a quarter once occupancy drops
/// under a quarter of the capacity. Inserting the same id twice is not
/// detected; call sites own that contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindSet {
    ids: Vec<ObjectId>,
    capacity: usize,
}

impl KindSet {
    /// Creates an empty set without allocating.
    pub const fn new() -> Self {
        Self {
            ids: Vec::new(),
            capacity: 0,
        }
    }

    /// Number of ids in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the set holds no id.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The logical capacity of the backing storage.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if `id` is present.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    /// The ids in insertion order.
    pub fn as_slice(&self) -> &[ObjectId] {
        &self.ids
    }

    /// Appends `id`, doubling the capacity when full.
    pub fn insert(&mut self, id: ObjectId) {
        self.reserve_for(self.ids.len() + 1);
        self.ids.push(id);
    }

    /// Removes the first occurrence of `id`, keeping the remaining order.
    ///
    /// Returns `false` if `id` was not present.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        let Some(pos) = self.ids.iter().position(|&x| x == id) else {
            return false;
        };
        self.ids.remove(pos);
        self.maybe_shrink();
        true
    }

    /// Moves every id of `other` to the end of this set, leaving `other` empty.
    pub fn append(&mut self, other: &mut KindSet) {
        if other.is_empty() {
            return;
        }
        self.reserve_for(self.ids.len() + other.ids.len());
        self.ids.append(&mut other.ids);
        other.clear();
    }

    /// Removes every id and releases the storage.
    pub fn clear(&mut self) {
        self.ids = Vec::new();
        self.capacity = 0;
    }

    /// Takes the contents out, leaving an empty set behind.
    pub fn take(&mut self) -> KindSet {
        std::mem::take(self)
    }

    /// Deletes every id through `deleter`.
    ///
    /// A failure does not stop the drain: the remaining ids are still
    /// attempted. Ids that failed stay in the set, in their original order,
    /// so they can be handed to a deletion pool for a later retry.
    pub fn delete_all(&mut self, kind: ObjectKind, deleter: &dyn ObjectDeleter) -> DrainReport {
        let mut report = DrainReport::default();
        if self.ids.is_empty() {
            return report;
        }

        let ids = std::mem::take(&mut self.ids);
        let mut kept = Vec::new();
        for id in ids {
            match kind.delete(deleter, id) {
                Ok(()) => report.deleted += 1,
                Err(err) => {
                    report.failed += 1;
                    report.last_error = Some(err);
                    kept.push(id);
                }
            }
        }

        self.ids = kept;
        if self.ids.is_empty() {
            self.capacity = 0;
        } else {
            self.maybe_shrink();
        }
        report
    }

    fn reserve_for(&mut self, needed: usize) {
        if needed <= self.capacity {
            return;
        }
        let mut new_capacity = self.capacity.max(MIN_CAPACITY);
        while new_capacity < needed {
            new_capacity *= 2;
        }
        self.ids.reserve_exact(new_capacity - self.ids.len());
        self.capacity = new_capacity;
    }

    fn maybe_shrink(&mut self) {
        if self.capacity <= MIN_CAPACITY || self.ids.len() >= self.capacity / 4 {
            return;
        }
        self.capacity = (self.capacity / 4).max(MIN_CAPACITY);
        self.ids.shrink_to(self.capacity);
    }
}

impl FromIterator<ObjectId> for KindSet {
    fn from_iter<I: IntoIterator<Item = ObjectId>>(iter: I) -> Self {
        let mut set = KindSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::Range<u64>) -> impl Iterator<Item = ObjectId> {
        range.map(ObjectId)
    }

    #[test]
    fn test_insert_grows_geometrically() {
        let mut set = KindSet::new();
        assert_eq!(set.capacity(), 0);

        set.insert(ObjectId(1));
        assert_eq!(set.capacity(), MIN_CAPACITY);

        for id in ids(2..18) {
            set.insert(id);
        }
        assert_eq!(set.len(), 17);
        assert_eq!(set.capacity(), MIN_CAPACITY * 2);

        for id in ids(18..40) {
            set.insert(id);
        }
        assert_eq!(set.capacity(), MIN_CAPACITY * 4);
    }

    #[test]
    fn test_remove_first_match_and_compacts() {
        let mut set: KindSet = [1, 2, 3, 2].into_iter().map(ObjectId).collect();
        assert!(set.remove(ObjectId(2)));
        assert_eq!(set.as_slice(), &[ObjectId(1), ObjectId(3), ObjectId(2)]);
        assert!(!set.remove(ObjectId(9)));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_remove_shrinks_below_quarter_occupancy() {
        let mut set: KindSet = ids(0..64).collect();
        assert_eq!(set.capacity(), 64);

        for id in ids(0..48) {
            set.remove(id);
        }
        // 16 left, exactly a quarter: no shrink yet.
        assert_eq!(set.capacity(), 64);

        set.remove(ObjectId(48));
        assert_eq!(set.len(), 15);
        assert_eq!(set.capacity(), MIN_CAPACITY);

        for id in ids(49..64) {
            set.remove(id);
        }
        assert!(set.is_empty());
        assert_eq!(set.capacity(), MIN_CAPACITY);
    }

    #[test]
    fn test_add_then_remove_restores_size() {
        let mut set: KindSet = ids(0..5).collect();
        set.insert(ObjectId(100));
        assert!(set.remove(ObjectId(100)));
        assert_eq!(set.len(), 5);
        assert!(!set.contains(ObjectId(100)));
    }

    #[test]
    fn test_duplicates_are_not_deduplicated() {
        let mut set = KindSet::new();
        set.insert(ObjectId(4));
        set.insert(ObjectId(4));
        assert_eq!(set.len(), 2);
        set.remove(ObjectId(4));
        assert!(set.contains(ObjectId(4)));
    }

    #[test]
    fn test_append_moves_everything() {
        let mut a: KindSet = ids(0..3).collect();
        let mut b: KindSet = ids(10..30).collect();
        a.append(&mut b);
        assert!(b.is_empty());
        assert_eq!(b.capacity(), 0);
        assert_eq!(a.len(), 23);
        assert_eq!(a.capacity(), MIN_CAPACITY * 2);
        assert_eq!(a.as_slice()[3], ObjectId(10));
    }
}
