//! Event-scoped hit accumulation.

use calohit_core::hit::{HitKey, HitRecord};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Result of merging a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First deposit for the key in this event.
    Created,
    /// Deposit added to an existing record.
    Merged,
}

/// Insert-or-accumulate map from hit key to record, one per category.
#[derive(Debug, Clone, Default)]
pub struct HitMap {
    records: HashMap<HitKey, HitRecord>,
}

impl HitMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `em` and `had` to the record for `key`, creating it if needed.
    pub fn merge(&mut self, key: HitKey, em: f64, had: f64) -> MergeOutcome {
        match self.records.entry(key) {
            Entry::Occupied(mut record) => {
                record.get_mut().add_energy_deposit(em, had);
                MergeOutcome::Merged
            }
            Entry::Vacant(slot) => {
                slot.insert(HitRecord::new(key, em, had));
                MergeOutcome::Created
            }
        }
    }

    /// Looks up the record for `key`.
    #[must_use]
    pub fn get(&self, key: &HitKey) -> Option<&HitRecord> {
        self.records.get(key)
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the map holds no record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over the records in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &HitRecord> {
        self.records.values()
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Removes every record, returning them in arbitrary order.
    pub fn drain(&mut self) -> impl Iterator<Item = HitRecord> + '_ {
        self.records.drain().map(|(_, record)| record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use calohit_core::hit::{CellId, DepthCode, TimeSlice};

    fn key(cell: u32, time: i64, track: i32) -> HitKey {
        HitKey::new(1, CellId(cell), TimeSlice(time), track, DepthCode::NONE)
    }

    #[test]
    fn test_insert_or_accumulate() {
        let mut map = HitMap::new();
        assert_eq!(map.merge(key(500, 0, 1), 2.0, 0.0), MergeOutcome::Created);
        assert_eq!(map.merge(key(500, 0, 1), 3.0, 0.0), MergeOutcome::Merged);
        assert_eq!(map.merge(key(500, 0, 1), 0.0, 1.5), MergeOutcome::Merged);
        assert_eq!(map.len(), 1);

        let record = map.get(&key(500, 0, 1)).unwrap();
        assert_relative_eq!(record.em, 5.0);
        assert_relative_eq!(record.had, 1.5);
    }

    #[test]
    fn test_key_components_separate_records() {
        let mut map = HitMap::new();
        map.merge(key(500, 0, 1), 1.0, 0.0);
        map.merge(key(501, 0, 1), 1.0, 0.0);
        map.merge(key(500, 1, 1), 1.0, 0.0);
        map.merge(key(500, 0, 2), 1.0, 0.0);
        map.merge(
            HitKey::new(1, CellId(500), TimeSlice(0), 1, DepthCode::pack(false, 0)),
            1.0,
            0.0,
        );
        map.merge(
            HitKey::new(2, CellId(500), TimeSlice(0), 1, DepthCode::NONE),
            1.0,
            0.0,
        );
        assert_eq!(map.len(), 6);
    }

    #[test]
    fn test_order_independence() {
        let deposits = [(0.25, 0.0), (1.5, 0.0), (0.0, 0.75), (3.0, 0.0), (0.0, 2.0)];

        let mut forward = HitMap::new();
        for (em, had) in deposits {
            forward.merge(key(9, 3, 4), em, had);
        }
        let mut backward = HitMap::new();
        for (em, had) in deposits.iter().rev() {
            backward.merge(key(9, 3, 4), *em, *had);
        }

        let f = forward.get(&key(9, 3, 4)).unwrap();
        let b = backward.get(&key(9, 3, 4)).unwrap();
        assert_relative_eq!(f.em, 4.75);
        assert_relative_eq!(f.had, 2.75);
        assert_relative_eq!(f.em, b.em);
        assert_relative_eq!(f.had, b.had);
    }

    #[test]
    fn test_drain_empties_map() {
        let mut map = HitMap::new();
        map.merge(key(1, 0, 1), 1.0, 0.0);
        map.merge(key(2, 0, 1), 1.0, 0.0);
        assert_eq!(map.drain().count(), 2);
        assert!(map.is_empty());
    }
}
