//! Source-to-target point ID remapping filled in by merges.
//!
//! Slots are atomics so per-cell merges running in parallel can fill their
//! own entries without locking. Each source point lives in exactly one
//! bucket, so every slot has a single writer.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::{PointId, UNMAPPED};

/// Maps every point of a source locator to its ID in the merged target.
#[derive(Debug)]
pub struct RemapTable {
  ids: Vec<AtomicUsize>,
}

impl RemapTable {
  /// Table for `len` source points, all unmapped.
  pub fn new(len: usize) -> Self {
    Self {
      ids: (0..len).map(|_| AtomicUsize::new(UNMAPPED)).collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ids.is_empty()
  }

  /// Target ID of a source point, if merged.
  #[inline]
  pub fn get(&self, source_id: PointId) -> Option<PointId> {
    match self.ids[source_id].load(Ordering::Relaxed) {
      UNMAPPED => None,
      id => Some(id),
    }
  }

  #[inline]
  pub(crate) fn set(&self, source_id: PointId, target_id: PointId) {
    self.ids[source_id].store(target_id, Ordering::Relaxed);
  }

  /// Number of source points not yet mapped.
  pub fn unmapped_count(&self) -> usize {
    self
      .ids
      .iter()
      .filter(|id| id.load(Ordering::Relaxed) == UNMAPPED)
      .count()
  }

  /// True when every source point has a target.
  pub fn is_complete(&self) -> bool {
    self.unmapped_count() == 0
  }

  /// Plain copy of the table; unmapped slots hold [`UNMAPPED`].
  pub fn to_vec(&self) -> Vec<PointId> {
    self.ids.iter().map(|id| id.load(Ordering::Relaxed)).collect()
  }

  /// Rewrite source IDs in place to target IDs.
  ///
  /// Panics on an ID the table has not mapped: that would leave a dangling
  /// reference in the caller's topology.
  pub fn remap_ids(&self, ids: &mut [PointId]) {
    for id in ids {
      *id = self
        .get(*id)
        .unwrap_or_else(|| panic!("point {} was never merged", id));
    }
  }
}

impl Clone for RemapTable {
  fn clone(&self) -> Self {
    Self {
      ids: self.to_vec().into_iter().map(AtomicUsize::new).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_new_table_is_unmapped() {
    let table = RemapTable::new(3);
    assert_eq!(table.len(), 3);
    assert_eq!(table.unmapped_count(), 3);
    assert!(!table.is_complete());
    assert_eq!(table.get(1), None);
  }

  #[test]
  fn test_set_and_remap() {
    let table = RemapTable::new(3);
    table.set(0, 10);
    table.set(1, 4);
    table.set(2, 10);
    assert!(table.is_complete());
    assert_eq!(table.to_vec(), vec![10, 4, 10]);

    let mut conn = vec![2, 1, 0, 1];
    table.remap_ids(&mut conn);
    assert_eq!(conn, vec![10, 4, 10, 4]);
  }

  #[test]
  #[should_panic(expected = "never merged")]
  fn test_remap_unmapped_panics() {
    let table = RemapTable::new(2);
    table.set(0, 0);
    table.remap_ids(&mut [1]);
  }

  #[test]
  fn test_empty_table_is_complete() {
    let table = RemapTable::new(0);
    assert!(table.is_empty());
    assert!(table.is_complete());
  }
}
