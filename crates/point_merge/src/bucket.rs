//! Growable list of point IDs sharing one spatial cell.

use smallvec::SmallVec;

use crate::constants::BUCKET_INLINE_CAPACITY;
use crate::types::PointId;

/// Point IDs hashed to the same cell, in insertion order.
///
/// Most buckets hold a handful of points, so the first few IDs live inline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bucket {
  ids: SmallVec<[PointId; BUCKET_INLINE_CAPACITY]>,
}

impl Bucket {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      ids: SmallVec::with_capacity(capacity),
    }
  }

  #[inline]
  pub fn push(&mut self, id: PointId) {
    self.ids.push(id);
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.ids.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.ids.is_empty()
  }

  #[inline]
  pub fn ids(&self) -> &[PointId] {
    &self.ids
  }

  pub fn capacity(&self) -> usize {
    self.ids.capacity()
  }

  /// Make room for a batch of `count` IDs plus `headroom` spare slots.
  ///
  /// Only reallocates when the batch does not already fit.
  pub fn reserve_batch(&mut self, count: usize, headroom: usize) {
    if self.ids.capacity() - self.ids.len() < count {
      self.ids.reserve(count + headroom);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_push_keeps_order() {
    let mut bucket = Bucket::with_capacity(1);
    for id in [5, 2, 9, 1, 7] {
      bucket.push(id);
    }
    assert_eq!(bucket.ids(), &[5, 2, 9, 1, 7]);
    assert_eq!(bucket.len(), 5);
    assert!(!bucket.is_empty());
  }

  #[test]
  fn test_reserve_batch_adds_headroom() {
    let mut bucket = Bucket::default();
    for id in 0..BUCKET_INLINE_CAPACITY {
      bucket.push(id);
    }
    bucket.reserve_batch(10, 2);
    assert!(bucket.capacity() >= BUCKET_INLINE_CAPACITY + 12);

    // Already fits: no growth
    let cap = bucket.capacity();
    bucket.reserve_batch(1, 100);
    assert_eq!(bucket.capacity(), cap);
  }
}
