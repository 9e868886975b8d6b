//! Shared slot storage and the atomic insertion cursor.
//!
//! Concurrent merges into one locator never lock the point array. Each merge
//! reserves a contiguous block of IDs with a single `fetch_add` on the
//! [`InsertionCursor`] and then writes only inside that block:
//!
//! ```text
//!   cursor = 7                      merge A reserves 2     merge B reserves 3
//!   ┌───┬───┬───┬───┬───┬───┬───┐   ┌───┬───┐              ┌───┬───┬───┐
//!   │ 0 │ 1 │ 2 │ 3 │ 4 │ 5 │ 6 │   │ 7 │ 8 │              │ 9 │10 │11 │
//!   └───┴───┴───┴───┴───┴───┴───┘   └───┴───┘              └───┴───┴───┘
//!        existing points              A writes here          B writes here
//! ```
//!
//! A [`ReservedRange`] can only be produced by the cursor, is not `Clone`,
//! and is required by every shared write, so two live ranges never overlap.

use std::cell::UnsafeCell;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::PointId;

// =============================================================================
// InsertionCursor
// =============================================================================

/// Next free slot in a shared point array ("atomic insertion id").
///
/// Only ever increases while merging.
#[derive(Debug, Default)]
pub struct InsertionCursor(AtomicUsize);

impl InsertionCursor {
  pub fn new(start: PointId) -> Self {
    Self(AtomicUsize::new(start))
  }

  /// Current value.
  #[inline]
  pub fn get(&self) -> PointId {
    self.0.load(Ordering::Acquire)
  }

  /// Overwrite the cursor. Requires exclusive access.
  #[inline]
  pub fn set(&mut self, value: PointId) {
    *self.0.get_mut() = value;
  }

  /// Reserve `count` consecutive IDs in one atomic step.
  ///
  /// The pre-increment value becomes the first ID of the block.
  #[inline]
  pub(crate) fn reserve(&self, count: usize) -> ReservedRange {
    let first_id = self.0.fetch_add(count, Ordering::AcqRel);
    ReservedRange {
      ids: first_id..first_id + count,
    }
  }
}

impl Clone for InsertionCursor {
  fn clone(&self) -> Self {
    Self::new(self.get())
  }
}

/// Block of IDs exclusively owned by one merge call.
#[derive(Debug)]
pub(crate) struct ReservedRange {
  ids: Range<PointId>,
}

impl ReservedRange {
  #[inline]
  pub(crate) fn first_id(&self) -> PointId {
    self.ids.start
  }

  #[inline]
  pub(crate) fn end(&self) -> PointId {
    self.ids.end
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.ids.len()
  }

  #[inline]
  pub(crate) fn contains(&self, id: PointId) -> bool {
    self.ids.contains(&id)
  }

  pub(crate) fn ids(&self) -> Range<PointId> {
    self.ids.clone()
  }
}

// =============================================================================
// SlotVec
// =============================================================================

/// Fixed-length storage that accepts writes to disjoint reserved slots from
/// several threads at once.
///
/// Length changes need `&mut self`. Shared writes need a [`ReservedRange`]
/// covering the target slot. Shared reads are only issued for slots that no
/// live range covers (the merge reads points already referenced by a bucket
/// it exclusively borrows).
pub(crate) struct SlotVec<T> {
  slots: Vec<UnsafeCell<T>>,
}

// SAFETY: concurrent access goes through `write_reserved`, whose slot must lie
// inside a `ReservedRange`. Ranges come from a single `fetch_add`, so no two
// threads ever write the same slot, and no thread reads a slot that another
// thread's live range covers.
unsafe impl<T: Send> Sync for SlotVec<T> {}

impl<T: Copy + Default> SlotVec<T> {
  pub(crate) fn new() -> Self {
    Self { slots: Vec::new() }
  }

  pub(crate) fn with_capacity(capacity: usize) -> Self {
    Self {
      slots: Vec::with_capacity(capacity),
    }
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.slots.len()
  }

  /// Grow (filling with defaults) or shrink to exactly `len` slots.
  pub(crate) fn resize(&mut self, len: usize) {
    self.slots.resize_with(len, || UnsafeCell::new(T::default()));
  }

  /// Grow to at least `len` slots.
  pub(crate) fn ensure_len(&mut self, len: usize) {
    if len > self.slots.len() {
      self.resize(len);
    }
  }

  pub(crate) fn truncate(&mut self, len: usize) {
    self.slots.truncate(len);
  }

  pub(crate) fn push(&mut self, value: T) {
    self.slots.push(UnsafeCell::new(value));
  }

  /// Exclusive write.
  #[inline]
  pub(crate) fn set(&mut self, idx: usize, value: T) {
    *self.slots[idx].get_mut() = value;
  }

  /// Read a slot.
  ///
  /// Callers must not read a slot covered by another thread's live
  /// reservation.
  #[inline]
  pub(crate) fn get(&self, idx: usize) -> T {
    // SAFETY: see the type-level contract; the slot is not being written.
    unsafe { *self.slots[idx].get() }
  }

  /// Write a slot inside a reservation held by the caller.
  #[inline]
  pub(crate) fn write_reserved(&self, range: &ReservedRange, idx: usize, value: T) {
    assert!(
      range.contains(idx),
      "slot {} outside reserved range {:?}",
      idx,
      range.ids
    );
    // SAFETY: `range` is exclusively owned by the caller and covers `idx`.
    unsafe { *self.slots[idx].get() = value }
  }

  /// Write `values.len()` consecutive slots starting at `start`, all of
  /// which must lie in one tuple owned by `owner`.
  #[inline]
  pub(crate) fn write_span(&self, owner: PointId, range: &ReservedRange, start: usize, values: &[T]) {
    assert!(
      range.contains(owner),
      "tuple {} outside reserved range {:?}",
      owner,
      range.ids
    );
    let span = &self.slots[start..start + values.len()];
    for (slot, value) in span.iter().zip(values) {
      // SAFETY: the span belongs to tuple `owner`, which `range` covers.
      unsafe { *slot.get() = *value }
    }
  }

  /// View as a plain slice. Requires that no shared writes are in flight,
  /// which holds whenever the owner is reachable through `&self` outside a
  /// merge.
  pub(crate) fn as_slice(&self) -> &[T] {
    // SAFETY: `UnsafeCell<T>` is `repr(transparent)` over `T`.
    unsafe { std::slice::from_raw_parts(self.slots.as_ptr() as *const T, self.slots.len()) }
  }
}

impl<T: Copy + Default> Clone for SlotVec<T> {
  fn clone(&self) -> Self {
    Self {
      slots: self
        .as_slice()
        .iter()
        .map(|v| UnsafeCell::new(*v))
        .collect(),
    }
  }
}

impl<T: Copy + Default + std::fmt::Debug> std::fmt::Debug for SlotVec<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_list().entries(self.as_slice()).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_reserve_returns_pre_increment_value() {
    let cursor = InsertionCursor::new(7);
    let range = cursor.reserve(3);
    assert_eq!(range.first_id(), 7);
    assert_eq!(range.end(), 10);
    assert_eq!(range.len(), 3);
    assert_eq!(cursor.get(), 10);
  }

  #[test]
  fn test_reserve_zero_is_empty() {
    let cursor = InsertionCursor::new(4);
    let range = cursor.reserve(0);
    assert_eq!(range.len(), 0);
    assert!(!range.contains(4));
    assert_eq!(cursor.get(), 4);
  }

  #[test]
  fn test_concurrent_reservations_do_not_overlap() {
    use rayon::prelude::*;

    let cursor = InsertionCursor::new(0);
    let mut ranges: Vec<(usize, usize)> = (1..=200usize)
      .into_par_iter()
      .map(|n| {
        let r = cursor.reserve(n % 7 + 1);
        (r.first_id(), r.end())
      })
      .collect();

    ranges.sort_unstable();
    for w in ranges.windows(2) {
      assert_eq!(w[0].1, w[1].0, "ranges must tile without gaps or overlap");
    }
    let total: usize = (1..=200usize).map(|n| n % 7 + 1).sum();
    assert_eq!(cursor.get(), total);
  }

  #[test]
  fn test_reserved_writes_from_many_threads() {
    use rayon::prelude::*;

    let cursor = InsertionCursor::new(0);
    let mut slots = SlotVec::<u64>::new();
    slots.resize(1000);

    (0..100u64).into_par_iter().for_each(|_| {
      let range = cursor.reserve(10);
      for id in range.ids() {
        slots.write_reserved(&range, id, id as u64 * 2);
      }
    });

    assert_eq!(cursor.get(), 1000);
    for (i, v) in slots.as_slice().iter().enumerate() {
      assert_eq!(*v, i as u64 * 2);
    }
  }

  #[test]
  #[should_panic(expected = "outside reserved range")]
  fn test_write_outside_range_panics() {
    let cursor = InsertionCursor::new(0);
    let mut slots = SlotVec::<f32>::new();
    slots.resize(4);
    let range = cursor.reserve(2);
    slots.write_reserved(&range, 3, 1.0);
  }

  #[test]
  fn test_resize_and_truncate() {
    let mut slots = SlotVec::<i32>::with_capacity(2);
    slots.push(5);
    slots.ensure_len(3);
    assert_eq!(slots.as_slice(), &[5, 0, 0]);

    slots.set(1, 9);
    slots.ensure_len(2);
    assert_eq!(slots.len(), 3);

    slots.truncate(2);
    assert_eq!(slots.as_slice(), &[5, 9]);
    assert_eq!(slots.clone().as_slice(), &[5, 9]);
  }
}
