//! Folding one locator's buckets into another.
//!
//! # Per-cell algorithm
//!
//! ```text
//!   old bucket[idx] empty? ──yes──► return (no allocation)
//!          │ no
//!          ▼
//!   this bucket[idx] missing? ──yes──► create it; every old point is new
//!          │ no
//!          ▼
//!   for each old point: linear scan of this bucket's existing points
//!       exact match ──► id_list[old] = existing
//!       no match    ──► queue
//!          │
//!          ▼
//!   reserve queue.len() IDs with ONE fetch_add  ──► first_id
//!          │
//!          ▼
//!   for k, queued point: id = first_id + k
//!       push id into bucket, write coordinates, id_list[old] = id,
//!       copy attribute tuple old → id
//! ```
//!
//! When the source stores wider coordinates than the target (f64 into f32),
//! narrowing can move a point across a cell boundary. Such points are set
//! aside during the cell merge and inserted afterwards, one at a time, into
//! the bucket their stored coordinates hash to.
//!
//! Cells are independent: merges of different bucket indices touch different
//! buckets and disjoint reserved ID ranges, so `merge_all` runs them in
//! parallel with only the cursor contended. A bucket index is never merged
//! by two tasks at once; `merge_all` hands each task an exclusive `&mut`
//! borrow of its bucket.

use rayon::prelude::*;
use smallvec::SmallVec;
use web_time::Instant;

use super::MergeLocator;
use crate::bucket::Bucket;
use crate::constants::{bucket_growth_headroom, initial_bucket_capacity};
use crate::grid::BucketGrid;
use crate::metrics::MergeStats;
use crate::point_data::PointData;
use crate::remap::RemapTable;
use crate::slots::{InsertionCursor, SlotVec};
use crate::types::{convert_point, point_to_f64, same_point, Coord, PointId, Precision};

/// Buckets handed to one rayon task at minimum.
const MIN_BUCKETS_PER_TASK: usize = 64;

/// Points queued for insertion before a batch spills to the heap.
const INLINE_BATCH: usize = 8;

/// Source points whose converted coordinates hash outside the merged cell.
type Strays<T> = Vec<(PointId, [T; 3])>;

/// Read access to a locator being merged from.
///
/// [`MergeLocator`] implements this for every coordinate type. Other point
/// containers can implement it to be merged through the generic `f64` path.
pub trait MergeSource: Sync {
  fn grid(&self) -> &BucketGrid;

  fn number_of_points(&self) -> usize;

  /// IDs in bucket `idx`, `None` when no bucket was allocated.
  fn bucket_ids(&self, idx: usize) -> Option<&[PointId]>;

  /// Coordinates of a point, widened to `f64`.
  fn point_f64(&self, id: PointId) -> [f64; 3];
}

impl<U: Coord> MergeSource for MergeLocator<U> {
  fn grid(&self) -> &BucketGrid {
    &self.grid
  }

  fn number_of_points(&self) -> usize {
    self.insertion_point_id
  }

  fn bucket_ids(&self, idx: usize) -> Option<&[PointId]> {
    self.buckets[idx].as_ref().map(Bucket::ids)
  }

  fn point_f64(&self, id: PointId) -> [f64; 3] {
    let p = self.points.get(id);
    [p[0].to_f64(), p[1].to_f64(), p[2].to_f64()]
  }
}

/// Outcome of merging one or more cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeCounts {
  /// Source points appended as new points.
  pub inserted: usize,
  /// Source points matched to an existing point.
  pub duplicates: usize,
}

impl MergeCounts {
  fn combine(self, other: MergeCounts) -> MergeCounts {
    MergeCounts {
      inserted: self.inserted + other.inserted,
      duplicates: self.duplicates + other.duplicates,
    }
  }
}

/// Shared state of the accumulating locator during a merge.
struct MergeTarget<'a, T: Coord> {
  points: &'a SlotVec<[T; 3]>,
  cursor: &'a InsertionCursor,
  out_pd: &'a PointData,
  /// Set when conversion to `T` may change a point's bucket.
  rehash: Option<&'a BucketGrid>,
  initial_capacity: usize,
  headroom: usize,
}

/// Merge one cell. `fetch` reads a source point in target representation.
///
/// Points that no longer hash to `idx` after conversion go to `strays`.
#[allow(clippy::too_many_arguments)]
fn merge_bucket<T, F>(
  target: &MergeTarget<'_, T>,
  idx: usize,
  slot: &mut Option<Bucket>,
  old_ids: &[PointId],
  fetch: F,
  pt_data: &PointData,
  id_list: &RemapTable,
  strays: &mut Strays<T>,
) -> MergeCounts
where
  T: Coord,
  F: Fn(PointId) -> [T; 3],
{
  let mut counts = MergeCounts::default();
  let mut candidates: SmallVec<[(PointId, [T; 3]); INLINE_BATCH]> = SmallVec::new();
  for &old_id in old_ids {
    let x = fetch(old_id);
    match target.rehash {
      Some(grid) if grid.bucket_index(point_to_f64(x)) != idx => strays.push((old_id, x)),
      _ => candidates.push((old_id, x)),
    }
  }
  if candidates.is_empty() {
    return counts;
  }

  let is_new = slot.is_none();
  let bucket = slot.get_or_insert_with(|| Bucket::with_capacity(target.initial_capacity));

  let pending = if is_new {
    // Nothing to duplicate against.
    candidates
  } else {
    // Only points present before this call are candidates.
    let existing = bucket.ids();
    let mut pending = SmallVec::new();
    for (old_id, x) in candidates {
      match existing
        .iter()
        .copied()
        .find(|&id| same_point(&target.points.get(id), &x))
      {
        Some(id) => {
          id_list.set(old_id, id);
          counts.duplicates += 1;
        }
        None => pending.push((old_id, x)),
      }
    }
    pending
  };

  if pending.is_empty() {
    return counts;
  }

  let range = target.cursor.reserve(pending.len());
  assert!(
    range.end() <= target.points.len(),
    "merge reserved ids {}..{} but point storage holds {}",
    range.first_id(),
    range.end(),
    target.points.len()
  );

  bucket.reserve_batch(range.len(), target.headroom);
  for ((old_id, x), new_id) in pending.into_iter().zip(range.ids()) {
    bucket.push(new_id);
    target.points.write_reserved(&range, new_id, x);
    id_list.set(old_id, new_id);
    target.out_pd.copy_tuple_reserved(&range, pt_data, old_id, new_id);
  }
  counts.inserted = range.len();

  counts
}

impl<T: Coord> MergeLocator<T> {
  /// Merge cell `idx` of `old` into this locator.
  ///
  /// Coordinates are copied through the typed path (`U` → `T` conversion is
  /// a plain copy when the types agree). `id_list` receives the final ID of
  /// every point in the old cell; new points carry their tuple from
  /// `pt_data` into `out_pd`.
  ///
  /// # Panics
  ///
  /// On structural violations: `idx` out of range, grids that differ,
  /// `id_list` smaller than `old`, mismatched attribute layouts, or a call
  /// without a prior [`initialize_merge`](Self::initialize_merge).
  pub fn merge<U: Coord>(
    &mut self,
    idx: usize,
    old: &MergeLocator<U>,
    out_pd: &mut PointData,
    pt_data: &PointData,
    id_list: &RemapTable,
  ) -> MergeCounts {
    let old_points = old.points.as_slice();
    let fetch = |id: PointId| convert_point(old_points[id]);
    let rehash = T::PRECISION != U::PRECISION;
    self.merge_cell_with(idx, old, fetch, rehash, out_pd, pt_data, id_list)
  }

  /// Merge cell `idx` of any [`MergeSource`], reading coordinates as `f64`.
  pub fn merge_from_source(
    &mut self,
    idx: usize,
    old: &dyn MergeSource,
    out_pd: &mut PointData,
    pt_data: &PointData,
    id_list: &RemapTable,
  ) -> MergeCounts {
    let fetch = |id: PointId| convert_point(old.point_f64(id));
    let rehash = T::PRECISION != Precision::Double;
    self.merge_cell_with(idx, old, fetch, rehash, out_pd, pt_data, id_list)
  }

  /// Merge every cell of `old` into this locator, cells in parallel.
  ///
  /// Returns the filled remap table (one entry per point of `old`) and
  /// merge statistics.
  ///
  /// `out_pd` is grown ahead of the merge and may hold spare tuples past the
  /// merged point count until [`finish_merge`](Self::finish_merge) trims it.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "locator::merge_all"))]
  pub fn merge_all<U: Coord>(
    &mut self,
    old: &MergeLocator<U>,
    out_pd: &mut PointData,
    pt_data: &PointData,
  ) -> (RemapTable, MergeStats) {
    let old_points = old.points.as_slice();
    let rehash = T::PRECISION != U::PRECISION;
    self.merge_all_with(old, |id| convert_point(old_points[id]), rehash, out_pd, pt_data)
  }

  /// [`merge_all`](Self::merge_all) over any [`MergeSource`].
  #[cfg_attr(
    feature = "tracing",
    tracing::instrument(skip_all, name = "locator::merge_all_from_source")
  )]
  pub fn merge_all_from_source(
    &mut self,
    old: &dyn MergeSource,
    out_pd: &mut PointData,
    pt_data: &PointData,
  ) -> (RemapTable, MergeStats) {
    let rehash = T::PRECISION != Precision::Double;
    self.merge_all_with(old, |id| convert_point(old.point_f64(id)), rehash, out_pd, pt_data)
  }

  fn check_merge_preconditions<S: MergeSource + ?Sized>(
    &self,
    old: &S,
    out_pd: &PointData,
    pt_data: &PointData,
  ) {
    assert!(
      self.atomic_insertion_id.get() == self.insertion_point_id,
      "initialize_merge must be called before merging ({} points, cursor at {})",
      self.insertion_point_id,
      self.atomic_insertion_id.get()
    );
    if let Err(err) = self.grid.check_compatible(old.grid()) {
      panic!("cannot merge locators with different bucket grids: {}", err);
    }
    assert!(
      out_pd.same_layout(pt_data),
      "destination and source point data have different arrays"
    );
    assert!(
      pt_data.is_empty() || pt_data.number_of_tuples() >= old.number_of_points(),
      "source point data holds {} tuples for {} points",
      pt_data.number_of_tuples(),
      old.number_of_points()
    );
  }

  /// Grow point and attribute storage to hold `additional` more points.
  fn reserve_merge_storage(&mut self, additional: usize, out_pd: &mut PointData) {
    let needed = self.atomic_insertion_id.get() + additional;
    self.points.ensure_len(needed);
    out_pd.ensure_tuples(needed);
  }

  /// Insert points set aside by cell merges, each into the bucket its
  /// converted coordinates hash to, reusing an identical point if present.
  fn merge_strays(
    &mut self,
    strays: Strays<T>,
    out_pd: &PointData,
    pt_data: &PointData,
    id_list: &RemapTable,
  ) -> MergeCounts {
    let mut counts = MergeCounts::default();
    for (old_id, x) in strays {
      let idx = self.bucket_index(x);
      if let Some(id) = self.find_in_bucket(idx, &x) {
        id_list.set(old_id, id);
        counts.duplicates += 1;
        continue;
      }
      let range = self.atomic_insertion_id.reserve(1);
      let new_id = range.first_id();
      self.points.write_reserved(&range, new_id, x);
      out_pd.copy_tuple_reserved(&range, pt_data, old_id, new_id);
      id_list.set(old_id, new_id);
      self.bucket_mut(idx).push(new_id);
      counts.inserted += 1;
    }
    counts
  }

  fn merge_cell_with<S, F>(
    &mut self,
    idx: usize,
    old: &S,
    fetch: F,
    rehash: bool,
    out_pd: &mut PointData,
    pt_data: &PointData,
    id_list: &RemapTable,
  ) -> MergeCounts
  where
    S: MergeSource + ?Sized,
    F: Fn(PointId) -> [T; 3],
  {
    assert!(
      idx < self.buckets.len(),
      "bucket index {} out of range ({} buckets)",
      idx,
      self.buckets.len()
    );
    self.check_merge_preconditions(old, out_pd, pt_data);
    assert!(
      id_list.len() >= old.number_of_points(),
      "remap table holds {} entries for {} source points",
      id_list.len(),
      old.number_of_points()
    );

    let old_ids = match old.bucket_ids(idx) {
      Some(ids) if !ids.is_empty() => ids,
      _ => return MergeCounts::default(),
    };

    self.reserve_merge_storage(old_ids.len(), out_pd);

    let target = MergeTarget {
      points: &self.points,
      cursor: &self.atomic_insertion_id,
      out_pd,
      rehash: rehash.then_some(&self.grid),
      initial_capacity: initial_bucket_capacity(self.points_per_bucket),
      headroom: bucket_growth_headroom(self.points_per_bucket),
    };
    let mut strays = Strays::new();
    let slot = &mut self.buckets[idx];
    let counts = merge_bucket(&target, idx, slot, old_ids, fetch, pt_data, id_list, &mut strays);
    let counts = counts.combine(self.merge_strays(strays, out_pd, pt_data, id_list));

    self.insertion_point_id = self.atomic_insertion_id.get();
    counts
  }

  fn merge_all_with<S, F>(
    &mut self,
    old: &S,
    fetch: F,
    rehash: bool,
    out_pd: &mut PointData,
    pt_data: &PointData,
  ) -> (RemapTable, MergeStats)
  where
    S: MergeSource + ?Sized,
    F: Fn(PointId) -> [T; 3] + Sync,
  {
    let start = Instant::now();
    self.check_merge_preconditions(old, out_pd, pt_data);

    let id_list = RemapTable::new(old.number_of_points());
    self.reserve_merge_storage(old.number_of_points(), out_pd);

    let first_id = self.atomic_insertion_id.get();
    let initial_capacity = initial_bucket_capacity(self.points_per_bucket);
    let headroom = bucket_growth_headroom(self.points_per_bucket);
    let Self {
      grid,
      buckets,
      points,
      atomic_insertion_id,
      ..
    } = &mut *self;
    let target = MergeTarget {
      points,
      cursor: atomic_insertion_id,
      out_pd,
      rehash: rehash.then_some(&*grid),
      initial_capacity,
      headroom,
    };

    let (counts, buckets_merged, strays) = buckets
      .par_iter_mut()
      .enumerate()
      .with_min_len(MIN_BUCKETS_PER_TASK)
      .map(|(idx, slot)| {
        let mut strays = Strays::new();
        match old.bucket_ids(idx) {
          Some(old_ids) if !old_ids.is_empty() => {
            let counts =
              merge_bucket(&target, idx, slot, old_ids, &fetch, pt_data, &id_list, &mut strays);
            (counts, 1usize, strays)
          }
          _ => (MergeCounts::default(), 0, strays),
        }
      })
      .reduce(
        || (MergeCounts::default(), 0, Strays::new()),
        |mut a, mut b| {
          a.2.append(&mut b.2);
          (a.0.combine(b.0), a.1 + b.1, a.2)
        },
      );

    #[cfg(feature = "tracing")]
    let stray_count = strays.len();
    let counts = counts.combine(self.merge_strays(strays, out_pd, pt_data, &id_list));

    self.insertion_point_id = self.atomic_insertion_id.get();
    debug_assert_eq!(self.insertion_point_id, first_id + counts.inserted);

    let stats = MergeStats {
      buckets_merged,
      points_inserted: counts.inserted,
      duplicates: counts.duplicates,
      timing_us: start.elapsed().as_micros() as u64,
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
      buckets = stats.buckets_merged,
      inserted = stats.points_inserted,
      duplicates = stats.duplicates,
      strays = stray_count,
      first_id,
      timing_us = stats.timing_us,
      "merged locator"
    );

    (id_list, stats)
  }
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod merge_test;
