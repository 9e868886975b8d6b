//! Merge locator: bucketed spatial hash with exact-match point insertion.
//!
//! # Lifecycle
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │ new(bounds)  ├────►│ insert_*_point   ├────►│ initialize_merge ├────►│ merge / merge_all│──┐
//! └──────────────┘     └──────────────────┘     └──────────────────┘     └──────────────────┘  │
//!                        one locator per            capture cursor          per cell, may run    │
//!                        worker, no sharing                                 in parallel          │
//!                                                                                                │
//!                                               ┌─────────────────────────┐                      │
//!                                               │ finish_merge            │◄─────────────────────┘
//!                                               └─────────────────────────┘
//!                                                 fix_size_of_point_array
//!                                                 + truncate point data
//! ```
//!
//! All locators taking part in a merge must be built over the same
//! [`BucketGrid`] so that a bucket index names the same cell in each.

mod merge;

pub use merge::{MergeCounts, MergeSource};

use crate::bucket::Bucket;
use crate::config::LocatorConfig;
use crate::constants::initial_bucket_capacity;
use crate::error::LocatorError;
use crate::grid::BucketGrid;
use crate::point_data::PointData;
use crate::slots::{InsertionCursor, SlotVec};
use crate::types::{point_to_f64, same_point, Bounds, Coord, PointId, Precision};

/// Spatial hash over a bounding volume that stores each point once.
///
/// Generic over the coordinate storage type (`f32` or `f64`).
#[derive(Clone, Debug)]
pub struct MergeLocator<T: Coord> {
  grid: BucketGrid,
  points_per_bucket: usize,
  buckets: Vec<Option<Bucket>>,
  points: SlotVec<[T; 3]>,
  /// Next ID handed out during population.
  insertion_point_id: PointId,
  /// Next ID handed out during merging.
  atomic_insertion_id: InsertionCursor,
}

impl<T: Coord> MergeLocator<T> {
  /// Create an empty locator covering `bounds`, sized for about
  /// `estimated_points` points.
  pub fn new(
    bounds: Bounds,
    estimated_points: usize,
    config: &LocatorConfig,
  ) -> Result<Self, LocatorError> {
    let grid = BucketGrid::new(bounds, estimated_points, config)?;
    Ok(Self::from_grid(grid, config, estimated_points))
  }

  /// Create an empty locator over an existing grid.
  ///
  /// Use this to give every worker a locator with identical bucket indexing.
  pub fn from_grid(grid: BucketGrid, config: &LocatorConfig, estimated_points: usize) -> Self {
    Self {
      buckets: vec![None; grid.number_of_buckets()],
      grid,
      points_per_bucket: config.points_per_bucket,
      points: SlotVec::with_capacity(estimated_points),
      insertion_point_id: 0,
      atomic_insertion_id: InsertionCursor::default(),
    }
  }

  // ===========================================================================
  // Accessors
  // ===========================================================================

  pub fn grid(&self) -> &BucketGrid {
    &self.grid
  }

  pub fn precision(&self) -> Precision {
    T::PRECISION
  }

  pub fn points_per_bucket(&self) -> usize {
    self.points_per_bucket
  }

  /// Number of points currently stored.
  pub fn number_of_points(&self) -> usize {
    self.insertion_point_id
  }

  /// Stored points, indexed by ID.
  pub fn points(&self) -> &[[T; 3]] {
    &self.points.as_slice()[..self.insertion_point_id]
  }

  #[inline]
  pub fn point(&self, id: PointId) -> [T; 3] {
    assert!(id < self.insertion_point_id, "point {} not inserted", id);
    self.points.get(id)
  }

  pub fn number_of_buckets(&self) -> usize {
    self.buckets.len()
  }

  /// IDs in a bucket, or `None` if nothing was ever hashed there.
  pub fn bucket_ids(&self, idx: usize) -> Option<&[PointId]> {
    self.buckets[idx].as_ref().map(Bucket::ids)
  }

  pub fn number_of_ids_in_bucket(&self, idx: usize) -> usize {
    self.buckets[idx].as_ref().map_or(0, Bucket::len)
  }

  /// Number of buckets that hold at least one point.
  pub fn number_of_occupied_buckets(&self) -> usize {
    self
      .buckets
      .iter()
      .filter(|b| b.as_ref().is_some_and(|b| !b.is_empty()))
      .count()
  }

  /// Bucket a coordinate hashes to.
  #[inline]
  pub fn bucket_index(&self, x: [T; 3]) -> usize {
    self.grid.bucket_index(point_to_f64(x))
  }

  /// Current value of the merge cursor.
  pub fn insertion_id(&self) -> PointId {
    self.atomic_insertion_id.get()
  }

  // ===========================================================================
  // Population
  // ===========================================================================

  /// Store `x` under an explicit ID and hash it.
  ///
  /// Storage grows as needed; the insertion cursor moves past `id`.
  pub fn insert_point(&mut self, id: PointId, x: [T; 3]) {
    self.points.ensure_len(id + 1);
    self.points.set(id, x);
    self.insertion_point_id = self.insertion_point_id.max(id + 1);
    let idx = self.bucket_index(x);
    self.bucket_mut(idx).push(id);
  }

  /// Append `x` without checking for duplicates.
  pub fn insert_next_point(&mut self, x: [T; 3]) -> PointId {
    let id = self.insertion_point_id;
    if id < self.points.len() {
      self.points.set(id, x);
    } else {
      self.points.push(x);
    }
    self.insertion_point_id += 1;
    let idx = self.bucket_index(x);
    self.bucket_mut(idx).push(id);
    id
  }

  /// ID of a stored point with exactly these coordinates.
  pub fn is_inserted_point(&self, x: [T; 3]) -> Option<PointId> {
    let idx = self.bucket_index(x);
    self.find_in_bucket(idx, &x)
  }

  /// Insert `x` unless an identical point exists.
  ///
  /// Returns the point's ID and whether it was newly inserted.
  pub fn insert_unique_point(&mut self, x: [T; 3]) -> (PointId, bool) {
    let idx = self.bucket_index(x);
    if let Some(id) = self.find_in_bucket(idx, &x) {
      return (id, false);
    }
    let id = self.insertion_point_id;
    if id < self.points.len() {
      self.points.set(id, x);
    } else {
      self.points.push(x);
    }
    self.insertion_point_id += 1;
    self.bucket_mut(idx).push(id);
    (id, true)
  }

  fn find_in_bucket(&self, idx: usize, x: &[T; 3]) -> Option<PointId> {
    self.buckets[idx]
      .as_ref()?
      .ids()
      .iter()
      .copied()
      .find(|&id| same_point(&self.points.get(id), x))
  }

  fn bucket_mut(&mut self, idx: usize) -> &mut Bucket {
    let capacity = initial_bucket_capacity(self.points_per_bucket);
    self.buckets[idx].get_or_insert_with(|| Bucket::with_capacity(capacity))
  }

  // ===========================================================================
  // Merge bookkeeping
  // ===========================================================================

  /// Capture the population cursor as the starting ID for merging.
  ///
  /// Buckets are left untouched.
  pub fn initialize_merge(&mut self) {
    self.atomic_insertion_id.set(self.insertion_point_id);
  }

  /// Shrink point storage to exactly the merged point count.
  ///
  /// Attribute arrays grown by merges are left as they are; use
  /// [`finish_merge`](Self::finish_merge) to trim them as well.
  pub fn fix_size_of_point_array(&mut self) {
    let count = self.atomic_insertion_id.get();
    assert!(
      count >= self.insertion_point_id,
      "initialize_merge must precede fix_size_of_point_array ({} points, cursor at {})",
      self.insertion_point_id,
      count
    );
    self.points.truncate(count);
    self.insertion_point_id = count;
  }

  /// Finalize a merge: shrink point storage and drop the spare tuples
  /// merges reserved in `out_pd`.
  pub fn finish_merge(&mut self, out_pd: &mut PointData) {
    self.fix_size_of_point_array();
    out_pd.truncate(self.insertion_point_id);
  }

  /// Length of the backing storage, including slots reserved for merges.
  pub fn storage_len(&self) -> usize {
    self.points.len()
  }
}
