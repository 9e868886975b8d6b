//! Bucket grid and storage constants.
//!
//! # Bucket Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         BUCKET GRID LAYOUT                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   bounds.min                                                            │
//! │      ┌─────┬─────┬─────┬─────┐   Each cell is h[0] × h[1] × h[2]        │
//! │      │  0  │  1  │  2  │  3  │   where h[i] = extent[i] / div[i]        │
//! │      ├─────┼─────┼─────┼─────┤                                          │
//! │      │  4  │  5  │  6  │  7  │   Points outside the bounds clamp to     │
//! │      ├─────┼─────┼─────┼─────┤   the nearest border cell.               │
//! │      │  8  │  9  │ 10  │ 11  │                                          │
//! │      └─────┴─────┴─────┴─────┘                                          │
//! │                          bounds.max                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Linear Indexing
//!
//! ```text
//! index = i + j * div[0] + k * div[0] * div[1]
//!
//! X is the minor axis (stride 1), Z is the major axis.
//! ```

/// Default target occupancy of a bucket in automatic mode.
pub const DEFAULT_POINTS_PER_BUCKET: usize = 3;

/// Default per-axis divisions in manual mode.
pub const DEFAULT_DIVISIONS: [usize; 3] = [50, 50, 50];

/// Default upper bound on the total number of buckets.
pub const DEFAULT_MAX_BUCKETS: usize = i32::MAX as usize;

/// Extent given to an axis whose bounds collapse to a plane or line.
pub const DEGENERATE_AXIS_EXTENT: f64 = 1.0;

/// Inline capacity of a bucket before it spills to the heap.
pub const BUCKET_INLINE_CAPACITY: usize = 4;

/// Convert per-axis cell coordinates to a linear bucket index.
#[inline(always)]
pub const fn ijk_to_index(ijk: [usize; 3], divisions: [usize; 3]) -> usize {
  ijk[0] + ijk[1] * divisions[0] + ijk[2] * divisions[0] * divisions[1]
}

/// Convert a linear bucket index back to per-axis cell coordinates.
#[inline(always)]
pub const fn index_to_ijk(idx: usize, divisions: [usize; 3]) -> [usize; 3] {
  let slice = divisions[0] * divisions[1];
  let k = idx / slice;
  let rem = idx % slice;
  [rem % divisions[0], rem / divisions[0], k]
}

/// Extra slots reserved when a bucket grows during a merge batch.
///
/// Scales with the typical bucket size so heavy insertion into one cell
/// does not reallocate per point.
#[inline(always)]
pub const fn bucket_growth_headroom(points_per_bucket: usize) -> usize {
  points_per_bucket / 3 + 1
}

/// Initial capacity of a bucket created during insertion or merge.
#[inline(always)]
pub const fn initial_bucket_capacity(points_per_bucket: usize) -> usize {
  let half = points_per_bucket / 2;
  if half == 0 {
    1
  } else {
    half
  }
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
