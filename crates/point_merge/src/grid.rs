//! Uniform bucket grid over a bounding volume.
//!
//! Maps a coordinate to the linear index of the spatial cell ("bucket") that
//! contains it. The grid is fixed once built: every locator taking part in a
//! merge must be built over the same grid so bucket indices line up.

use glam::DVec3;

use crate::config::LocatorConfig;
use crate::constants::{ijk_to_index, index_to_ijk, DEGENERATE_AXIS_EXTENT};
use crate::error::LocatorError;
use crate::types::Bounds;

/// Bucket grid geometry: bounds, divisions and cell spacing.
#[derive(Clone, Debug, PartialEq)]
pub struct BucketGrid {
  bounds: Bounds,
  divisions: [usize; 3],
  spacing: DVec3,
  inv_spacing: DVec3,
}

impl BucketGrid {
  /// Build a grid covering `bounds`, sized for roughly `estimated_points`.
  ///
  /// Axes with zero extent are widened by [`DEGENERATE_AXIS_EXTENT`]. In
  /// automatic mode every axis gets `ceil(cbrt(estimated / points_per_bucket))`
  /// divisions; with no estimate the configured divisions are used.
  pub fn new(
    bounds: Bounds,
    estimated_points: usize,
    config: &LocatorConfig,
  ) -> Result<Self, LocatorError> {
    config.validate()?;
    if !bounds.is_valid() {
      return Err(LocatorError::InvalidBounds(bounds));
    }

    let mut bounds = bounds;
    for axis in 0..3 {
      if bounds.max[axis] <= bounds.min[axis] {
        bounds.max[axis] = bounds.min[axis] + DEGENERATE_AXIS_EXTENT;
      }
    }

    let mut divisions = if config.automatic && estimated_points > 0 {
      let per_axis = (estimated_points as f64 / config.points_per_bucket as f64)
        .cbrt()
        .ceil() as usize;
      [per_axis; 3]
    } else {
      config.divisions
    };
    for d in &mut divisions {
      *d = (*d).max(1);
    }
    let divisions = cap_divisions(divisions, config.max_buckets);

    let spacing = bounds.size() / DVec3::from_array(divisions.map(|d| d as f64));

    Ok(Self {
      bounds,
      divisions,
      spacing,
      inv_spacing: spacing.recip(),
    })
  }

  /// Grid bounds (after widening degenerate axes).
  pub fn bounds(&self) -> &Bounds {
    &self.bounds
  }

  pub fn divisions(&self) -> [usize; 3] {
    self.divisions
  }

  /// Cell size along each axis.
  pub fn spacing(&self) -> DVec3 {
    self.spacing
  }

  /// Total number of buckets.
  pub fn number_of_buckets(&self) -> usize {
    self.divisions[0] * self.divisions[1] * self.divisions[2]
  }

  /// Per-axis cell coordinates of a point, clamped into the grid.
  ///
  /// Points outside the bounds land in the nearest border cell. NaN
  /// components map to cell 0 on that axis.
  #[inline]
  pub fn bucket_indices(&self, x: [f64; 3]) -> [usize; 3] {
    let rel = (DVec3::from_array(x) - self.bounds.min) * self.inv_spacing;
    let rel = rel.to_array();
    std::array::from_fn(|axis| {
      let cell = rel[axis] as i64;
      cell.clamp(0, self.divisions[axis] as i64 - 1) as usize
    })
  }

  /// Linear bucket index of a point.
  #[inline]
  pub fn bucket_index(&self, x: [f64; 3]) -> usize {
    ijk_to_index(self.bucket_indices(x), self.divisions)
  }

  /// Check that `other` indexes buckets identically.
  pub fn check_compatible(&self, other: &BucketGrid) -> Result<(), LocatorError> {
    if self == other {
      Ok(())
    } else {
      Err(LocatorError::GridMismatch {
        left: self.number_of_buckets(),
        right: other.number_of_buckets(),
      })
    }
  }

  /// Bounds of the cell behind a bucket index.
  pub fn bucket_bounds(&self, idx: usize) -> Bounds {
    assert!(
      idx < self.number_of_buckets(),
      "bucket index {} out of range ({} buckets)",
      idx,
      self.number_of_buckets()
    );
    let [i, j, k] = index_to_ijk(idx, self.divisions);
    let min = self.bounds.min + DVec3::new(i as f64, j as f64, k as f64) * self.spacing;
    Bounds {
      min,
      max: min + self.spacing,
    }
  }
}

/// Shrink divisions uniformly until the bucket count fits `max_buckets`.
fn cap_divisions(mut divisions: [usize; 3], max_buckets: usize) -> [usize; 3] {
  let total = |d: [usize; 3]| d[0].saturating_mul(d[1]).saturating_mul(d[2]);

  while total(divisions) > max_buckets {
    let scale = (max_buckets as f64 / total(divisions) as f64).cbrt();
    let shrunk = divisions.map(|d| ((d as f64 * scale).floor() as usize).max(1));
    if shrunk == divisions {
      // Rounding stalled: peel one division off the largest axis.
      let axis = (0..3).max_by_key(|&a| divisions[a]).unwrap_or(0);
      divisions[axis] -= 1;
    } else {
      divisions = shrunk;
    }
  }
  divisions
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;
