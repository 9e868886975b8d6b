//! Fixtures shared by unit tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::assembly::MeshPiece;
use crate::cells::CellArray;
use crate::config::LocatorConfig;
use crate::grid::BucketGrid;
use crate::locator::MergeLocator;
use crate::point_data::{AttributeArray, PointData};
use crate::types::{Bounds, Coord};

// =============================================================================
// Grids and locators
// =============================================================================

/// Unit cube split into 4x4x4 buckets.
pub fn unit_grid() -> BucketGrid {
  BucketGrid::new(unit_bounds(), 0, &LocatorConfig::new().with_divisions([4; 3]))
    .expect("unit grid is valid")
}

pub fn unit_bounds() -> Bounds {
  Bounds::new([0.0; 3], [1.0; 3])
}

/// Empty locator over [`unit_grid`].
pub fn unit_locator<T: Coord>() -> MergeLocator<T> {
  MergeLocator::from_grid(unit_grid(), &LocatorConfig::default(), 0)
}

/// Locator over `grid` populated with `points` via unique insertion.
pub fn locator_with<T: Coord>(grid: &BucketGrid, points: &[[T; 3]]) -> MergeLocator<T> {
  let mut locator = MergeLocator::from_grid(grid.clone(), &LocatorConfig::default(), points.len());
  for &p in points {
    locator.insert_unique_point(p);
  }
  locator
}

// =============================================================================
// Random points
// =============================================================================

/// `count` points uniformly inside the unit cube.
pub fn random_points(seed: u64, count: usize) -> Vec<[f64; 3]> {
  let mut rng = StdRng::seed_from_u64(seed);
  (0..count)
    .map(|_| [rng.random(), rng.random(), rng.random()])
    .collect()
}

/// Points snapped to a lattice of `steps` per axis, so independent draws
/// collide often.
pub fn lattice_points(seed: u64, count: usize, steps: u32) -> Vec<[f64; 3]> {
  let mut rng = StdRng::seed_from_u64(seed);
  let mut coord = || rng.random_range(0..=steps) as f64 / steps as f64;
  (0..count).map(|_| [coord(), coord(), coord()]).collect()
}

// =============================================================================
// Attributes and pieces
// =============================================================================

/// Point data whose single scalar array stores each point's x + 10y + 100z,
/// so a tuple can be checked against its coordinates after a merge.
pub fn coordinate_scalars(points: &[[f64; 3]]) -> PointData {
  let values = points.iter().map(|p| scalar_of(*p)).collect();
  PointData::new().with_array(AttributeArray::from_values("tag", 1, values))
}

pub fn scalar_of(p: [f64; 3]) -> f64 {
  p[0] + 10.0 * p[1] + 100.0 * p[2]
}

/// Piece of triangles over consecutive point triples.
pub fn triangle_piece(points: Vec<[f64; 3]>) -> MeshPiece<f64> {
  let cells = CellArray::from_cells(
    (0..points.len() / 3).map(|t| [3 * t, 3 * t + 1, 3 * t + 2]),
  );
  let point_data = coordinate_scalars(&points);
  MeshPiece::new(points, point_data, cells)
}
