//! Merging independently produced mesh pieces into one mesh.
//!
//! Each piece (typically the output of one worker) gets its own locator over
//! a shared grid, built in parallel with exact unique insertion. The piece
//! locators are then folded into one accumulating locator, cells merged in
//! parallel, and each piece's connectivity is rewritten to the merged IDs.
//!
//! ```text
//!   piece 0 ─► locator 0 ─┐
//!   piece 1 ─► locator 1 ─┼─► initialize_merge + merge_all (per piece) ─► finish_merge ─► MergedMesh
//!   piece 2 ─► locator 2 ─┘
//!      (rayon par_iter)         piece ID ─► locator ID ─► merged ID
//! ```

use rayon::prelude::*;

use crate::cells::CellArray;
use crate::config::LocatorConfig;
use crate::error::LocatorError;
use crate::grid::BucketGrid;
use crate::locator::MergeLocator;
use crate::metrics::MergeStats;
use crate::point_data::PointData;
use crate::remap::RemapTable;
use crate::types::{Bounds, Coord, PointId};

/// One independently produced chunk of a mesh.
#[derive(Clone, Debug, Default)]
pub struct MeshPiece<T: Coord> {
  pub points: Vec<[T; 3]>,
  /// Attributes aligned with `points` (may hold no arrays).
  pub point_data: PointData,
  pub cells: CellArray,
}

impl<T: Coord> MeshPiece<T> {
  pub fn new(points: Vec<[T; 3]>, point_data: PointData, cells: CellArray) -> Self {
    Self {
      points,
      point_data,
      cells,
    }
  }

  pub fn number_of_points(&self) -> usize {
    self.points.len()
  }
}

/// A piece hashed into its own locator.
#[derive(Clone, Debug)]
pub struct PieceLocator<T: Coord> {
  pub locator: MergeLocator<T>,
  /// Attributes aligned with the locator's point IDs.
  pub point_data: PointData,
  /// Piece point index to locator point ID.
  pub local_ids: Vec<PointId>,
}

/// Result of [`merge_pieces`].
#[derive(Clone, Debug)]
pub struct MergedMesh<T: Coord> {
  pub points: Vec<[T; 3]>,
  pub point_data: PointData,
  pub cells: CellArray,
  /// Totals over every piece merge.
  pub stats: MergeStats,
}

impl<T: Coord> MergedMesh<T> {
  pub fn number_of_points(&self) -> usize {
    self.points.len()
  }
}

/// Bounds covering every piece.
///
/// Falls back to the unit cube when there are no (non-NaN) points.
pub fn combined_bounds<T: Coord>(pieces: &[MeshPiece<T>]) -> Bounds {
  let bounds = pieces
    .iter()
    .map(|p| Bounds::from_points(&p.points))
    .fold(Bounds::empty(), |acc, b| acc.union(&b));
  if bounds == Bounds::empty() {
    Bounds::new([0.0; 3], [1.0; 3])
  } else {
    bounds
  }
}

/// Check that pieces can be merged: shared attribute layout, one tuple per
/// point, and no cell referencing a missing point.
pub fn validate_pieces<T: Coord>(pieces: &[MeshPiece<T>]) -> Result<(), LocatorError> {
  let Some(first) = pieces.first() else {
    return Ok(());
  };
  for (piece, p) in pieces.iter().enumerate() {
    if !p.point_data.same_layout(&first.point_data) {
      return Err(LocatorError::AttributeLayoutMismatch { piece });
    }
    for array in p.point_data.arrays() {
      if array.number_of_tuples() != p.points.len() {
        return Err(LocatorError::AttributeCountMismatch {
          piece,
          points: p.points.len(),
          tuples: array.number_of_tuples(),
        });
      }
    }
    if let Some(point_id) = p.cells.max_point_id() {
      if point_id >= p.points.len() {
        return Err(LocatorError::DanglingPointId {
          piece,
          point_id,
          points: p.points.len(),
        });
      }
    }
  }
  Ok(())
}

/// Hash one piece into a fresh locator over `grid`.
fn build_piece_locator<T: Coord>(
  piece: &MeshPiece<T>,
  grid: &BucketGrid,
  config: &LocatorConfig,
) -> PieceLocator<T> {
  let mut locator = MergeLocator::from_grid(grid.clone(), config, piece.points.len());
  let mut point_data = piece.point_data.copy_structure();
  let local_ids = piece
    .points
    .iter()
    .enumerate()
    .map(|(i, &x)| {
      let (id, inserted) = locator.insert_unique_point(x);
      if inserted {
        point_data.push_tuple_from(&piece.point_data, i);
      }
      id
    })
    .collect();
  PieceLocator {
    locator,
    point_data,
    local_ids,
  }
}

/// Build a locator per piece in parallel, all over one grid spanning the
/// combined bounds.
pub fn build_piece_locators<T: Coord>(
  pieces: &[MeshPiece<T>],
  config: &LocatorConfig,
) -> Result<Vec<PieceLocator<T>>, LocatorError> {
  let total = pieces.iter().map(MeshPiece::number_of_points).sum();
  let grid = BucketGrid::new(combined_bounds(pieces), total, config)?;
  Ok(build_on_grid(pieces, &grid, config))
}

fn build_on_grid<T: Coord>(
  pieces: &[MeshPiece<T>],
  grid: &BucketGrid,
  config: &LocatorConfig,
) -> Vec<PieceLocator<T>> {
  pieces
    .par_iter()
    .map(|piece| build_piece_locator(piece, grid, config))
    .collect()
}

/// Merge pieces into a single mesh with coincident points stored once.
///
/// Points introduced by an earlier piece always get lower IDs than points
/// first seen in a later piece. Within one piece, IDs follow parallel
/// scheduling and are not deterministic. Cells keep their piece order.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "assembly::merge_pieces"))]
pub fn merge_pieces<T: Coord>(
  pieces: &[MeshPiece<T>],
  config: &LocatorConfig,
) -> Result<MergedMesh<T>, LocatorError> {
  validate_pieces(pieces)?;

  let total = pieces.iter().map(MeshPiece::number_of_points).sum();
  let grid = BucketGrid::new(combined_bounds(pieces), total, config)?;

  let piece_locators = {
    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("build_piece_locators").entered();
    build_on_grid(pieces, &grid, config)
  };

  let mut target = MergeLocator::<T>::from_grid(grid, config, total);
  let mut point_data = pieces
    .first()
    .map(|p| p.point_data.copy_structure())
    .unwrap_or_default();
  let mut cells = CellArray::new();
  let mut stats = MergeStats::default();

  {
    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("fold_piece_locators").entered();

    for (piece, local) in pieces.iter().zip(&piece_locators) {
      target.initialize_merge();
      let (remap, piece_stats) =
        target.merge_all(&local.locator, &mut point_data, &local.point_data);
      stats.accumulate(&piece_stats);

      // piece ID -> locator ID -> merged ID
      let composed = RemapTable::new(piece.points.len());
      for (i, &local_id) in local.local_ids.iter().enumerate() {
        if let Some(merged_id) = remap.get(local_id) {
          composed.set(i, merged_id);
        }
      }
      let mut piece_cells = piece.cells.clone();
      piece_cells.remap(&composed);
      cells.append(&piece_cells);
    }
  }

  target.finish_merge(&mut point_data);

  #[cfg(feature = "tracing")]
  tracing::info!(
    pieces = pieces.len(),
    input_points = total,
    merged_points = target.number_of_points(),
    duplicates = stats.duplicates,
    cells = cells.number_of_cells(),
    "merged mesh pieces"
  );

  Ok(MergedMesh {
    points: target.points().to_vec(),
    point_data,
    cells,
    stats,
  })
}

#[cfg(test)]
#[path = "assembly_test.rs"]
mod assembly_test;
