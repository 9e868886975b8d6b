//! Polygonal cell topology referencing points by ID.
//!
//! Stored as a flat connectivity list plus offsets, so cell `i` spans
//! `connectivity[offsets[i]..offsets[i + 1]]`.

use crate::remap::RemapTable;
use crate::types::PointId;

/// Variable-size cells (vertices, lines, polygons) over a shared point array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellArray {
  offsets: Vec<usize>,
  connectivity: Vec<PointId>,
}

impl Default for CellArray {
  fn default() -> Self {
    Self::new()
  }
}

impl CellArray {
  pub fn new() -> Self {
    Self {
      offsets: vec![0],
      connectivity: Vec::new(),
    }
  }

  /// Build from a list of cells.
  pub fn from_cells<I, C>(cells: I) -> Self
  where
    I: IntoIterator<Item = C>,
    C: AsRef<[PointId]>,
  {
    let mut array = Self::new();
    for cell in cells {
      array.push_cell(cell.as_ref());
    }
    array
  }

  /// Append a cell, returning its index.
  pub fn push_cell(&mut self, ids: &[PointId]) -> usize {
    self.connectivity.extend_from_slice(ids);
    self.offsets.push(self.connectivity.len());
    self.offsets.len() - 2
  }

  pub fn number_of_cells(&self) -> usize {
    self.offsets.len() - 1
  }

  pub fn is_empty(&self) -> bool {
    self.number_of_cells() == 0
  }

  /// Point IDs of cell `i`.
  #[inline]
  pub fn cell(&self, i: usize) -> &[PointId] {
    &self.connectivity[self.offsets[i]..self.offsets[i + 1]]
  }

  pub fn iter(&self) -> impl Iterator<Item = &[PointId]> + '_ {
    self
      .offsets
      .windows(2)
      .map(move |w| &self.connectivity[w[0]..w[1]])
  }

  /// Every point reference, cell after cell.
  pub fn connectivity(&self) -> &[PointId] {
    &self.connectivity
  }

  /// Largest referenced point ID.
  pub fn max_point_id(&self) -> Option<PointId> {
    self.connectivity.iter().copied().max()
  }

  /// Rewrite every point reference through `remap`.
  pub fn remap(&mut self, remap: &RemapTable) {
    remap.remap_ids(&mut self.connectivity);
  }

  /// Append all cells of `other`.
  pub fn append(&mut self, other: &CellArray) {
    let base = self.connectivity.len();
    self.connectivity.extend_from_slice(&other.connectivity);
    self
      .offsets
      .extend(other.offsets[1..].iter().map(|&o| base + o));
  }
}
