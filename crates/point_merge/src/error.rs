//! Error types for locator construction and mesh assembly.
//!
//! Only the construction and assembly boundaries return errors. Structural
//! violations inside a merge (bad bucket index, undersized remap table) are
//! bugs in the caller and panic instead.

use thiserror::Error;

use crate::types::Bounds;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocatorError {
  /// Bounds with NaN/infinite extents or min > max.
  #[error("invalid bounds: {0:?}")]
  InvalidBounds(Bounds),

  /// A configuration value that cannot produce a usable grid.
  #[error("invalid locator config: {0}")]
  InvalidConfig(&'static str),

  /// Two locators that do not share the same bucket grid.
  #[error("bucket grids differ: {left} buckets vs {right} buckets")]
  GridMismatch { left: usize, right: usize },

  /// Attribute arrays whose names or component counts disagree.
  #[error("attribute layout mismatch in piece {piece}")]
  AttributeLayoutMismatch { piece: usize },

  /// A piece whose attribute tuple count differs from its point count.
  #[error("piece {piece} has {points} points but {tuples} attribute tuples")]
  AttributeCountMismatch {
    piece: usize,
    points: usize,
    tuples: usize,
  },

  /// A cell referencing a point the piece does not have.
  #[error("piece {piece} references point {point_id} but has {points} points")]
  DanglingPointId {
    piece: usize,
    point_id: usize,
    points: usize,
  },
}
