//! point_merge - Parallel exact-match point merging
//!
//! Workers that each produce a piece of a mesh hash their points into a
//! [`MergeLocator`] over a shared [`BucketGrid`]. The locators are then folded
//! into one: per bucket, points already present are matched by exact
//! coordinate equality and the rest are appended with IDs reserved from a
//! single atomic cursor, so buckets merge in parallel without locks.
//!
//! # Features
//!
//! - **Exact duplicate suppression**: bit-for-bit coordinate equality, no
//!   tolerance
//! - **Lock-free cell merges**: one `fetch_add` per merged cell reserves a
//!   contiguous ID block
//! - **Attribute transfer**: per-point attribute tuples follow their points
//!   into the merged arrays
//! - **Remap tables**: source-to-merged ID maps for rewriting cell topology
//! - **f32 / f64 storage**: monomorphized fast path per coordinate type, with
//!   a generic `f64` path for any [`MergeSource`]
//!
//! # Example
//!
//! ```ignore
//! use point_merge::{merge_pieces, LocatorConfig, MeshPiece};
//!
//! let pieces: Vec<MeshPiece<f32>> = produce_pieces_in_parallel();
//! let merged = merge_pieces(&pieces, &LocatorConfig::default())?;
//!
//! println!("{} points after merging, {} duplicates removed",
//!     merged.number_of_points(), merged.stats.duplicates);
//! ```

pub mod constants;
pub mod error;
pub mod types;

pub use constants::{
  ijk_to_index, index_to_ijk, DEFAULT_DIVISIONS, DEFAULT_MAX_BUCKETS, DEFAULT_POINTS_PER_BUCKET,
};
pub use error::LocatorError;
pub use types::{Bounds, Coord, PointId, Precision, UNMAPPED};

// Grid sizing
pub mod config;
pub mod grid;
pub use config::LocatorConfig;
pub use grid::BucketGrid;

// Storage
pub mod bucket;
pub mod point_data;
pub mod remap;
mod slots;
pub use bucket::Bucket;
pub use point_data::{AttributeArray, PointData};
pub use remap::RemapTable;

// Locator population and merging
pub mod locator;
pub use locator::{MergeCounts, MergeLocator, MergeSource};

// Mesh assembly on top of the locator
pub mod assembly;
pub mod cells;
pub use assembly::{merge_pieces, MergedMesh, MeshPiece, PieceLocator};
pub use cells::CellArray;

pub mod metrics;
pub use metrics::MergeStats;

#[cfg(test)]
mod test_utils;
