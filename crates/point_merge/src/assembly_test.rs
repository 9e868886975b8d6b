use super::*;
use crate::point_data::AttributeArray;
use crate::test_utils::{lattice_points, scalar_of, triangle_piece};

/// Two unit squares sharing the edge x = 1, split into triangles per piece.
fn shared_edge_pieces() -> Vec<MeshPiece<f64>> {
  let left = triangle_piece(vec![
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
  ]);
  let right = triangle_piece(vec![
    [1.0, 0.0, 0.0],
    [2.0, 0.0, 0.0],
    [2.0, 1.0, 0.0],
    [1.0, 0.0, 0.0],
    [2.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
  ]);
  vec![left, right]
}

// =========================================================================
// Validation
// =========================================================================

#[test]
fn test_validate_layout_mismatch() {
  let mut pieces = shared_edge_pieces();
  pieces[1].point_data = PointData::new().with_array(AttributeArray::from_values(
    "other",
    1,
    vec![0.0; 6],
  ));
  assert_eq!(
    validate_pieces(&pieces),
    Err(LocatorError::AttributeLayoutMismatch { piece: 1 })
  );
}

#[test]
fn test_validate_tuple_count_mismatch() {
  let mut pieces = shared_edge_pieces();
  pieces[0].points.push([5.0, 5.0, 5.0]);
  assert_eq!(
    validate_pieces(&pieces),
    Err(LocatorError::AttributeCountMismatch {
      piece: 0,
      points: 7,
      tuples: 6
    })
  );
}

#[test]
fn test_validate_dangling_point_id() {
  let mut pieces = shared_edge_pieces();
  pieces[1].cells.push_cell(&[0, 9]);
  let err = merge_pieces(&pieces, &LocatorConfig::default()).unwrap_err();
  assert_eq!(
    err,
    LocatorError::DanglingPointId {
      piece: 1,
      point_id: 9,
      points: 6
    }
  );
}

#[test]
fn test_combined_bounds() {
  let bounds = combined_bounds(&shared_edge_pieces());
  assert_eq!(bounds, Bounds::new([0.0; 3], [2.0, 1.0, 0.0]));

  let empty: Vec<MeshPiece<f32>> = vec![MeshPiece::default()];
  assert_eq!(combined_bounds(&empty), Bounds::new([0.0; 3], [1.0; 3]));
}

// =========================================================================
// Piece locators
// =========================================================================

#[test]
fn test_build_piece_locators_dedups_within_piece() {
  let pieces = shared_edge_pieces();
  let locators = build_piece_locators(&pieces, &LocatorConfig::default()).unwrap();

  assert_eq!(locators.len(), 2);
  let left = &locators[0];
  assert_eq!(left.locator.number_of_points(), 4);
  assert_eq!(left.local_ids, vec![0, 1, 2, 0, 2, 3]);
  assert_eq!(left.point_data.number_of_tuples(), 4);
  assert_eq!(left.locator.grid(), locators[1].locator.grid());
}

// =========================================================================
// Merging
// =========================================================================

#[test]
fn test_merge_shared_edge() {
  let pieces = shared_edge_pieces();
  let merged = merge_pieces(&pieces, &LocatorConfig::default()).unwrap();

  // 4 + 4 corners, 2 shared.
  assert_eq!(merged.number_of_points(), 6);
  assert_eq!(merged.stats.duplicates, 2);
  assert_eq!(merged.point_data.number_of_tuples(), 6);
  assert_eq!(merged.cells.number_of_cells(), 4);

  // Cells still reference the same coordinates.
  for (piece_cells, offset) in [(&pieces[0].cells, 0), (&pieces[1].cells, 2)] {
    for (c, cell) in piece_cells.iter().enumerate() {
      let merged_cell = merged.cells.cell(offset + c);
      for (&src, &dst) in cell.iter().zip(merged_cell) {
        let piece = &pieces[offset / 2];
        assert_eq!(merged.points[dst], piece.points[src]);
      }
    }
  }

  // The shared edge is referenced by both pieces with the same IDs.
  let left_edge = merged.cells.cell(0)[1];
  let right_edge = merged.cells.cell(2)[0];
  assert_eq!(left_edge, right_edge);
}

#[test]
fn test_earlier_pieces_get_lower_ids() {
  let pieces = shared_edge_pieces();
  let merged = merge_pieces(&pieces, &LocatorConfig::default()).unwrap();

  // The left piece introduces 4 points; the right adds only its x = 2 side.
  for c in 0..2 {
    assert!(merged.cells.cell(c).iter().all(|&id| id < 4));
  }
  for (id, p) in merged.points.iter().enumerate() {
    assert_eq!(p[0] == 2.0, id >= 4, "point {} at {:?}", id, p);
  }
}

#[test]
fn test_merge_keeps_attributes_aligned() {
  let pieces: Vec<MeshPiece<f64>> = (0..6)
    .map(|seed| triangle_piece(lattice_points(seed, 300, 5)))
    .collect();
  let merged = merge_pieces(&pieces, &LocatorConfig::default()).unwrap();

  let tag = merged.point_data.array("tag").unwrap();
  for (id, &p) in merged.points.iter().enumerate() {
    assert_eq!(tag.tuple(id)[0].to_bits(), scalar_of(p).to_bits());
  }
  // At most one point per lattice site.
  assert!(merged.number_of_points() <= 6 * 6 * 6);
  assert_eq!(merged.cells.number_of_cells(), 600);
  let max_id = merged.cells.max_point_id().unwrap();
  assert!(max_id < merged.number_of_points());
}

#[test]
fn test_merge_without_attributes() {
  let points = vec![[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
  let cells = CellArray::from_cells([[0, 1, 2]]);
  let piece = MeshPiece::new(points, PointData::new(), cells);
  let merged = merge_pieces(&[piece.clone(), piece], &LocatorConfig::default()).unwrap();

  assert_eq!(merged.number_of_points(), 3);
  assert!(merged.point_data.is_empty());
  assert_eq!(merged.cells.cell(0), merged.cells.cell(1));
}

#[test]
fn test_merge_no_pieces() {
  let merged = merge_pieces::<f64>(&[], &LocatorConfig::default()).unwrap();
  assert_eq!(merged.number_of_points(), 0);
  assert!(merged.cells.is_empty());
  assert_eq!(merged.stats, MergeStats::default());
}

#[test]
fn test_merge_rejects_infinite_points() {
  let piece = MeshPiece::new(
    vec![[f64::INFINITY, 0.0, 0.0]],
    PointData::new(),
    CellArray::new(),
  );
  let err = merge_pieces(&[piece], &LocatorConfig::default()).unwrap_err();
  assert!(matches!(err, LocatorError::InvalidBounds(_)));
}
