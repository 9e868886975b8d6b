use super::*;
use crate::slots::InsertionCursor;

fn scalars_and_normals() -> PointData {
  PointData::new()
    .with_array(AttributeArray::from_values("scalars", 1, vec![1.0, 2.0, 3.0]))
    .with_array(AttributeArray::from_values(
      "normals",
      3,
      vec![0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0],
    ))
}

#[test]
fn test_tuple_access() {
  let pd = scalars_and_normals();
  assert_eq!(pd.number_of_arrays(), 2);
  assert_eq!(pd.number_of_tuples(), 3);

  let normals = pd.array("normals").unwrap();
  assert_eq!(normals.components(), 3);
  assert_eq!(normals.tuple(1), &[0.0, 1.0, 0.0]);
  assert!(pd.array("missing").is_none());
}

#[test]
fn test_copy_structure_is_empty_with_same_layout() {
  let pd = scalars_and_normals();
  let out = pd.copy_structure();

  assert_eq!(out.number_of_tuples(), 0);
  assert!(out.same_layout(&pd));
  assert_eq!(out.arrays()[1].name(), "normals");
}

#[test]
fn test_layout_mismatch_detected() {
  let pd = scalars_and_normals();
  let other = PointData::new()
    .with_array(AttributeArray::new("scalars", 1))
    .with_array(AttributeArray::new("normals", 2));
  assert!(!pd.same_layout(&other));
  assert!(!pd.same_layout(&PointData::new()));
}

#[test]
fn test_push_tuple_from() {
  let src = scalars_and_normals();
  let mut dst = src.copy_structure();
  dst.push_tuple_from(&src, 2);
  dst.push_tuple_from(&src, 0);

  assert_eq!(dst.number_of_tuples(), 2);
  assert_eq!(dst.array("scalars").unwrap().values(), &[3.0, 1.0]);
  assert_eq!(dst.array("normals").unwrap().tuple(0), &[1.0, 0.0, 0.0]);
}

#[test]
fn test_ensure_and_truncate() {
  let mut pd = scalars_and_normals();
  pd.ensure_tuples(5);
  assert_eq!(pd.number_of_tuples(), 5);
  assert_eq!(pd.array("scalars").unwrap().tuple(4), &[0.0]);

  pd.truncate(2);
  assert_eq!(pd.number_of_tuples(), 2);
  assert_eq!(pd.array("scalars").unwrap().values(), &[1.0, 2.0]);
}

#[test]
fn test_set_tuple() {
  let mut pd = scalars_and_normals();
  pd.array_mut("normals")
    .unwrap()
    .set_tuple(0, &[0.5, 0.5, 0.5]);
  assert_eq!(pd.array("normals").unwrap().tuple(0), &[0.5, 0.5, 0.5]);
}

#[test]
fn test_copy_tuple_reserved() {
  let src = scalars_and_normals();
  let mut dst = src.copy_structure();
  dst.ensure_tuples(4);

  let cursor = InsertionCursor::new(2);
  let range = cursor.reserve(2);
  dst.copy_tuple_reserved(&range, &src, 1, 2);
  dst.copy_tuple_reserved(&range, &src, 0, 3);

  assert_eq!(dst.array("scalars").unwrap().values(), &[0.0, 0.0, 2.0, 1.0]);
  assert_eq!(dst.array("normals").unwrap().tuple(2), &[0.0, 1.0, 0.0]);
  assert_eq!(dst.array("normals").unwrap().tuple(3), &[0.0, 0.0, 1.0]);
}

#[test]
#[should_panic(expected = "tuple width mismatch")]
fn test_push_wrong_width_panics() {
  let mut array = AttributeArray::new("v", 3);
  array.push_tuple(&[1.0, 2.0]);
}
