//! Per-point attribute arrays, index-aligned with a point array.
//!
//! A merge moves every new point's attribute tuple along with its
//! coordinates, so destination arrays use the same reserved-slot storage as
//! the locator's points.

use crate::slots::{ReservedRange, SlotVec};
use crate::types::PointId;

/// Named array of fixed-width tuples (e.g. normals: 3 components).
#[derive(Clone, Debug)]
pub struct AttributeArray {
  name: String,
  components: usize,
  values: SlotVec<f64>,
}

impl AttributeArray {
  /// Empty array with `components` values per tuple.
  pub fn new(name: impl Into<String>, components: usize) -> Self {
    assert!(components > 0, "attribute arrays need at least one component");
    Self {
      name: name.into(),
      components,
      values: SlotVec::new(),
    }
  }

  /// Array over existing tuple data laid out contiguously.
  pub fn from_values(name: impl Into<String>, components: usize, values: Vec<f64>) -> Self {
    let mut array = Self::new(name, components);
    assert_eq!(
      values.len() % components,
      0,
      "value count must be a multiple of the component count"
    );
    array.values = SlotVec::with_capacity(values.len());
    for v in values {
      array.values.push(v);
    }
    array
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn components(&self) -> usize {
    self.components
  }

  pub fn number_of_tuples(&self) -> usize {
    self.values.len() / self.components
  }

  /// Tuple at `id`.
  #[inline]
  pub fn tuple(&self, id: PointId) -> &[f64] {
    let start = id * self.components;
    &self.values.as_slice()[start..start + self.components]
  }

  /// All values, tuple-major.
  pub fn values(&self) -> &[f64] {
    self.values.as_slice()
  }

  pub fn push_tuple(&mut self, tuple: &[f64]) {
    assert_eq!(tuple.len(), self.components, "tuple width mismatch");
    for &v in tuple {
      self.values.push(v);
    }
  }

  pub fn set_tuple(&mut self, id: PointId, tuple: &[f64]) {
    assert_eq!(tuple.len(), self.components, "tuple width mismatch");
    let start = id * self.components;
    for (i, &v) in tuple.iter().enumerate() {
      self.values.set(start + i, v);
    }
  }

  fn resize_tuples(&mut self, tuples: usize) {
    self.values.resize(tuples * self.components);
  }

  fn write_tuple_reserved(&self, range: &ReservedRange, id: PointId, tuple: &[f64]) {
    self
      .values
      .write_span(id, range, id * self.components, tuple);
  }

  fn same_layout(&self, other: &AttributeArray) -> bool {
    self.components == other.components && self.name == other.name
  }
}

/// Collection of attribute arrays sharing one point indexing.
#[derive(Clone, Debug, Default)]
pub struct PointData {
  arrays: Vec<AttributeArray>,
}

impl PointData {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an array, returning its position.
  pub fn add_array(&mut self, array: AttributeArray) -> usize {
    self.arrays.push(array);
    self.arrays.len() - 1
  }

  /// Builder form of [`add_array`](Self::add_array).
  pub fn with_array(mut self, array: AttributeArray) -> Self {
    self.add_array(array);
    self
  }

  pub fn arrays(&self) -> &[AttributeArray] {
    &self.arrays
  }

  pub fn array(&self, name: &str) -> Option<&AttributeArray> {
    self.arrays.iter().find(|a| a.name == name)
  }

  pub fn array_mut(&mut self, name: &str) -> Option<&mut AttributeArray> {
    self.arrays.iter_mut().find(|a| a.name == name)
  }

  pub fn number_of_arrays(&self) -> usize {
    self.arrays.len()
  }

  pub fn is_empty(&self) -> bool {
    self.arrays.is_empty()
  }

  /// Tuple count, taken as the smallest across arrays (0 with no arrays).
  pub fn number_of_tuples(&self) -> usize {
    self
      .arrays
      .iter()
      .map(AttributeArray::number_of_tuples)
      .min()
      .unwrap_or(0)
  }

  /// Same array names and widths, no tuples.
  pub fn copy_structure(&self) -> PointData {
    PointData {
      arrays: self
        .arrays
        .iter()
        .map(|a| AttributeArray::new(a.name.clone(), a.components))
        .collect(),
    }
  }

  /// True when both hold the same arrays in the same order.
  pub fn same_layout(&self, other: &PointData) -> bool {
    self.arrays.len() == other.arrays.len()
      && self
        .arrays
        .iter()
        .zip(&other.arrays)
        .all(|(a, b)| a.same_layout(b))
  }

  /// Append tuple `src_id` of every array in `src`.
  pub fn push_tuple_from(&mut self, src: &PointData, src_id: PointId) {
    debug_assert!(self.same_layout(src));
    for (dst, src) in self.arrays.iter_mut().zip(&src.arrays) {
      dst.push_tuple(src.tuple(src_id));
    }
  }

  /// Grow every array to at least `tuples` tuples.
  pub fn ensure_tuples(&mut self, tuples: usize) {
    for array in &mut self.arrays {
      if array.number_of_tuples() < tuples {
        array.resize_tuples(tuples);
      }
    }
  }

  /// Drop tuples past `tuples`.
  pub fn truncate(&mut self, tuples: usize) {
    for array in &mut self.arrays {
      if array.number_of_tuples() > tuples {
        array.resize_tuples(tuples);
      }
    }
  }

  /// Copy tuple `src_id` of `src` into reserved slot `dst_id` of every array.
  #[inline]
  pub(crate) fn copy_tuple_reserved(
    &self,
    range: &ReservedRange,
    src: &PointData,
    src_id: PointId,
    dst_id: PointId,
  ) {
    for (dst, src) in self.arrays.iter().zip(&src.arrays) {
      dst.write_tuple_reserved(range, dst_id, src.tuple(src_id));
    }
  }
}

#[cfg(test)]
#[path = "point_data_test.rs"]
mod point_data_test;
