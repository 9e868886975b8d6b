//! Core data types for point merging.

use std::fmt::Debug;

use glam::DVec3;

/// Index of a point in a locator's point array.
pub type PointId = usize;

/// Sentinel for a remap slot that has not been filled by a merge.
pub const UNMAPPED: PointId = PointId::MAX;

/// Storage precision of point coordinates, decided at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
  /// 32-bit floats.
  Single,
  /// 64-bit floats.
  Double,
}

/// Numeric representation of a coordinate component.
///
/// Implemented for `f32` and `f64`. Locators are generic over this trait so the
/// merge hot loop is monomorphized per storage type instead of dispatching on
/// a runtime tag.
pub trait Coord: Copy + Default + PartialEq + Debug + Send + Sync + 'static {
  const PRECISION: Precision;

  fn to_f64(self) -> f64;

  fn from_f64(value: f64) -> Self;

  /// Convert from another coordinate type.
  ///
  /// Same-type conversions round-trip through `f64` exactly and compile down
  /// to a plain copy.
  #[inline(always)]
  fn from_coord<U: Coord>(value: U) -> Self {
    Self::from_f64(value.to_f64())
  }
}

impl Coord for f32 {
  const PRECISION: Precision = Precision::Single;

  #[inline(always)]
  fn to_f64(self) -> f64 {
    self as f64
  }

  #[inline(always)]
  fn from_f64(value: f64) -> Self {
    value as f32
  }
}

impl Coord for f64 {
  const PRECISION: Precision = Precision::Double;

  #[inline(always)]
  fn to_f64(self) -> f64 {
    self
  }

  #[inline(always)]
  fn from_f64(value: f64) -> Self {
    value
  }
}

/// Convert a whole point between coordinate types.
#[inline(always)]
pub fn convert_point<T: Coord, U: Coord>(p: [U; 3]) -> [T; 3] {
  [T::from_coord(p[0]), T::from_coord(p[1]), T::from_coord(p[2])]
}

/// Widen a point to `f64` components.
#[inline(always)]
pub fn point_to_f64<T: Coord>(p: [T; 3]) -> [f64; 3] {
  [p[0].to_f64(), p[1].to_f64(), p[2].to_f64()]
}

/// Exact component-wise equality.
///
/// No tolerance is applied. NaN never compares equal (so NaN points are always
/// unique) and `0.0 == -0.0` holds.
#[inline(always)]
pub fn same_point<T: Coord>(a: &[T; 3], b: &[T; 3]) -> bool {
  a[0] == b[0] && a[1] == b[1] && a[2] == b[2]
}

/// Axis-aligned bounding box in double precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
  pub min: DVec3,
  pub max: DVec3,
}

impl Bounds {
  /// Create bounds with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: DVec3::splat(f64::INFINITY),
      max: DVec3::splat(f64::NEG_INFINITY),
    }
  }

  /// Create bounds from min/max corners.
  pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
    Self {
      min: DVec3::from_array(min),
      max: DVec3::from_array(max),
    }
  }

  /// Tight bounds around a set of points. NaN components are ignored.
  pub fn from_points<T: Coord>(points: &[[T; 3]]) -> Self {
    let mut bounds = Self::empty();
    for p in points {
      bounds.encapsulate(point_to_f64(*p));
    }
    bounds
  }

  /// Expand to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: [f64; 3]) {
    let p = DVec3::from_array(point);
    self.min = self.min.min(p);
    self.max = self.max.max(p);
  }

  /// Smallest bounds containing both.
  pub fn union(&self, other: &Bounds) -> Bounds {
    Bounds {
      min: self.min.min(other.min),
      max: self.max.max(other.max),
    }
  }

  /// True when min <= max on all axes and every extent is finite.
  pub fn is_valid(&self) -> bool {
    self.min.is_finite() && self.max.is_finite() && self.min.cmple(self.max).all()
  }

  /// Extent along each axis.
  pub fn size(&self) -> DVec3 {
    self.max - self.min
  }

  /// Length of the diagonal.
  pub fn length(&self) -> f64 {
    self.size().length()
  }

  /// Inclusive containment test.
  pub fn contains(&self, point: [f64; 3]) -> bool {
    let p = DVec3::from_array(point);
    self.min.cmple(p).all() && p.cmple(self.max).all()
  }
}

impl Default for Bounds {
  fn default() -> Self {
    Self::empty()
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
