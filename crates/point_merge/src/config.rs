//! LocatorConfig - configuration for bucket grid construction.

use crate::constants::{DEFAULT_DIVISIONS, DEFAULT_MAX_BUCKETS, DEFAULT_POINTS_PER_BUCKET};
use crate::error::LocatorError;

/// Configuration for sizing a locator's bucket grid.
#[derive(Clone, Debug, PartialEq)]
pub struct LocatorConfig {
  /// Target average number of points per bucket (automatic mode).
  pub points_per_bucket: usize,

  /// Per-axis divisions, used when `automatic` is false.
  pub divisions: [usize; 3],

  /// Derive divisions from the estimated point count instead of `divisions`.
  pub automatic: bool,

  /// Upper bound on the total number of buckets.
  pub max_buckets: usize,
}

impl Default for LocatorConfig {
  fn default() -> Self {
    Self {
      points_per_bucket: DEFAULT_POINTS_PER_BUCKET,
      divisions: DEFAULT_DIVISIONS,
      automatic: true,
      max_buckets: DEFAULT_MAX_BUCKETS,
    }
  }
}

impl LocatorConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_points_per_bucket(mut self, points: usize) -> Self {
    self.points_per_bucket = points;
    self
  }

  /// Use fixed divisions (switches automatic mode off).
  pub fn with_divisions(mut self, divisions: [usize; 3]) -> Self {
    self.divisions = divisions;
    self.automatic = false;
    self
  }

  pub fn with_automatic(mut self, automatic: bool) -> Self {
    self.automatic = automatic;
    self
  }

  pub fn with_max_buckets(mut self, max_buckets: usize) -> Self {
    self.max_buckets = max_buckets;
    self
  }

  /// Reject settings that cannot produce a grid.
  pub fn validate(&self) -> Result<(), LocatorError> {
    if self.points_per_bucket == 0 {
      return Err(LocatorError::InvalidConfig("points_per_bucket must be > 0"));
    }
    if self.max_buckets == 0 {
      return Err(LocatorError::InvalidConfig("max_buckets must be > 0"));
    }
    if !self.automatic && self.divisions.iter().any(|&d| d == 0) {
      return Err(LocatorError::InvalidConfig(
        "divisions must be > 0 on every axis",
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
