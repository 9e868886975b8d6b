//! Merge statistics and optional cumulative metrics.
//!
//! [`MergeStats`] is always produced by `merge_all`. [`MergeMetrics`]
//! accumulates them across merges and is feature-gated and runtime-toggled so
//! it costs nothing when disabled.
//!
//! # Usage
//!
//! ```ignore
//! use point_merge::metrics::{MergeMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! let (remap, stats) = target.merge_all(&piece, &mut out_pd, &piece_pd);
//! metrics.record(&stats);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// True when metrics are compiled in and enabled at runtime.
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Summary of one locator-into-locator merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
  /// Source buckets that held at least one point.
  pub buckets_merged: usize,
  /// Source points appended to the target.
  pub points_inserted: usize,
  /// Source points matched to an existing target point.
  pub duplicates: usize,
  /// Wall time of the merge in microseconds.
  pub timing_us: u64,
}

impl MergeStats {
  /// Source points processed.
  pub fn points_seen(&self) -> usize {
    self.points_inserted + self.duplicates
  }

  /// Add another merge's counts and time into this one.
  pub fn accumulate(&mut self, other: &MergeStats) {
    self.buckets_merged += other.buckets_merged;
    self.points_inserted += other.points_inserted;
    self.duplicates += other.duplicates;
    self.timing_us += other.timing_us;
  }
}

/// Fixed-capacity window of recent values.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  /// Push a value, evicting the oldest when full.
  pub fn push(&mut self, value: T) {
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
  }

  /// Oldest to newest.
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.buffer.iter()
  }

  pub fn last(&self) -> Option<&T> {
    self.buffer.back()
  }
}

impl RollingWindow<u64> {
  pub fn sum(&self) -> u64 {
    self.buffer.iter().sum()
  }

  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.sum() as f64 / self.buffer.len() as f64
    }
  }

  pub fn min_max(&self) -> Option<(u64, u64)> {
    let min = self.buffer.iter().copied().min()?;
    let max = self.buffer.iter().copied().max()?;
    Some((min, max))
  }
}

impl Default for RollingWindow<u64> {
  fn default() -> Self {
    Self::new(128)
  }
}

/// Cumulative merge counters plus recent merge timings.
#[derive(Debug, Clone, Default)]
pub struct MergeMetrics {
  /// Merges recorded.
  pub merges: u64,
  /// Totals across every recorded merge.
  pub totals: MergeStats,
  /// Recent merge times in microseconds.
  pub merge_timings: RollingWindow<u64>,
  /// Time of the most recent merge in microseconds.
  pub last_merge_us: u64,
}

impl MergeMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record one merge. No-op when metrics are disabled.
  pub fn record(&mut self, stats: &MergeStats) {
    if !is_enabled() {
      return;
    }
    self.merges += 1;
    self.totals.accumulate(stats);
    self.merge_timings.push(stats.timing_us);
    self.last_merge_us = stats.timing_us;
  }

  /// Fraction of processed source points that were duplicates.
  pub fn duplicate_ratio(&self) -> f64 {
    match self.totals.points_seen() {
      0 => 0.0,
      seen => self.totals.duplicates as f64 / seen as f64,
    }
  }

  pub fn avg_merge_timing_us(&self) -> f64 {
    self.merge_timings.average()
  }

  /// Clear timings. Cumulative counters are kept.
  pub fn reset_timings(&mut self) {
    self.merge_timings.clear();
    self.last_merge_us = 0;
  }
}
