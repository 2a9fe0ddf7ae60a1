//! Build-pass statistics with atomic counters.
//!
//! [`PassStats`] is shared by every resolution job of a pass and
//! [`StatsSnapshot`] is its serializable point-in-time view.
//!
//! # Thread Safety
//!
//! All counters use [`AtomicU64`] with [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering. Statistics are informational and don't require strict ordering.
//!
//! # Examples
//!
//! ```
//! use km_core::Resolution;
//! use km_engine::PassStats;
//!
//! let stats = PassStats::new();
//! stats.record_resolution(&Resolution::Omitted);
//! stats.increment_mappers();
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.omitted, 1);
//! assert_eq!(snapshot.params(), 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use km_core::Resolution;
use serde::{Deserialize, Serialize};

/// Atomic counters for a build pass.
#[derive(Debug, Default)]
pub struct PassStats {
    specs: AtomicU64,
    mappers: AtomicU64,
    direct: AtomicU64,
    converted: AtomicU64,
    missing: AtomicU64,
    omitted: AtomicU64,
    fallbacks: AtomicU64,
    errors: AtomicU64,
}

impl PassStats {
    /// Creates a new [`PassStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the resolved-specs counter.
    #[inline]
    pub fn increment_specs(&self) {
        self.specs.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the assembled-mappers counter.
    #[inline]
    pub fn increment_mappers(&self) {
        self.mappers.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the permissive-fallback counter.
    #[inline]
    pub fn increment_fallbacks(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the error counter.
    #[inline]
    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one parameter resolution by kind.
    pub fn record_resolution(&self, resolution: &Resolution) {
        let counter = match resolution {
            Resolution::Direct { .. } => &self.direct,
            Resolution::Converted { .. } => &self.converted,
            Resolution::Missing { .. } => &self.missing,
            Resolution::Omitted => &self.omitted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all statistics.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            specs: self.specs.load(Ordering::Relaxed),
            mappers: self.mappers.load(Ordering::Relaxed),
            direct: self.direct.load(Ordering::Relaxed),
            converted: self.converted.load(Ordering::Relaxed),
            missing: self.missing.load(Ordering::Relaxed),
            omitted: self.omitted.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.specs,
            &self.mappers,
            &self.direct,
            &self.converted,
            &self.missing,
            &self.omitted,
            &self.fallbacks,
            &self.errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A point-in-time snapshot of pass statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Mapping specs attempted.
    pub specs: u64,
    /// Mapper units assembled.
    pub mappers: u64,
    /// Parameters read directly from the source.
    pub direct: u64,
    /// Parameters converted by providers.
    pub converted: u64,
    /// Parameters supplied by the caller.
    pub missing: u64,
    /// Parameters left to their defaults.
    pub omitted: u64,
    /// Direct reads emitted without a type-correct conversion path.
    pub fallbacks: u64,
    /// Specs that failed.
    pub errors: u64,
}

impl StatsSnapshot {
    /// Total parameters resolved.
    #[inline]
    #[must_use]
    pub const fn params(&self) -> u64 {
        self.direct + self.converted + self.missing + self.omitted
    }

    /// Percentage of parameters resolved without caller input.
    ///
    /// Returns 0.0 if no parameters were resolved.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Counts won't exceed f64 precision
    pub fn coverage_percent(&self) -> f64 {
        let params = self.params();
        if params == 0 {
            return 0.0;
        }
        (self.direct + self.converted + self.omitted) as f64 / params as f64 * 100.0
    }
}
