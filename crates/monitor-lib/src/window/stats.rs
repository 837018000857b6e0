//! Windowed running statistics
//!
//! Mean and variance use Welford's online algorithm extended with removal,
//! so evicting a point from the window is as cheap as adding one. The
//! regression accumulator keeps least-squares sums over (observation,
//! value) pairs for slope, intercept and R². The x axis is the insertion
//! ordinal, so slopes are per observation and do not depend on how far
//! apart the timestamps are.

use serde::{Deserialize, Serialize};

use crate::models::{DataPoint, Metric};

/// Welford accumulator supporting removal
#[derive(Debug, Clone, Default)]
pub struct MetricAccumulator {
    count: u64,
    mean: f64,
    /// Sum of squared differences from the mean
    m2: f64,
}

impl MetricAccumulator {
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn remove(&mut self, value: f64) {
        match self.count {
            0 => {}
            1 => *self = Self::default(),
            n => {
                let remaining = (n - 1) as f64;
                let old_mean = self.mean;
                self.mean = (old_mean * n as f64 - value) / remaining;
                self.m2 -= (value - old_mean) * (value - self.mean);
                // Rounding can push m2 slightly negative
                if self.m2 < 0.0 {
                    self.m2 = 0.0;
                }
                self.count = n - 1;
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (Bessel's correction), zero below two samples
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        self.m2 / (self.count - 1) as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Running least-squares sums for a single metric
#[derive(Debug, Clone, Default)]
pub struct RegressionAccumulator {
    n: f64,
    sum_x: f64,
    sum_y: f64,
    sum_xy: f64,
    sum_xx: f64,
    sum_yy: f64,
}

impl RegressionAccumulator {
    pub fn add(&mut self, x: f64, y: f64) {
        self.n += 1.0;
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xy += x * y;
        self.sum_xx += x * x;
        self.sum_yy += y * y;
    }

    pub fn remove(&mut self, x: f64, y: f64) {
        if self.n <= 1.0 {
            *self = Self::default();
            return;
        }
        self.n -= 1.0;
        self.sum_x -= x;
        self.sum_y -= y;
        self.sum_xy -= x * y;
        self.sum_xx -= x * x;
        self.sum_yy -= y * y;
    }

    fn sxx(&self) -> f64 {
        self.n * self.sum_xx - self.sum_x * self.sum_x
    }

    fn syy(&self) -> f64 {
        self.n * self.sum_yy - self.sum_y * self.sum_y
    }

    fn sxy(&self) -> f64 {
        self.n * self.sum_xy - self.sum_x * self.sum_y
    }

    /// Least-squares slope in value units per unit of x
    ///
    /// `None` when fewer than two points or all x values coincide.
    pub fn slope(&self) -> Option<f64> {
        let sxx = self.sxx();
        if self.n < 2.0 || sxx.abs() < f64::EPSILON {
            return None;
        }
        let slope = self.sxy() / sxx;
        slope.is_finite().then_some(slope)
    }

    pub fn intercept(&self) -> Option<f64> {
        let slope = self.slope()?;
        Some((self.sum_y - slope * self.sum_x) / self.n)
    }

    /// Coefficient of determination of the linear fit
    ///
    /// A perfectly flat series has no variance to explain and yields zero.
    pub fn r_squared(&self) -> Option<f64> {
        let sxx = self.sxx();
        let syy = self.syy();
        if self.n < 2.0 || sxx.abs() < f64::EPSILON {
            return None;
        }
        if syy <= f64::EPSILON {
            return Some(0.0);
        }
        let sxy = self.sxy();
        let r2 = (sxy * sxy) / (sxx * syy);
        r2.is_finite().then(|| r2.clamp(0.0, 1.0))
    }
}

/// Point-in-time view of one metric's statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub mean: f64,
    pub std_dev: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slope: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_squared: Option<f64>,
}

/// Windowed statistics for every tracked metric
///
/// Points must be removed in the order they were added, which is how the
/// sliding window evicts and truncates. Each point's regression x is its
/// insertion ordinal; the ordinals restart from zero whenever the
/// statistics are emptied or rebuilt, which also keeps the sums well
/// conditioned.
#[derive(Debug, Clone, Default)]
pub struct RunningStatistics {
    moments: [MetricAccumulator; 3],
    regressions: [RegressionAccumulator; 3],
    /// Ordinal of the oldest point still accounted for
    oldest: u64,
    /// Ordinal the next added point receives
    next: u64,
    removed_since_rebuild: u64,
}

impl RunningStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, point: &DataPoint) {
        let x = self.next as f64;
        self.next += 1;
        for metric in Metric::ALL {
            let value = point.value(metric);
            self.moments[metric.index()].add(value);
            self.regressions[metric.index()].add(x, value);
        }
    }

    /// Forget the oldest point
    pub fn remove(&mut self, point: &DataPoint) {
        if self.count() == 0 {
            return;
        }
        let x = self.oldest as f64;
        self.oldest += 1;
        self.removed_since_rebuild += 1;
        for metric in Metric::ALL {
            let value = point.value(metric);
            self.moments[metric.index()].remove(value);
            self.regressions[metric.index()].remove(x, value);
        }
        if self.count() == 0 {
            *self = Self::default();
        }
    }

    /// Discard everything and re-accumulate from the given points, oldest first
    pub fn rebuild<'a>(&mut self, points: impl IntoIterator<Item = &'a DataPoint>) {
        *self = Self::default();
        for point in points {
            self.add(point);
        }
    }

    /// Removals since the last rebuild
    ///
    /// Each removal leaves a little rounding error in the sums; callers
    /// rebuild from the window once this grows large.
    pub fn removed_since_rebuild(&self) -> u64 {
        self.removed_since_rebuild
    }

    pub fn count(&self) -> u64 {
        self.moments[0].count()
    }

    pub fn mean(&self, metric: Metric) -> f64 {
        self.moments[metric.index()].mean()
    }

    pub fn std_dev(&self, metric: Metric) -> f64 {
        self.moments[metric.index()].std_dev()
    }

    pub fn variance(&self, metric: Metric) -> f64 {
        self.moments[metric.index()].variance()
    }

    pub fn slope(&self, metric: Metric) -> Option<f64> {
        self.regressions[metric.index()].slope()
    }

    pub fn intercept(&self, metric: Metric) -> Option<f64> {
        self.regressions[metric.index()].intercept()
    }

    pub fn r_squared(&self, metric: Metric) -> Option<f64> {
        self.regressions[metric.index()].r_squared()
    }

    pub fn summary(&self, metric: Metric) -> MetricSummary {
        MetricSummary {
            mean: self.mean(metric),
            std_dev: self.std_dev(metric),
            slope: self.slope(metric),
            r_squared: self.r_squared(metric),
        }
    }
}
