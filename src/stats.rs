//! Descriptive statistics for fitting.
//!
//! Everything here is **population** (maximum-likelihood, `n` denominator)
//! statistics: that is what the distribution fits, the feature scalers and
//! the residual error model consume.
//!
//! Non-finite input is rejected (`None`) rather than propagated, so a NaN
//! never silently becomes a fitted parameter.
//!
//! # Algorithms
//!
//! - **Sums**: Neumaier compensated summation.
//!   Reference: Neumaier (1974), "Rundungsfehleranalyse einiger Verfahren
//!   zur Summation endlicher Summen", *ZAMM* 54(1), pp. 39–51.
//! - **Variance**: Welford's single-pass update.
//!   Reference: Welford (1962), "Note on a Method for Calculating
//!   Corrected Sums of Squares and Products", *Technometrics* 4(3).

/// Compensated sum of `values`; error stays O(ε) regardless of length.
///
/// ```
/// use u_stratify::stats::kahan_sum;
/// assert_eq!(kahan_sum([1.0, 1e100, 1.0, -1e100]), 2.0);
/// ```
pub fn kahan_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    for x in values {
        let t = sum + x;
        compensation += if sum.abs() >= x.abs() {
            (sum - t) + x
        } else {
            (x - t) + sum
        };
        sum = t;
    }
    sum + compensation
}

/// Arithmetic mean, or `None` for empty or non-finite input.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() || !data.iter().all(|x| x.is_finite()) {
        return None;
    }
    Some(kahan_sum(data.iter().copied()) / data.len() as f64)
}

/// Population variance, or `None` for empty or non-finite input.
///
/// ```
/// use u_stratify::stats::population_variance;
/// let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
/// assert!((population_variance(&v).unwrap() - 4.0).abs() < 1e-12);
/// ```
pub fn population_variance(data: &[f64]) -> Option<f64> {
    Summary::from_slice(data)?.population_variance()
}

/// Population standard deviation, or `None` for empty or non-finite input.
pub fn population_std_dev(data: &[f64]) -> Option<f64> {
    population_variance(data).map(f64::sqrt)
}

/// `(min, max)` of `data`, or `None` for empty input or any NaN.
///
/// ```
/// use u_stratify::stats::range;
/// assert_eq!(range(&[3.0, -1.0, 4.0]), Some((-1.0, 4.0)));
/// assert_eq!(range(&[]), None);
/// ```
pub fn range(data: &[f64]) -> Option<(f64, f64)> {
    let (&first, rest) = data.split_first()?;
    if first.is_nan() {
        return None;
    }
    rest.iter().try_fold((first, first), |(lo, hi), &x| {
        (!x.is_nan()).then(|| (lo.min(x), hi.max(x)))
    })
}

/// Single-pass summary of a numeric column: count, mean, population
/// variance and range.
///
/// The feature scalers build one per column while scanning the table.
///
/// ```
/// use u_stratify::stats::Summary;
/// let mut s = Summary::new();
/// for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     s.push(x);
/// }
/// assert_eq!(s.mean(), Some(5.0));
/// assert_eq!(s.range(), Some((2.0, 9.0)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Summary {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summarises `data`, or returns `None` if any value is not finite.
    pub fn from_slice(data: &[f64]) -> Option<Self> {
        let mut summary = Self::new();
        for &x in data {
            if !x.is_finite() {
                return None;
            }
            summary.push(x);
        }
        Some(summary)
    }

    pub fn push(&mut self, x: f64) {
        self.count += 1;
        if self.count == 1 {
            self.mean = x;
            self.min = x;
            self.max = x;
            return;
        }
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    pub fn population_variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }

    pub fn population_std_dev(&self) -> Option<f64> {
        self.population_variance().map(f64::sqrt)
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        (self.count > 0).then_some((self.min, self.max))
    }
}
