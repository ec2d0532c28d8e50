//! Descriptive statistics, Tukey fencing and correlation.

use serde::{Deserialize, Serialize};

/// Welford accumulator for mean and variance in a single pass.
#[derive(Debug, Clone, Default)]
struct RunningMoments {
    count: usize,
    mean: f64,
    m2: f64,
}

impl RunningMoments {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Sample variance (n - 1 denominator), zero below two observations.
    fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }
}

/// Sort values ascending under IEEE total ordering.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Quantile of an ascending slice using linear interpolation between the
/// two nearest ranks (position `(n - 1) * p`).
///
/// Returns `None` for an empty slice.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let p = p.clamp(0.0, 1.0);
    let pos = (sorted.len() - 1) as f64 * p;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Tukey fences around the interquartile range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TukeyFences {
    /// First quartile (25th percentile).
    pub q1: f64,
    /// Third quartile (75th percentile).
    pub q3: f64,
    /// Lower fence, `q1 - k * iqr`.
    pub lower: f64,
    /// Upper fence, `q3 + k * iqr`.
    pub upper: f64,
}

impl TukeyFences {
    /// Compute fences for a set of values with multiplier `k` (1.5 is the
    /// standard Tukey choice).
    pub fn compute(values: &[f64], k: f64) -> Option<Self> {
        let ordered = sorted(values);
        let q1 = quantile_sorted(&ordered, 0.25)?;
        let q3 = quantile_sorted(&ordered, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - k * iqr,
            upper: q3 + k * iqr,
        })
    }

    /// Calculate the interquartile range.
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// Whether a value lies strictly outside the fences.
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Summary of a numeric column, in the shape of a classic "describe" table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    /// Number of non-missing values.
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation.
    pub std: f64,
    pub min: f64,
    /// First quartile (25th percentile).
    pub q1: f64,
    pub median: f64,
    /// Third quartile (75th percentile).
    pub q3: f64,
    pub max: f64,
}

impl NumericSummary {
    /// Summarize a set of values. Returns `None` when there are none.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let ordered = sorted(values);
        let mut moments = RunningMoments::default();
        for &v in &ordered {
            moments.add(v);
        }

        Some(Self {
            count: ordered.len(),
            mean: moments.mean,
            std: moments.sample_variance().sqrt(),
            min: *ordered.first()?,
            q1: quantile_sorted(&ordered, 0.25)?,
            median: quantile_sorted(&ordered, 0.5)?,
            q3: quantile_sorted(&ordered, 0.75)?,
            max: *ordered.last()?,
        })
    }
}

/// Pearson correlation over the rows where both values are present.
///
/// Returns `None` when fewer than two complete pairs exist or either side has
/// zero variance.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();

    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(quantile_sorted(&values, 0.25).unwrap(), 1.75));
        assert!(approx(quantile_sorted(&values, 0.5).unwrap(), 2.5));
        assert!(approx(quantile_sorted(&values, 0.75).unwrap(), 3.25));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_tukey_fences() {
        let values = [-80.0, 20.0, 21.0, 22.0, 23.0, 24.0, 25.0, 26.0, 120.0];
        let fences = TukeyFences::compute(&values, 1.5).unwrap();
        assert!(approx(fences.q1, 21.0));
        assert!(approx(fences.q3, 25.0));
        assert!(approx(fences.iqr(), 4.0));
        assert!(approx(fences.lower, 15.0));
        assert!(approx(fences.upper, 31.0));
        assert!(fences.is_outlier(-80.0));
        assert!(fences.is_outlier(120.0));
        assert!(!fences.is_outlier(31.0));
    }

    #[test]
    fn test_numeric_summary() {
        let summary = NumericSummary::from_values(&[4.0, 2.0, 8.0, 6.0]).unwrap();
        assert_eq!(summary.count, 4);
        assert!(approx(summary.mean, 5.0));
        assert!(approx(summary.min, 2.0));
        assert!(approx(summary.max, 8.0));
        assert!(approx(summary.median, 5.0));
        // sample variance of 2,4,6,8 is 20/3
        assert!(approx(summary.std, (20.0f64 / 3.0).sqrt()));
        assert!(NumericSummary::from_values(&[]).is_none());
    }

    #[test]
    fn test_pearson() {
        let xs = [Some(1.0), Some(2.0), Some(3.0), None, Some(4.0)];
        let ys = [Some(2.0), Some(4.0), Some(6.0), Some(100.0), Some(8.0)];
        assert!(approx(pearson(&xs, &ys).unwrap(), 1.0));

        let neg = [Some(8.0), Some(6.0), Some(4.0), Some(0.0), Some(2.0)];
        assert!(approx(pearson(&xs, &neg).unwrap(), -1.0));
    }

    #[test]
    fn test_pearson_degenerate() {
        let xs = [Some(1.0), Some(1.0), Some(1.0)];
        let ys = [Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(pearson(&xs, &ys), None);
        assert_eq!(pearson(&[Some(1.0)], &[Some(2.0)]), None);
    }
}
