//! Running accumulator for scalar samples.

use serde::{Deserialize, Serialize};

/// Count, sum and sum of squares of the samples seen so far.
///
/// Non-finite samples are counted as rejected and otherwise ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    count: usize,
    rejected: usize,
    sum: f64,
    sum_squares: f64,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_data(&mut self, value: f64) {
        if !value.is_finite() {
            self.rejected += 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.sum_squares += value * value;
        self.minimum = Some(self.minimum.map_or(value, |m| m.min(value)));
        self.maximum = Some(self.maximum.map_or(value, |m| m.max(value)));
    }

    pub fn valid_count(&self) -> usize {
        self.count
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    pub fn maximum(&self) -> Option<f64> {
        self.maximum
    }

    /// Root mean square of the samples.
    pub fn rms(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.sum_squares / self.count as f64).sqrt())
    }

    /// Sample standard deviation; needs at least two samples.
    pub fn standard_deviation(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        let n = self.count as f64;
        let variance = (self.sum_squares - self.sum * self.sum / n) / (n - 1.0);
        Some(variance.max(0.0).sqrt())
    }
}

impl Extend<f64> for Statistics {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for v in iter {
            self.add_data(v);
        }
    }
}

impl FromIterator<f64> for Statistics {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Statistics::new();
        stats.extend(iter);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_moments() {
        let stats: Statistics = [5.0, 10.0, 0.0].into_iter().collect();
        assert_eq!(stats.valid_count(), 3);
        assert_eq!(stats.average(), Some(5.0));
        assert_eq!(stats.minimum(), Some(0.0));
        assert_eq!(stats.maximum(), Some(10.0));
        assert_eq!(stats.standard_deviation(), Some(5.0));
    }

    #[test]
    fn test_empty_and_rejected() {
        let mut stats = Statistics::new();
        stats.add_data(f64::NAN);
        assert_eq!(stats.rejected_count(), 1);
        assert_eq!(stats.average(), None);
        assert_eq!(stats.rms(), None);
    }
}
