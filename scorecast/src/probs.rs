//! Utilities for working with probabilities and samples.

pub trait SliceExt {
    fn sum(&self) -> f64;
    fn mean(&self) -> f64;
    fn variance(&self) -> f64;
    fn scale(&mut self, factor: f64);
    fn centre(&mut self) -> f64;
}
impl SliceExt for [f64] {
    fn sum(&self) -> f64 {
        self.iter().sum()
    }

    fn mean(&self) -> f64 {
        self.sum() / self.len() as f64
    }

    /// Unbiased sample variance. Undefined (`NaN`) for fewer than two elements.
    fn variance(&self) -> f64 {
        let mean = self.mean();
        let sum_sq = self.iter().map(|element| (element - mean).powi(2)).sum::<f64>();
        sum_sq / (self.len() as f64 - 1.0)
    }

    fn scale(&mut self, factor: f64) {
        for element in self {
            *element *= factor;
        }
    }

    /// Subtracts the mean from every element, returning the mean that was removed.
    fn centre(&mut self) -> f64 {
        let mean = self.mean();
        for element in self {
            *element -= mean;
        }
        mean
    }
}
