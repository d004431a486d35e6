//! Per-tick sample aggregation
//!
//! Trackers often deliver several raw gaze points per engine tick. The
//! aggregator averages everything received since the last flush into one
//! sample stamped with the latest timestamp seen.

use crate::types::{Point, Sample};

#[derive(Debug, Clone, Default)]
pub struct SampleAggregator {
    sum: Point,
    count: usize,
    last_timestamp_ms: i64,
}

impl SampleAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.sum = self.sum + sample.location;
        self.count += 1;
        self.last_timestamp_ms = sample.timestamp_ms;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Emit the mean of the pending samples, or `None` if nothing arrived
    pub fn flush(&mut self) -> Option<Sample> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let sample = Sample::new(
            self.last_timestamp_ms,
            Point::new(self.sum.x / n, self.sum.y / n),
        );
        *self = Self::default();
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flush_averages_and_keeps_last_timestamp() {
        let mut agg = SampleAggregator::new();
        agg.push(Sample::new(10, Point::new(0.0, 0.0)));
        agg.push(Sample::new(20, Point::new(10.0, 4.0)));
        agg.push(Sample::new(25, Point::new(20.0, 2.0)));
        assert_eq!(agg.len(), 3);

        let sample = agg.flush().unwrap();
        assert_eq!(sample, Sample::new(25, Point::new(10.0, 2.0)));
        assert!(agg.is_empty());
    }

    #[test]
    fn test_empty_flush() {
        let mut agg = SampleAggregator::new();
        assert_eq!(agg.flush(), None);
    }
}
