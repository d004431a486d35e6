//! Time-bounded sample window
//!
//! Holds the trailing `duration_ms` of samples, oldest first. The window only
//! reports itself ready once it has been full at least once (an eviction has
//! happened) and still holds two or more samples, so statistics never run
//! over less than the intended time span.

use crate::types::Timestamped;
use std::collections::VecDeque;

/// Default window span in milliseconds
pub const DEFAULT_BUFFER_DURATION_MS: i64 = 600;

/// FIFO of timestamped samples bounded by age
#[derive(Debug, Clone)]
pub struct SampleWindow<T> {
    samples: VecDeque<T>,
    duration_ms: i64,
    ready: bool,
}

impl<T: Timestamped> Default for SampleWindow<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_DURATION_MS)
    }
}

impl<T: Timestamped> SampleWindow<T> {
    /// Create an empty window spanning `duration_ms`
    pub fn new(duration_ms: i64) -> Self {
        Self {
            samples: VecDeque::new(),
            duration_ms,
            ready: false,
        }
    }

    /// Evict samples older than the window relative to `sample`, then append it.
    pub fn push(&mut self, sample: T) {
        let now = sample.timestamp_ms();
        while let Some(oldest) = self.samples.front() {
            if now.saturating_sub(oldest.timestamp_ms()) <= self.duration_ms {
                break;
            }
            self.samples.pop_front();
            self.ready = true;
        }

        self.ready = self.ready && self.samples.len() > 1;
        self.samples.push_back(sample);
    }

    /// Whether the window has been full and holds enough history to classify
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn peek_oldest(&self) -> Option<&T> {
        self.samples.front()
    }

    pub fn peek_newest(&self) -> Option<&T> {
        self.samples.back()
    }

    /// Time covered by the current contents (newest - oldest)
    pub fn span_ms(&self) -> i64 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => {
                last.timestamp_ms().saturating_sub(first.timestamp_ms())
            }
            _ => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.samples.iter()
    }

    /// Drop all samples and return to the pre-session state
    pub fn clear(&mut self) {
        self.samples.clear();
        self.ready = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::types::{Point, Sample};

    fn sample(ts: i64) -> Sample {
        Sample::new(ts, Point::new(ts as f64, 0.0))
    }

    #[test]
    fn test_ready_after_first_eviction() {
        let mut window = SampleWindow::new(600);

        // 0..=600 fits exactly: no eviction yet
        for i in 0..=20 {
            window.push(sample(i * 30));
            assert!(!window.is_ready(), "ready too early at {}", i * 30);
        }
        assert_eq!(window.len(), 21);

        window.push(sample(630));
        assert!(window.is_ready());
        assert_eq!(window.len(), 21);
        assert_eq!(window.peek_oldest().unwrap().timestamp_ms, 30);
        assert_eq!(window.peek_newest().unwrap().timestamp_ms, 630);
        assert_eq!(window.span_ms(), 600);
    }

    #[test]
    fn test_contents_stay_within_duration() {
        let mut window = SampleWindow::new(600);
        for i in 0..100 {
            let ts = i * 30;
            window.push(sample(ts));
            for s in window.iter() {
                assert!(ts - s.timestamp_ms <= 600);
            }
        }
        assert!(window.is_ready());
    }

    #[test]
    fn test_gap_evicting_everything_drops_ready() {
        let mut window = SampleWindow::new(600);
        for i in 0..30 {
            window.push(sample(i * 30));
        }
        assert!(window.is_ready());

        window.push(sample(10_000));
        assert!(!window.is_ready());
        assert_eq!(window.len(), 1);

        // Not ready again until the window has filled and evicted once more
        window.push(sample(10_030));
        assert!(!window.is_ready());
    }

    #[test]
    fn test_clear_resets_state() {
        let mut window = SampleWindow::new(100);
        for i in 0..10 {
            window.push(sample(i * 30));
        }
        assert!(window.is_ready());

        window.clear();
        assert!(window.is_empty());
        assert!(!window.is_ready());
        assert!(window.peek_oldest().is_none());
        assert_eq!(window.span_ms(), 0);
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let mut window = SampleWindow::new(600);
        window.push(sample(i64::MIN));
        window.push(sample(0));
        assert_eq!(window.len(), 1);
        assert!(!window.is_ready());

        window.push(sample(i64::MAX));
        assert_eq!(window.len(), 1);
        assert_eq!(window.peek_oldest().unwrap().timestamp_ms, i64::MAX);
        assert_eq!(window.span_ms(), 0);
    }
}
