//! Sliding time-window statistics over a stream of numeric values.
//!
//! The window is evaluated against each incoming timestamp rather than the
//! wall clock. Eviction only looks at the front of the buffer, so a value
//! that arrives out of order (older, but still inside the window) is kept
//! behind newer entries and can outlive its neighbours until those leave.

use crate::config::{ConfigError, StreamConfig};
use crate::types::Observation;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct StreamAnalyzer {
    window: TimeDelta,
    values: VecDeque<Observation>,
    latest: Option<DateTime<Utc>>,
    sum: f64,
    count: usize,
}

impl StreamAnalyzer {
    /// Negative windows are treated as zero
    pub fn new(window: TimeDelta) -> Self {
        Self {
            window: window.max(TimeDelta::zero()),
            values: VecDeque::new(),
            latest: None,
            sum: 0.0,
            count: 0,
        }
    }

    pub fn from_config(config: &StreamConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.window()?))
    }

    /// Add a value; `None` stamps it with the current time
    ///
    /// Returns `false` when the value is dropped: it is NaN or infinite, or
    /// it is already older than the window behind the latest timestamp seen.
    pub fn add_value(&mut self, value: f64, timestamp: Option<DateTime<Utc>>) -> bool {
        if !value.is_finite() {
            tracing::debug!(value, "dropping non-finite stream value");
            return false;
        }

        let timestamp = timestamp.unwrap_or_else(Utc::now);

        if let Some(latest) = self.latest {
            if timestamp < self.cutoff(latest) {
                tracing::debug!(%timestamp, %latest, value, "dropping stale stream value");
                return false;
            }
        }

        let cutoff = self.cutoff(timestamp);
        while let Some(front) = self.values.front() {
            if front.timestamp >= cutoff {
                break;
            }
            self.sum -= front.value;
            self.count -= 1;
            self.values.pop_front();
        }
        if self.count == 0 {
            // Drop accumulated rounding error once the window drains
            self.sum = 0.0;
        }

        self.values.push_back(Observation { timestamp, value });
        self.sum += value;
        self.count += 1;
        self.latest = Some(self.latest.map_or(timestamp, |latest| latest.max(timestamp)));
        true
    }

    fn cutoff(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        timestamp
            .checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Mean of retained values, 0 when empty
    pub fn moving_average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }

    /// Linear-interpolated percentile of retained values, `p` in [0, 1]
    ///
    /// `p` is clamped into range and NaN counts as 0. Returns 0 when empty.
    pub fn percentile(&self, p: f64) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }

        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };

        let mut sorted: Vec<f64> = self.values.iter().map(|o| o.value).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let last = sorted.len() - 1;
        let k = last as f64 * p;
        let f = (k.floor() as usize).min(last);
        let c = (f + 1).min(last);
        let d = k - f as f64;

        sorted[f] * (1.0 - d) + sorted[c] * d
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.latest
    }

    /// Retained observations in insertion order
    pub fn values(&self) -> impl Iterator<Item = &Observation> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(seconds: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0)
    }

    fn analyzer_secs(window: i64) -> StreamAnalyzer {
        StreamAnalyzer::new(TimeDelta::seconds(window))
    }

    #[test]
    fn test_empty_stream() {
        let analyzer = analyzer_secs(60);
        assert_eq!(analyzer.moving_average(), 0.0);
        assert_eq!(analyzer.percentile(0.5), 0.0);
        assert!(analyzer.is_empty());
        assert_eq!(analyzer.latest(), None);
    }

    #[test]
    fn test_average_of_values_in_window() {
        let mut analyzer = analyzer_secs(60);
        let values = [3.0, 7.5, 1.25, 9.0, 4.0];
        for (i, v) in values.iter().enumerate() {
            assert!(analyzer.add_value(*v, at(i as i64)));
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        assert!((analyzer.moving_average() - mean).abs() < 1e-12);
        assert_eq!(analyzer.len(), 5);
    }

    #[test]
    fn test_old_values_are_evicted() {
        let mut analyzer = analyzer_secs(10);
        analyzer.add_value(100.0, at(0));
        analyzer.add_value(200.0, at(5));
        analyzer.add_value(1.0, at(12));
        // t=0 is older than 12 - 10; t=5 is still inside
        assert_eq!(analyzer.len(), 2);
        assert_eq!(analyzer.moving_average(), 100.5);

        analyzer.add_value(3.0, at(30));
        assert_eq!(analyzer.len(), 1);
        assert_eq!(analyzer.moving_average(), 3.0);
    }

    #[test]
    fn test_entry_exactly_at_cutoff_is_kept() {
        let mut analyzer = analyzer_secs(10);
        analyzer.add_value(2.0, at(0));
        analyzer.add_value(4.0, at(10));
        assert_eq!(analyzer.len(), 2);
        assert_eq!(analyzer.moving_average(), 3.0);
    }

    #[test]
    fn test_stale_value_does_not_move_average() {
        let mut analyzer = analyzer_secs(60);
        for i in 0..10 {
            analyzer.add_value(i as f64, at(100 + i));
        }
        let before = analyzer.moving_average();

        assert!(!analyzer.add_value(1_000_000.0, at(0)));
        let after = analyzer.moving_average();

        assert!((before - after).abs() < 1e-3);
        assert_eq!(analyzer.len(), 10);
    }

    #[test]
    fn test_non_finite_values_are_dropped() {
        let mut analyzer = analyzer_secs(10);
        assert!(!analyzer.add_value(f64::INFINITY, at(0)));
        assert!(!analyzer.add_value(f64::NEG_INFINITY, at(1)));
        assert!(!analyzer.add_value(f64::NAN, at(2)));
        assert!(analyzer.is_empty());
        assert_eq!(analyzer.latest(), None);

        analyzer.add_value(1.0, at(5));
        analyzer.add_value(3.0, at(12));
        assert_eq!(analyzer.len(), 2);
        assert_eq!(analyzer.moving_average(), 2.0);
        assert_eq!(analyzer.percentile(1.0), 3.0);
    }

    #[test]
    fn test_out_of_order_within_window_is_kept() {
        let mut analyzer = analyzer_secs(60);
        analyzer.add_value(10.0, at(100));
        assert!(analyzer.add_value(20.0, at(50)));
        assert_eq!(analyzer.len(), 2);
        assert_eq!(analyzer.latest(), at(100));

        // Only the front of the buffer is inspected, so t=50 stays while t=100 is in front
        analyzer.add_value(30.0, at(159));
        let timestamps: Vec<_> = analyzer.values().map(|o| Some(o.timestamp)).collect();
        assert_eq!(timestamps, vec![at(100), at(50), at(159)]);
    }

    #[test]
    fn test_decreasing_timestamps_inside_window() {
        // Mirrors a producer replaying recent history newest-first
        let mut analyzer = analyzer_secs(300);
        for i in 0..100 {
            analyzer.add_value(i as f64 * 1.5, at(1000 - i));
        }
        assert_eq!(analyzer.len(), 100);
        assert!((analyzer.moving_average() - 74.25).abs() < 1e-9);
        assert!((analyzer.percentile(0.95) - 141.075).abs() < 1e-9);
    }

    #[test]
    fn test_default_timestamp_is_now() {
        let mut analyzer = analyzer_secs(60);
        let before = Utc::now();
        assert!(analyzer.add_value(5.0, None));
        let stamped = analyzer.latest().unwrap();
        assert!(stamped >= before);
    }

    #[rstest]
    #[case(0.0)]
    #[case(0.25)]
    #[case(0.5)]
    #[case(1.0)]
    fn test_single_value_percentile(#[case] p: f64) {
        let mut analyzer = analyzer_secs(60);
        analyzer.add_value(42.5, at(0));
        assert_eq!(analyzer.percentile(p), 42.5);
    }

    #[rstest]
    #[case(0.0, 10.0)]
    #[case(0.5, 25.0)]
    #[case(0.75, 32.5)]
    #[case(1.0, 40.0)]
    #[case(-3.0, 10.0)]
    #[case(7.0, 40.0)]
    #[case(f64::NAN, 10.0)]
    fn test_percentile_interpolates(#[case] p: f64, #[case] expected: f64) {
        let mut analyzer = analyzer_secs(60);
        for (i, v) in [40.0, 10.0, 30.0, 20.0].iter().enumerate() {
            analyzer.add_value(*v, at(i as i64));
        }
        assert!((analyzer.percentile(p) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_negative_window_is_zero() {
        let mut analyzer = StreamAnalyzer::new(TimeDelta::seconds(-5));
        assert_eq!(analyzer.window(), TimeDelta::zero());
        analyzer.add_value(1.0, at(0));
        analyzer.add_value(2.0, at(0));
        analyzer.add_value(3.0, at(1));
        assert_eq!(analyzer.len(), 1);
        assert_eq!(analyzer.moving_average(), 3.0);
    }

    #[test]
    fn test_from_config() {
        let analyzer = StreamAnalyzer::from_config(&StreamConfig { window_ms: 2_000 }).unwrap();
        assert_eq!(analyzer.window(), TimeDelta::seconds(2));
    }
}
