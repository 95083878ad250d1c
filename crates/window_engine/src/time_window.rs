//! Time window accumulator: combine-latest pairing on a fixed emission beat.
//!
//! Acceleration and angular velocity run on the same sensor clock but tick
//! independently. Every arrival on either stream forms a candidate pair from
//! the latest value of each; candidates whose sensor timestamps diverge too
//! far are discarded. Accepted pairs are stamped with their arrival instant
//! and collected into windows when the engine's timer fires.

use std::collections::VecDeque;
use std::time::Instant;

use contracts::{
    AccelerationSample, AngularVelocitySample, CombinedSample, PositionFix, TimeWindowConfig,
};
use tracing::{instrument, trace};

use crate::position_history::PositionHistory;

/// One accepted accel/gyro pair
#[derive(Debug, Clone, Copy)]
struct PairedMotion {
    /// Arrival instant of the completing sample
    arrived: Instant,
    acceleration: AccelerationSample,
    angular_velocity: AngularVelocitySample,
}

/// Pairs motion samples and cuts them into arrival-time windows
///
/// A flush at instant `t` emits every pair that arrived in `(t - span, t]`,
/// so with `skip == span` consecutive windows are disjoint, with
/// `skip < span` they overlap, and with `skip > span` samples arriving in
/// the gap are silently dropped. A window with no pairs emits nothing.
#[derive(Debug)]
pub struct TimeWindowAccumulator {
    /// Window length
    span: std::time::Duration,
    /// Interval between flushes
    skip: std::time::Duration,
    /// Maximum sensor-clock divergence for a pair, in nanoseconds (strict)
    max_skew_nanos: i64,
    /// Latest acceleration sample seen
    pending_acceleration: Option<AccelerationSample>,
    /// Latest angular velocity sample seen
    pending_angular_velocity: Option<AngularVelocitySample>,
    /// Accepted pairs in arrival order
    pairs: VecDeque<PairedMotion>,
    /// Rolling fix history for position lookup at emission time
    history: PositionHistory,
    /// Candidate pairs discarded for skew
    rejected_count: u64,
}

impl TimeWindowAccumulator {
    /// Create a new accumulator with the given configuration
    pub fn new(config: &TimeWindowConfig) -> Self {
        Self {
            span: config.span(),
            skip: config.skip(),
            max_skew_nanos: config.max_pair_skew_nanos(),
            pending_acceleration: None,
            pending_angular_velocity: None,
            pairs: VecDeque::new(),
            history: PositionHistory::new(config.position_history_len),
            rejected_count: 0,
        }
    }

    /// Register an acceleration sample arriving at `now`
    #[inline]
    pub fn push_acceleration(&mut self, sample: AccelerationSample, now: Instant) {
        self.pending_acceleration = Some(sample);
        self.try_pair(now);
    }

    /// Register an angular velocity sample arriving at `now`
    #[inline]
    pub fn push_angular_velocity(&mut self, sample: AngularVelocitySample, now: Instant) {
        self.pending_angular_velocity = Some(sample);
        self.try_pair(now);
    }

    /// Record a position fix for later nearest-in-time lookup
    #[inline]
    pub fn push_position(&mut self, fix: PositionFix) {
        self.history.record(fix);
    }

    /// Form a candidate pair from the latest value of each stream
    ///
    /// Latest values persist across pairings: a fresh sample on one stream
    /// pairs with the sample already held for the other, so one sample can
    /// appear in several consecutive pairs.
    fn try_pair(&mut self, now: Instant) {
        let (Some(acceleration), Some(angular_velocity)) =
            (self.pending_acceleration, self.pending_angular_velocity)
        else {
            return;
        };

        let skew = (acceleration.timestamp_nanos - angular_velocity.timestamp_nanos).abs();
        if skew < self.max_skew_nanos {
            self.pairs.push_back(PairedMotion {
                arrived: now,
                acceleration,
                angular_velocity,
            });
        } else {
            self.rejected_count += 1;
            metrics::counter!("roadsync_window_pairs_rejected_total").increment(1);
            trace!(
                skew_nanos = skew,
                max_skew_nanos = self.max_skew_nanos,
                "candidate pair discarded for skew"
            );
        }
    }

    /// Cut the window ending at `now` and emit it
    ///
    /// `now_millis` is the wall-clock emission time; it stamps the combined
    /// sample and drives the position lookup. Returns `None` when no pair
    /// arrived within the window.
    #[instrument(
        level = "trace",
        name = "time_window_flush",
        skip(self, now),
        fields(pairs_buffered = self.pairs.len())
    )]
    pub fn flush(&mut self, now: Instant, now_millis: i64) -> Option<CombinedSample> {
        let window_start = now.checked_sub(self.span);

        let mut accelerations = Vec::new();
        let mut angular_velocities = Vec::new();
        for pair in self.pairs.iter().filter(|pair| {
            pair.arrived <= now && window_start.map_or(true, |start| pair.arrived > start)
        }) {
            accelerations.push(pair.acceleration);
            angular_velocities.push(pair.angular_velocity);
        }

        self.evict_unreachable(now);

        if accelerations.is_empty() {
            return None;
        }

        metrics::histogram!("roadsync_window_motion_samples", "policy" => "time_window")
            .record(accelerations.len() as f64);

        Some(CombinedSample {
            accelerations,
            angular_velocities,
            position: self.history.nearest(now_millis),
            distance_meters: None,
            emitted_at_millis: now_millis,
        })
    }

    /// Drop pairs no future window can cover
    ///
    /// The next flush happens at `now + skip` and reaches back `span`, so
    /// anything at or before `now + skip - span` is unreachable.
    fn evict_unreachable(&mut self, now: Instant) {
        let Some(deadline) = now
            .checked_add(self.skip)
            .and_then(|next| next.checked_sub(self.span))
        else {
            return;
        };

        while self
            .pairs
            .front()
            .is_some_and(|pair| pair.arrived <= deadline)
        {
            self.pairs.pop_front();
        }
    }

    /// Accepted pairs currently buffered
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Candidate pairs discarded for skew so far
    pub fn rejected_count(&self) -> u64 {
        self.rejected_count
    }

    /// Position fixes currently held in the history
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const MS: i64 = 1_000_000;

    fn make_accel(timestamp_nanos: i64) -> AccelerationSample {
        AccelerationSample {
            x: 1.0,
            y: 0.0,
            z: 9.8,
            timestamp_nanos,
        }
    }

    fn make_gyro(timestamp_nanos: i64) -> AngularVelocitySample {
        AngularVelocitySample {
            x: 0.0,
            y: 0.1,
            z: 0.0,
            timestamp_nanos,
        }
    }

    fn make_fix(timestamp_millis: i64) -> PositionFix {
        PositionFix {
            latitude: 40.0,
            longitude: -3.7,
            accuracy: 8.0,
            speed: 12.0,
            timestamp_millis,
        }
    }

    fn config(span_ms: f64, skip_ms: Option<f64>) -> TimeWindowConfig {
        TimeWindowConfig {
            time_span_ms: span_ms,
            time_skip_ms: skip_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_pair_below_skew_threshold_accepted() {
        let mut acc = TimeWindowAccumulator::new(&config(20.0, None));
        let base = Instant::now();

        // 5 ms of sensor-clock skew is inside the default 10 ms threshold
        acc.push_acceleration(make_accel(0), base);
        acc.push_angular_velocity(make_gyro(5 * MS), base);

        assert_eq!(acc.pair_count(), 1);
        assert_eq!(acc.rejected_count(), 0);

        let sample = acc
            .flush(base + Duration::from_millis(20), 1_000)
            .expect("window holds one pair");
        assert_eq!(sample.accelerations.len(), 1);
        assert_eq!(sample.angular_velocities.len(), 1);
        assert_eq!(sample.distance_meters, None);
        assert_eq!(sample.emitted_at_millis, 1_000);
    }

    #[test]
    fn test_pair_at_skew_threshold_rejected() {
        let mut acc = TimeWindowAccumulator::new(&config(20.0, None));
        let base = Instant::now();

        // Exactly 10 ms of skew: the threshold is strict
        acc.push_acceleration(make_accel(0), base);
        acc.push_angular_velocity(make_gyro(10 * MS), base);

        assert_eq!(acc.pair_count(), 0);
        assert_eq!(acc.rejected_count(), 1);
    }

    #[test]
    fn test_wide_skew_rejected_and_window_stays_empty() {
        let mut acc = TimeWindowAccumulator::new(&config(20.0, None));
        let base = Instant::now();

        // 20 ms of skew is far outside the threshold
        acc.push_acceleration(make_accel(0), base);
        acc.push_angular_velocity(make_gyro(20 * MS), base);

        assert_eq!(acc.pair_count(), 0);
        // An empty window is not emitted
        assert!(acc.flush(base + Duration::from_millis(20), 1_000).is_none());
    }

    #[test]
    fn test_combine_latest_reuses_held_sample() {
        let mut acc = TimeWindowAccumulator::new(&config(20.0, None));
        let base = Instant::now();

        acc.push_acceleration(make_accel(0), base);
        acc.push_angular_velocity(make_gyro(MS), base + Duration::from_millis(1));
        // A second gyro pairs with the still-held acceleration
        acc.push_angular_velocity(make_gyro(2 * MS), base + Duration::from_millis(2));

        assert_eq!(acc.pair_count(), 2);

        let sample = acc
            .flush(base + Duration::from_millis(20), 1_000)
            .expect("two pairs in window");
        assert_eq!(sample.accelerations.len(), 2);
        assert_eq!(sample.angular_velocities.len(), 2);

        // Strict index alignment: both pairs reuse the same acceleration
        assert_eq!(sample.accelerations[0], sample.accelerations[1]);
        assert_eq!(sample.angular_velocities[0].timestamp_nanos, MS);
        assert_eq!(sample.angular_velocities[1].timestamp_nanos, 2 * MS);
    }

    #[test]
    fn test_windows_disjoint_when_skip_equals_span() {
        let mut acc = TimeWindowAccumulator::new(&config(20.0, None));
        let base = Instant::now();

        acc.push_acceleration(make_accel(0), base + Duration::from_millis(5));
        acc.push_angular_velocity(make_gyro(MS), base + Duration::from_millis(5));
        // Boundary pair lands exactly on the first flush instant
        acc.push_acceleration(make_accel(19 * MS), base + Duration::from_millis(20));
        acc.push_angular_velocity(make_gyro(20 * MS), base + Duration::from_millis(20));

        let first = acc
            .flush(base + Duration::from_millis(20), 1_000)
            .expect("both pairs inside first window");
        assert_eq!(first.accelerations.len(), 2);

        // Nothing arrived after the first window: the second emits nothing
        assert!(acc.flush(base + Duration::from_millis(40), 1_020).is_none());
        assert_eq!(acc.pair_count(), 0);
    }

    #[test]
    fn test_windows_overlap_when_skip_below_span() {
        let mut acc = TimeWindowAccumulator::new(&config(20.0, Some(10.0)));
        let base = Instant::now();

        acc.push_acceleration(make_accel(0), base + Duration::from_millis(15));
        acc.push_angular_velocity(make_gyro(MS), base + Duration::from_millis(15));

        // Window (base, base+20] sees the pair
        let first = acc.flush(base + Duration::from_millis(20), 1_000);
        assert!(first.is_some());

        // Window (base+10, base+30] sees the same pair again
        let second = acc.flush(base + Duration::from_millis(30), 1_010);
        assert!(second.is_some());

        // Window (base+20, base+40] no longer covers it
        assert!(acc.flush(base + Duration::from_millis(40), 1_020).is_none());
    }

    #[test]
    fn test_gap_drops_samples_when_skip_above_span() {
        let mut acc = TimeWindowAccumulator::new(&config(20.0, Some(40.0)));
        let base = Instant::now();

        // Arrives after the first flush, before the second window opens
        acc.push_acceleration(make_accel(25 * MS), base + Duration::from_millis(25));
        acc.push_angular_velocity(make_gyro(26 * MS), base + Duration::from_millis(25));

        // First window (base, base+20] predates the pair
        assert!(acc.flush(base + Duration::from_millis(20), 1_000).is_none());
        // Second window (base+40, base+60] starts after it: the pair is lost
        assert!(acc.flush(base + Duration::from_millis(60), 1_040).is_none());
        assert_eq!(acc.pair_count(), 0);
    }

    #[test]
    fn test_position_attached_from_nearest_fix() {
        let mut acc = TimeWindowAccumulator::new(&config(20.0, None));
        let base = Instant::now();

        acc.push_position(make_fix(1_000));
        acc.push_position(make_fix(2_000));
        acc.push_acceleration(make_accel(0), base + Duration::from_millis(5));
        acc.push_angular_velocity(make_gyro(MS), base + Duration::from_millis(5));

        let sample = acc
            .flush(base + Duration::from_millis(20), 1_400)
            .expect("one pair in window");
        let position = sample.position.expect("history is non-empty");
        assert_eq!(position.timestamp_millis, 1_000);
    }

    #[test]
    fn test_flush_without_any_position_history() {
        let mut acc = TimeWindowAccumulator::new(&config(20.0, None));
        let base = Instant::now();

        acc.push_acceleration(make_accel(0), base + Duration::from_millis(5));
        acc.push_angular_velocity(make_gyro(MS), base + Duration::from_millis(5));

        let sample = acc
            .flush(base + Duration::from_millis(20), 1_000)
            .expect("pair emitted");
        assert!(sample.position.is_none());
    }

    #[test]
    fn test_lone_stream_never_pairs() {
        let mut acc = TimeWindowAccumulator::new(&config(20.0, None));
        let base = Instant::now();

        for i in 0..10 {
            acc.push_acceleration(make_accel(i * MS), base + Duration::from_millis(i as u64));
        }

        assert_eq!(acc.pair_count(), 0);
        assert!(acc.flush(base + Duration::from_millis(20), 1_000).is_none());
    }
}
