//! Stretch window accumulator: distance-based window segmentation.

use std::mem;

use contracts::{
    AccelerationSample, AngularVelocitySample, CombinedSample, PositionFix, StretchWindowConfig,
};
use tracing::{debug, instrument, trace};

use crate::geo::haversine_distance;

/// Accumulates motion samples until the vehicle has covered a stretch
///
/// Motion samples are buffered as they arrive. Every position fix extends
/// the current stretch by the great-circle distance from the previous fix;
/// once the accumulated distance strictly exceeds the configured minimum,
/// one [`CombinedSample`] is emitted and the accumulator fully resets.
///
/// A stretch with no motion samples is still a valid emission (silent
/// stretch), and fixes that do not move the vehicle accumulate nothing.
#[derive(Debug)]
pub struct StretchAccumulator {
    /// Emission threshold in meters (strictly exceeded)
    min_stretch_length_m: f64,
    /// Motion buffered since the stretch started
    accelerations: Vec<AccelerationSample>,
    /// Motion buffered since the stretch started
    angular_velocities: Vec<AngularVelocitySample>,
    /// First fix of the current stretch
    start_fix: Option<PositionFix>,
    /// Most recent fix, distance is accumulated leg by leg
    last_fix: Option<PositionFix>,
    /// Distance covered so far in meters
    accumulated_m: f64,
    /// Stretches emitted so far
    emitted_count: u64,
}

impl StretchAccumulator {
    /// Create a new accumulator with the given configuration
    pub fn new(config: &StretchWindowConfig) -> Self {
        Self {
            min_stretch_length_m: config.min_stretch_length_m,
            accelerations: Vec::new(),
            angular_velocities: Vec::new(),
            start_fix: None,
            last_fix: None,
            accumulated_m: 0.0,
            emitted_count: 0,
        }
    }

    /// Buffer an acceleration sample for the current stretch
    #[inline]
    pub fn push_acceleration(&mut self, sample: AccelerationSample) {
        self.accelerations.push(sample);
    }

    /// Buffer an angular velocity sample for the current stretch
    #[inline]
    pub fn push_angular_velocity(&mut self, sample: AngularVelocitySample) {
        self.angular_velocities.push(sample);
    }

    /// Advance the stretch with a new position fix
    ///
    /// Returns `Some(CombinedSample)` when the accumulated distance strictly
    /// exceeds the minimum stretch length. The emitted sample carries the
    /// stretch's start fix as position and the start fix's wall-clock
    /// timestamp as emission time.
    #[instrument(
        level = "trace",
        name = "stretch_push_position",
        skip(self, fix),
        fields(timestamp_millis = fix.timestamp_millis)
    )]
    pub fn push_position(&mut self, fix: PositionFix) -> Option<CombinedSample> {
        let Some(previous) = self.last_fix else {
            // First fix opens the stretch
            self.start_fix = Some(fix);
            self.last_fix = Some(fix);
            return None;
        };

        self.accumulated_m += haversine_distance(&previous, &fix);
        self.last_fix = Some(fix);

        trace!(
            accumulated_m = self.accumulated_m,
            threshold_m = self.min_stretch_length_m,
            "stretch extended"
        );

        if self.accumulated_m > self.min_stretch_length_m {
            Some(self.emit())
        } else {
            None
        }
    }

    /// Build the combined sample for the finished stretch and reset
    fn emit(&mut self) -> CombinedSample {
        // start_fix is always set once last_fix is
        let start = self.start_fix.take();
        let distance = self.accumulated_m;

        let sample = CombinedSample {
            accelerations: mem::take(&mut self.accelerations),
            angular_velocities: mem::take(&mut self.angular_velocities),
            position: start,
            distance_meters: Some(distance),
            emitted_at_millis: start.map(|fix| fix.timestamp_millis).unwrap_or_default(),
        };

        // Full reset: the next fix opens a fresh stretch
        self.last_fix = None;
        self.accumulated_m = 0.0;
        self.emitted_count += 1;

        metrics::histogram!("roadsync_window_stretch_distance_m").record(distance);
        metrics::histogram!("roadsync_window_motion_samples", "policy" => "stretch")
            .record(sample.motion_len() as f64);

        debug!(
            distance_m = distance,
            accelerations = sample.accelerations.len(),
            angular_velocities = sample.angular_velocities.len(),
            emitted_count = self.emitted_count,
            "stretch window emitted"
        );

        sample
    }

    /// Distance covered in the current stretch, in meters
    pub fn accumulated_meters(&self) -> f64 {
        self.accumulated_m
    }

    /// Number of motion samples buffered for the current stretch
    pub fn buffered_motion(&self) -> usize {
        self.accelerations.len() + self.angular_velocities.len()
    }

    /// Number of stretches emitted so far
    pub fn emitted_count(&self) -> u64 {
        self.emitted_count
    }
}
