//! CombinedSample - Window Engine output
//!
//! Unified output sample structure.

use serde::{Deserialize, Serialize};

use crate::{AccelerationSample, AngularVelocitySample, PositionFix};

/// Combined sample
///
/// One window's worth of aligned motion data with optional position context.
/// Immutable after creation: aggregators build a fresh value per emission and
/// never hand out buffers they keep writing to.
///
/// Pairing depends on the producing policy:
/// - stretch windows fill `accelerations` and `angular_velocities`
///   independently (lengths may differ, no per-index relation) and set
///   `distance_meters` to the accumulated stretch length;
/// - time windows emit strictly paired sequences (equal length, element `i`
///   of one belongs with element `i` of the other) and leave
///   `distance_meters` as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedSample {
    /// Acceleration samples observed in the window
    pub accelerations: Vec<AccelerationSample>,

    /// Angular velocity samples observed in the window
    pub angular_velocities: Vec<AngularVelocitySample>,

    /// Position context (stretch: window start fix; time: nearest fix at emission)
    pub position: Option<PositionFix>,

    /// Accumulated great-circle distance in meters (stretch windows only)
    pub distance_meters: Option<f64>,

    /// Emission timestamp (epoch milliseconds)
    pub emitted_at_millis: i64,
}

impl CombinedSample {
    /// Number of motion samples carried (max of the two sequences)
    pub fn motion_len(&self) -> usize {
        self.accelerations.len().max(self.angular_velocities.len())
    }

    /// Whether the window carried no motion data at all
    pub fn is_silent(&self) -> bool {
        self.accelerations.is_empty() && self.angular_velocities.is_empty()
    }
}
