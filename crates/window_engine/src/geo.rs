//! Great-circle distance between position fixes.

use contracts::PositionFix;

/// Mean Earth radius in meters (IUGG)
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two fixes, in meters
///
/// Treats fixes as points on a sphere; accuracy and altitude are ignored.
/// Good to well under a meter at stretch-length scales, which is far below
/// typical fix accuracy anyway.
pub fn haversine_distance(from: &PositionFix, to: &PositionFix) -> f64 {
    let lat_from = from.latitude.to_radians();
    let lat_to = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat_from.cos() * lat_to.cos() * (delta_lon / 2.0).sin().powi(2);
    // Clamp under the sqrt: rounding can push (1 - a) slightly negative
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(latitude: f64, longitude: f64) -> PositionFix {
        PositionFix {
            latitude,
            longitude,
            accuracy: 5.0,
            speed: 0.0,
            timestamp_millis: 0,
        }
    }

    #[test]
    fn test_identical_fixes_zero_distance() {
        let a = fix(52.52, 13.405);
        assert_eq!(haversine_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_small_longitude_step_at_equator() {
        // 0.0002 degrees of longitude at the equator is just over 22 meters
        let a = fix(0.0, 0.0);
        let b = fix(0.0, 0.0002);
        let d = haversine_distance(&a, &b);
        assert!((d - 22.239).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = fix(48.8566, 2.3522);
        let b = fix(48.8584, 2.2945);
        let forward = haversine_distance(&a, &b);
        let backward = haversine_distance(&b, &a);
        assert!((forward - backward).abs() < 1e-9);
    }

    #[test]
    fn test_one_degree_longitude_at_equator() {
        let a = fix(0.0, 0.0);
        let b = fix(0.0, 1.0);
        let d = haversine_distance(&a, &b);
        // One degree of arc on the mean sphere is ~111.19 km
        assert!((d - 111_195.0).abs() < 10.0, "got {d}");
    }
}
