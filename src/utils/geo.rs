const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates (Haversine formula).
/// Returns kilometers. Used whenever routed distance is unavailable.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Whether a point lies within `max_radius_km` of a reference point.
/// Group search uses this to match destinations.
pub fn is_within_radius(lat: f64, lng: f64, ref_lat: f64, ref_lng: f64, max_radius_km: f64) -> bool {
    haversine_distance(lat, lng, ref_lat, ref_lng) <= max_radius_km
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_delhi_noida() {
        // Connaught Place to Noida, roughly 20 km apart.
        let distance = haversine_distance(28.6139, 77.2090, 28.5355, 77.3910);
        assert!(distance > 18.0 && distance < 22.0, "got {}", distance);
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        let distance = haversine_distance(51.5074, -0.1278, 51.5074, -0.1278);
        assert!(distance.abs() < 1e-9);
    }

    #[test]
    fn test_haversine_symmetry() {
        let ab = haversine_distance(28.6139, 77.2090, 28.5355, 77.3910);
        let ba = haversine_distance(28.5355, 77.3910, 28.6139, 77.2090);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_within_radius() {
        let center = (28.6139, 77.2090);
        let nearby = (28.62, 77.21);
        assert!(is_within_radius(nearby.0, nearby.1, center.0, center.1, 3.0));

        let far = (28.5355, 77.3910);
        assert!(!is_within_radius(far.0, far.1, center.0, center.1, 3.0));
    }
}
