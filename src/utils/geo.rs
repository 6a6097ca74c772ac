/// Calculate distance between two coordinates using Haversine formula
/// Returns distance in kilometers
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Check if a service location falls within the requested search radius
pub fn is_within_radius(
    lat: f64,
    lng: f64,
    center_lat: f64,
    center_lng: f64,
    max_radius_km: f64,
) -> bool {
    haversine_distance(lat, lng, center_lat, center_lng) <= max_radius_km
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_london_paris() {
        let london = (51.5074, -0.1278);
        let paris = (48.8566, 2.3522);

        let distance = haversine_distance(london.0, london.1, paris.0, paris.1);
        // Should be approximately 340-350 km
        assert!(distance > 330.0 && distance < 360.0);
    }

    #[test]
    fn test_within_radius() {
        let center = (51.5074, -0.1278); // London
        let nearby = (51.51, -0.13);     // Very close to center

        assert!(is_within_radius(nearby.0, nearby.1, center.0, center.1, 5.0));

        let far = (48.8566, 2.3522);     // Paris
        assert!(!is_within_radius(far.0, far.1, center.0, center.1, 5.0));
    }
}
