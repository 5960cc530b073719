//! Great-circle distance math for the geo-impossible rule.

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Last known location of a user, as stored in the warm state store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastLocation {
    pub lat: f64,
    pub lon: f64,
    /// Epoch seconds of the observation.
    pub ts: i64,
}

/// Haversine distance between two points, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}
