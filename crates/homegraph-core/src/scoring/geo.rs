//! Great-circle distance and proximity scoring

use crate::records::GeoPoint;

/// Mean Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance between two points, in kilometers.
///
/// Coordinates are range-checked at `GeoPoint` construction, so this
/// function is total over its inputs.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Linear-decay proximity score: 1.0 at zero distance, 0.0 at or beyond
/// `max_km`.
pub fn proximity_score(distance_km: f64, max_km: f64) -> f64 {
    if max_km <= 0.0 || distance_km >= max_km {
        return 0.0;
    }
    (1.0 - distance_km / max_km).clamp(0.0, 1.0)
}
