use crate::models::{BoundingBox, Coordinates};

/// Earth's radius in miles
const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Approximate miles per degree of latitude
const MILES_PER_DEGREE: f64 = 69.0;

/// Calculate the Haversine distance between two points in miles
///
/// The result is rounded to 2 decimal places. NaN coordinates produce a NaN
/// distance, so callers must validate input first.
#[inline]
pub fn haversine_distance(a: Coordinates, b: Coordinates) -> f64 {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lng = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    round_to(EARTH_RADIUS_MILES * c, 2)
}

/// Calculate a bounding box around a center point
///
/// Cheap pre-filter only: the box always contains the full circle but also
/// its corners, so candidates must be re-checked with [`haversine_distance`].
/// 1° latitude ≈ 69 miles, 1° longitude ≈ 69 miles * cos(latitude)
pub fn calculate_bounding_box(center: Coordinates, radius_miles: f64) -> BoundingBox {
    let lat_delta = radius_miles / MILES_PER_DEGREE;

    // Meridians converge towards the poles
    let lng_delta = radius_miles / (MILES_PER_DEGREE * center.latitude.to_radians().cos().abs());

    let (min_lng, max_lng) = (center.longitude - lng_delta, center.longitude + lng_delta);

    // Near a pole or across the antimeridian every longitude is a candidate
    let (min_lng, max_lng) = if lng_delta.is_infinite() || min_lng < -180.0 || max_lng > 180.0 {
        (-180.0, 180.0)
    } else {
        (min_lng, max_lng)
    };

    BoundingBox {
        min_lat: center.latitude - lat_delta,
        max_lat: center.latitude + lat_delta,
        min_lng,
        max_lng,
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(point: Coordinates, bbox: &BoundingBox) -> bool {
    point.latitude >= bbox.min_lat
        && point.latitude <= bbox.max_lat
        && point.longitude >= bbox.min_lng
        && point.longitude <= bbox.max_lng
}

#[inline]
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
