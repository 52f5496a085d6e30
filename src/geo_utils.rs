//! Geographic utilities for route geometry.

use geo::{Distance, Haversine, Point};

use crate::GpsPoint;

/// Calculate haversine distance between two GPS points in meters
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Total length of a polyline in meters.
pub fn path_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is roughly 111 km
        let d = haversine_distance(&GpsPoint::new(0.0, 0.0), &GpsPoint::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 500.0, "got {}", d);
    }

    #[test]
    fn test_path_length() {
        assert_eq!(path_length(&[]), 0.0);
        assert_eq!(path_length(&[GpsPoint::new(25.0, 121.0)]), 0.0);

        let a = GpsPoint::new(25.03, 121.56);
        let b = GpsPoint::new(25.04, 121.58);
        let c = GpsPoint::new(25.05, 121.60);
        let total = path_length(&[a, b, c]);
        let expected = haversine_distance(&a, &b) + haversine_distance(&b, &c);
        assert!((total - expected).abs() < 1e-6);
    }
}
