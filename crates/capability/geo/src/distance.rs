//! 球面距离与检索包围盒。

use domain::GeoPoint;
use geo::{HaversineDistance, Point};

/// 包围盒换算用的地球半径（米）。
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

fn to_point(point: &GeoPoint) -> Point<f64> {
    Point::new(point.longitude, point.latitude)
}

/// 两点间大圆距离（米）。
#[inline]
pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    to_point(a).haversine_distance(&to_point(b))
}

/// 覆盖以 `center` 为圆心、`radius_m` 为半径的球冠的经纬度包围盒
/// `([min_lon, min_lat], [max_lon, max_lat])`。
///
/// 跨越极点或反子午线时返回 `None`，调用方改为全量扫描。
pub fn bounding_box(center: &GeoPoint, radius_m: f64) -> Option<([f64; 2], [f64; 2])> {
    let angular = radius_m / EARTH_RADIUS_M;
    if angular >= std::f64::consts::PI {
        return None;
    }
    // 浮点余量，避免边界上的点被粗筛漏掉。
    let margin = 1e-9;
    let dlat = angular.to_degrees() + margin;
    let min_lat = center.latitude - dlat;
    let max_lat = center.latitude + dlat;
    if min_lat <= -90.0 || max_lat >= 90.0 {
        return None;
    }
    let ratio = angular.sin() / center.latitude.to_radians().cos();
    if ratio >= 1.0 {
        return None;
    }
    let dlon = ratio.asin().to_degrees() + margin;
    let min_lon = center.longitude - dlon;
    let max_lon = center.longitude + dlon;
    if min_lon < -180.0 || max_lon > 180.0 {
        return None;
    }
    Some(([min_lon, min_lat], [max_lon, max_lat]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_metres_north() {
        let origin = GeoPoint::new(-23.5505, -46.6333);
        let north = GeoPoint::new(-23.55041, -46.6333);
        let d = haversine_m(&origin, &north);
        assert!((d - 10.0).abs() < 0.05, "distance {d}");
    }

    #[test]
    fn box_contains_radius() {
        let origin = GeoPoint::new(-23.5505, -46.6333);
        let (min, max) = bounding_box(&origin, 500.0).expect("box");
        assert!(min[1] < -23.5505 && max[1] > -23.5505);
        assert!(max[1] - min[1] > 0.0089 && max[1] - min[1] < 0.0091);
    }

    #[test]
    fn antimeridian_falls_back() {
        let origin = GeoPoint::new(0.0, 179.9999);
        assert!(bounding_box(&origin, 1_000.0).is_none());
        let pole = GeoPoint::new(89.9999, 0.0);
        assert!(bounding_box(&pole, 1_000.0).is_none());
    }
}
