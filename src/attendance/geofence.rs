use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::AttendanceError;

/// Mean earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A validated WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = 12.9716)]
    pub latitude: f64,
    #[schema(example = 77.5946)]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AttendanceError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(AttendanceError::validation(
                "Coordinates must be finite numbers",
            ));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(AttendanceError::validation(format!(
                "Latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(AttendanceError::validation(format!(
                "Longitude {longitude} is outside [-180, 180]"
            )));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parses raw coordinate strings as submitted by a client.
    ///
    /// Both values absent (or blank) means the location is unknown and yields
    /// `Ok(None)`; a missing GPS fix is never coerced to `(0, 0)`.
    pub fn parse(lat: Option<&str>, lng: Option<&str>) -> Result<Option<Self>, AttendanceError> {
        let lat = lat.map(str::trim).filter(|s| !s.is_empty());
        let lng = lng.map(str::trim).filter(|s| !s.is_empty());

        match (lat, lng) {
            (None, None) => Ok(None),
            (Some(lat), Some(lng)) => {
                let latitude = lat
                    .parse::<f64>()
                    .map_err(|_| AttendanceError::validation(format!("Invalid latitude: {lat}")))?;
                let longitude = lng
                    .parse::<f64>()
                    .map_err(|_| AttendanceError::validation(format!("Invalid longitude: {lng}")))?;

                Self::new(latitude, longitude).map(Some)
            }
            _ => Err(AttendanceError::validation(
                "Latitude and longitude must be supplied together",
            )),
        }
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Great-circle distance in meters between two points given in degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    // rounding can push `a` a hair above 1 for antipodal points
    2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
}

/// True iff the point lies within `radius_meters` of the office.
///
/// Callers must reject non-finite input first; NaN compares false here.
pub fn is_within_fence(
    point_lat: f64,
    point_lon: f64,
    office_lat: f64,
    office_lon: f64,
    radius_meters: f64,
) -> bool {
    haversine_distance(point_lat, point_lon, office_lat, office_lon) <= radius_meters
}

/// The admin-editable office geo-fence (singleton settings row).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct GeoFenceConfig {
    #[sqlx(rename = "office_lat")]
    #[schema(example = 12.9716)]
    pub office_latitude: f64,

    #[sqlx(rename = "office_lng")]
    #[schema(example = 77.5946)]
    pub office_longitude: f64,

    #[sqlx(rename = "radius")]
    #[schema(example = 200.0)]
    pub radius_meters: f64,
}

impl GeoFenceConfig {
    pub fn new(
        office_latitude: f64,
        office_longitude: f64,
        radius_meters: f64,
    ) -> Result<Self, AttendanceError> {
        let config = Self {
            office_latitude,
            office_longitude,
            radius_meters,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AttendanceError> {
        GeoPoint::new(self.office_latitude, self.office_longitude)?;

        if !self.radius_meters.is_finite() || self.radius_meters < 0.0 {
            return Err(AttendanceError::validation(
                "Radius must be a non-negative number of meters",
            ));
        }
        Ok(())
    }

    pub fn office(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.office_latitude,
            longitude: self.office_longitude,
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        is_within_fence(
            point.latitude,
            point.longitude,
            self.office_latitude,
            self.office_longitude,
            self.radius_meters,
        )
    }
}

/// Where an attendance event happened relative to the fence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ZoneStatus {
    /// No location was captured.
    Unknown,
    Inside,
    Outside,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const OFFICE: (f64, f64) = (12.9716, 77.5946);

    #[rstest]
    #[case(0.0)]
    #[case(1.0)]
    #[case(200.0)]
    #[case(1_000_000.0)]
    fn test_office_point_is_always_inside(#[case] radius: f64) {
        assert!(is_within_fence(OFFICE.0, OFFICE.1, OFFICE.0, OFFICE.1, radius));
    }

    #[rstest]
    #[case((13.0, 77.5946))]
    #[case((12.9720, 77.5950))]
    #[case((-33.8688, 151.2093))]
    fn test_fence_is_monotonic_in_radius(#[case] point: (f64, f64)) {
        let radii = [0.0, 10.0, 100.0, 1_000.0, 10_000.0, 100_000.0, 20_000_000.0];
        let mut seen_inside = false;

        for r in radii {
            let inside = is_within_fence(point.0, point.1, OFFICE.0, OFFICE.1, r);
            if seen_inside {
                assert!(inside, "point left the fence when radius grew to {r}");
            }
            seen_inside |= inside;
        }
        assert!(seen_inside);
    }

    #[rstest]
    #[case((12.9716, 77.5946), (13.0, 77.5946))]
    #[case((51.5074, -0.1278), (40.7128, -74.0060))]
    #[case((-89.9, 10.0), (89.9, -170.0))]
    fn test_distance_is_symmetric(#[case] a: (f64, f64), #[case] b: (f64, f64)) {
        let ab = haversine_distance(a.0, a.1, b.0, b.1);
        let ba = haversine_distance(b.0, b.1, a.0, a.1);
        assert!((ab - ba).abs() < 1e-6, "{ab} != {ba}");
    }

    #[test]
    fn test_one_degree_of_longitude_on_equator() {
        let d = haversine_distance(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_194.93).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_antipodal_points_do_not_produce_nan() {
        let d = haversine_distance(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_METERS).abs() < 1.0);
    }

    #[test]
    fn test_scenario_three_km_north_is_outside_200m() {
        let fence = GeoFenceConfig::new(OFFICE.0, OFFICE.1, 200.0).unwrap();

        let at_office = GeoPoint::new(12.9716, 77.5946).unwrap();
        let north = GeoPoint::new(13.0, 77.5946).unwrap();

        assert!(fence.contains(&at_office));
        assert!(!fence.contains(&north));

        let d = north.distance_to(&fence.office());
        assert!((3_100.0..3_200.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_nan_never_counts_as_inside() {
        assert!(!is_within_fence(f64::NAN, 0.0, 0.0, 0.0, 1_000.0));
    }

    #[test]
    fn test_parse_absent_location_is_unknown() {
        assert_eq!(GeoPoint::parse(None, None).unwrap(), None);
        assert_eq!(GeoPoint::parse(Some(""), Some("  ")).unwrap(), None);
    }

    #[test]
    fn test_parse_valid_strings() {
        let p = GeoPoint::parse(Some(" 12.9716 "), Some("77.5946")).unwrap().unwrap();
        assert_eq!(p.latitude, 12.9716);
        assert_eq!(p.longitude, 77.5946);

        let edge = GeoPoint::parse(Some("-90"), Some("180")).unwrap();
        assert!(edge.is_some());
    }

    #[rstest]
    #[case(Some("12.9"), None)]
    #[case(None, Some("77.5"))]
    #[case(Some("north"), Some("77.5"))]
    #[case(Some("NaN"), Some("77.5"))]
    #[case(Some("12.9"), Some("inf"))]
    #[case(Some("90.0001"), Some("0"))]
    #[case(Some("0"), Some("-180.5"))]
    fn test_parse_rejects_bad_input(#[case] lat: Option<&str>, #[case] lng: Option<&str>) {
        let result = GeoPoint::parse(lat, lng);
        assert!(
            matches!(result, Err(AttendanceError::Validation(_))),
            "expected validation error for {lat:?}/{lng:?}, got {result:?}"
        );
    }

    #[test]
    fn test_fence_rejects_negative_radius() {
        assert!(GeoFenceConfig::new(0.0, 0.0, -1.0).is_err());
        assert!(GeoFenceConfig::new(0.0, 0.0, f64::INFINITY).is_err());
        assert!(GeoFenceConfig::new(95.0, 0.0, 10.0).is_err());
        assert!(GeoFenceConfig::new(0.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn test_zone_status_strings() {
        assert_eq!(ZoneStatus::Outside.to_string(), "outside");
        assert_eq!("unknown".parse::<ZoneStatus>().unwrap(), ZoneStatus::Unknown);
    }
}
