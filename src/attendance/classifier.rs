use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::geofence::{GeoFenceConfig, GeoPoint, ZoneStatus};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

/// Zone verdicts for both ends of an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ZoneClassification {
    pub check_in_zone: ZoneStatus,
    pub check_out_zone: ZoneStatus,
    pub is_outside_zone: bool,
}

pub fn zone_of(location: Option<&GeoPoint>, fence: &GeoFenceConfig) -> ZoneStatus {
    match location {
        None => ZoneStatus::Unknown,
        Some(point) if fence.contains(point) => ZoneStatus::Inside,
        Some(_) => ZoneStatus::Outside,
    }
}

/// A record is outside the zone if either captured location is outside.
/// Unknown locations never raise the flag.
pub fn classify(
    in_location: Option<&GeoPoint>,
    out_location: Option<&GeoPoint>,
    fence: &GeoFenceConfig,
) -> ZoneClassification {
    let check_in_zone = zone_of(in_location, fence);
    let check_out_zone = zone_of(out_location, fence);

    ZoneClassification {
        check_in_zone,
        check_out_zone,
        is_outside_zone: check_in_zone == ZoneStatus::Outside
            || check_out_zone == ZoneStatus::Outside,
    }
}

/// Status stamped on a record when its check-in is written.
pub fn status_on_check_in() -> AttendanceStatus {
    AttendanceStatus::Present
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fence() -> GeoFenceConfig {
        GeoFenceConfig::new(12.9716, 77.5946, 200.0).unwrap()
    }

    fn office() -> GeoPoint {
        GeoPoint::new(12.9716, 77.5946).unwrap()
    }

    fn far() -> GeoPoint {
        GeoPoint::new(13.0, 77.5946).unwrap()
    }

    #[test]
    fn test_check_in_at_office_is_not_outside() {
        let c = classify(Some(&office()), None, &fence());
        assert_eq!(c.check_in_zone, ZoneStatus::Inside);
        assert_eq!(c.check_out_zone, ZoneStatus::Unknown);
        assert!(!c.is_outside_zone);
    }

    #[test]
    fn test_check_in_three_km_away_is_outside() {
        let c = classify(Some(&far()), None, &fence());
        assert_eq!(c.check_in_zone, ZoneStatus::Outside);
        assert!(c.is_outside_zone);
    }

    #[test]
    fn test_outside_checkout_flags_record() {
        let c = classify(Some(&office()), Some(&far()), &fence());
        assert_eq!(c.check_in_zone, ZoneStatus::Inside);
        assert_eq!(c.check_out_zone, ZoneStatus::Outside);
        assert!(c.is_outside_zone);
    }

    #[test]
    fn test_unknown_locations_do_not_flag() {
        let c = classify(None, None, &fence());
        assert_eq!(c.check_in_zone, ZoneStatus::Unknown);
        assert_eq!(c.check_out_zone, ZoneStatus::Unknown);
        assert!(!c.is_outside_zone);
    }

    #[test]
    fn test_missing_gps_is_not_treated_as_null_island() {
        // (0, 0) would be thousands of km away from the office
        let c = classify(None, Some(&office()), &fence());
        assert!(!c.is_outside_zone);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(status_on_check_in(), AttendanceStatus::Present);
        assert_eq!(AttendanceStatus::Absent.as_ref(), "absent");
        assert_eq!("present".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Present);
    }
}
