use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;
use strum_macros::{Display, EnumString};
use tracing::{info, instrument, warn};

use super::classifier::{classify, status_on_check_in, zone_of};
use super::geofence::{GeoPoint, ZoneStatus};
use super::store::{
    AttendanceFilter, AttendancePage, AttendanceRecord, AttendanceStore, CheckOutPatch,
    GeoFenceSource, NewCheckIn, OpenOutcome,
};
use crate::error::AttendanceError;

/// What a check-in does when the employee already has an open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OpenSessionPolicy {
    /// Reject with a conflict.
    #[default]
    Strict,
    /// Legacy behavior: insert another open record anyway.
    Permissive,
}

/// What a check-out does when there is no open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MissingSessionPolicy {
    /// Fail with not-found.
    #[default]
    Strict,
    /// Legacy behavior: report success without touching anything.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionPolicy {
    pub open_sessions: OpenSessionPolicy,
    pub missing_session: MissingSessionPolicy,
}

impl SessionPolicy {
    pub fn legacy() -> Self {
        Self {
            open_sessions: OpenSessionPolicy::Permissive,
            missing_session: MissingSessionPolicy::Lenient,
        }
    }
}

/// A single check-in or check-out as captured by the caller.
#[derive(Debug, Clone)]
pub struct AttendanceEvent {
    pub at: NaiveDateTime,
    pub location: Option<GeoPoint>,
    pub selfie: Option<String>,
}

impl AttendanceEvent {
    /// Stamped in UTC so wall-clock shifts never reorder check-in and check-out.
    pub fn now(location: Option<GeoPoint>, selfie: Option<String>) -> Self {
        Self {
            at: Utc::now().naive_utc(),
            location,
            selfie,
        }
    }
}

#[derive(Debug)]
pub struct CheckInReceipt {
    pub record: AttendanceRecord,
    pub zone: ZoneStatus,
}

#[derive(Debug)]
pub enum CheckOutOutcome {
    Closed {
        record: AttendanceRecord,
        zone: ZoneStatus,
    },
    /// Only produced under `MissingSessionPolicy::Lenient`.
    NoOpenSession,
}

/// Owns the open/closed lifecycle of an employee's attendance records.
///
/// The employee id is always passed in explicitly by the caller, who must
/// have derived it from an authenticated identity.
pub struct AttendanceTracker {
    store: Arc<dyn AttendanceStore>,
    fence: Arc<dyn GeoFenceSource>,
    policy: SessionPolicy,
}

impl AttendanceTracker {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        fence: Arc<dyn GeoFenceSource>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            store,
            fence,
            policy,
        }
    }

    #[instrument(name = "attendance_check_in", skip(self, event), fields(at = %event.at))]
    pub async fn check_in(
        &self,
        employee_id: u64,
        event: AttendanceEvent,
    ) -> Result<CheckInReceipt, AttendanceError> {
        let fence = self.fence.current().await?;
        // no check-out yet, so the record's flag is the check-in verdict alone
        let zones = classify(event.location.as_ref(), None, &fence);
        let zone = zones.check_in_zone;

        let new = NewCheckIn {
            employee_id,
            at: event.at,
            location: event.location,
            selfie: event.selfie,
            status: status_on_check_in(),
            is_outside_zone: zones.is_outside_zone,
        };

        let exclusive = self.policy.open_sessions == OpenSessionPolicy::Strict;

        match self.store.open_session(new, exclusive).await? {
            OpenOutcome::Opened(record) => {
                info!(record_id = record.id, %zone, "Checked in");
                Ok(CheckInReceipt { record, zone })
            }
            OpenOutcome::AlreadyOpen(open) => {
                warn!(record_id = open.id, "Check-in rejected: session already open");
                Err(AttendanceError::Conflict(format!(
                    "An attendance session is already open since {}",
                    open.check_in
                )))
            }
        }
    }

    #[instrument(name = "attendance_check_out", skip(self, event), fields(at = %event.at))]
    pub async fn check_out(
        &self,
        employee_id: u64,
        event: AttendanceEvent,
    ) -> Result<CheckOutOutcome, AttendanceError> {
        let fence = self.fence.current().await?;
        let zone = zone_of(event.location.as_ref(), &fence);

        let patch = CheckOutPatch {
            at: event.at,
            location: event.location,
            selfie: event.selfie,
            outside_zone: zone == ZoneStatus::Outside,
        };

        match self.store.close_latest_open(employee_id, patch).await? {
            Some(record) => {
                info!(record_id = record.id, %zone, "Checked out");
                Ok(CheckOutOutcome::Closed { record, zone })
            }
            None => match self.policy.missing_session {
                MissingSessionPolicy::Strict => Err(AttendanceError::NotFound(
                    "No open attendance session".to_string(),
                )),
                MissingSessionPolicy::Lenient => {
                    warn!("Check-out without an open session ignored");
                    Ok(CheckOutOutcome::NoOpenSession)
                }
            },
        }
    }

    pub async fn recent(
        &self,
        employee_id: u64,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        self.store.recent(employee_id, limit).await
    }

    pub async fn list(&self, filter: &AttendanceFilter) -> Result<AttendancePage, AttendanceError> {
        self.store.list(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::fake_store::FakeAttendanceStore;
    use crate::attendance::geofence::GeoFenceConfig;
    use chrono::{Duration, NaiveDate};
    use std::sync::atomic::Ordering;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn office() -> GeoPoint {
        GeoPoint::new(12.9716, 77.5946).unwrap()
    }

    fn far() -> GeoPoint {
        GeoPoint::new(13.0, 77.5946).unwrap()
    }

    fn tracker_with(policy: SessionPolicy) -> (AttendanceTracker, Arc<FakeAttendanceStore>) {
        let store = Arc::new(FakeAttendanceStore::default());
        let fence = Arc::new(GeoFenceConfig::new(12.9716, 77.5946, 200.0).unwrap());
        (
            AttendanceTracker::new(store.clone(), fence, policy),
            store,
        )
    }

    fn event(at: NaiveDateTime, location: Option<GeoPoint>) -> AttendanceEvent {
        AttendanceEvent {
            at,
            location,
            selfie: None,
        }
    }

    #[actix_web::test]
    async fn test_check_in_at_office_is_inside() {
        let (tracker, _) = tracker_with(SessionPolicy::default());

        let receipt = tracker.check_in(7, event(at(9, 0), Some(office()))).await.unwrap();

        assert_eq!(receipt.zone, ZoneStatus::Inside);
        assert!(!receipt.record.is_outside_zone);
        assert!(receipt.record.is_open());
        assert_eq!(receipt.record.status, Some(status_on_check_in()));
    }

    #[actix_web::test]
    async fn test_check_in_far_away_is_outside() {
        let (tracker, _) = tracker_with(SessionPolicy::default());

        let receipt = tracker.check_in(7, event(at(9, 0), Some(far()))).await.unwrap();

        assert_eq!(receipt.zone, ZoneStatus::Outside);
        assert!(receipt.record.is_outside_zone);
    }

    #[actix_web::test]
    async fn test_check_in_without_location_is_unknown_not_outside() {
        let (tracker, _) = tracker_with(SessionPolicy::default());

        let receipt = tracker.check_in(7, event(at(9, 0), None)).await.unwrap();

        assert_eq!(receipt.zone, ZoneStatus::Unknown);
        assert!(!receipt.record.is_outside_zone);
    }

    #[actix_web::test]
    async fn test_strict_policy_rejects_second_open_session() {
        let (tracker, store) = tracker_with(SessionPolicy::default());

        tracker.check_in(7, event(at(9, 0), None)).await.unwrap();
        let err = tracker.check_in(7, event(at(9, 5), None)).await.unwrap_err();

        assert!(matches!(err, AttendanceError::Conflict(_)), "got {err:?}");
        assert_eq!(store.open_count(7), 1);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[actix_web::test]
    async fn test_strict_policy_only_considers_same_employee() {
        let (tracker, store) = tracker_with(SessionPolicy::default());

        tracker.check_in(7, event(at(9, 0), None)).await.unwrap();
        tracker.check_in(8, event(at(9, 1), None)).await.unwrap();

        assert_eq!(store.open_count(7), 1);
        assert_eq!(store.open_count(8), 1);
    }

    #[actix_web::test]
    async fn test_permissive_policy_allows_multiple_open_sessions() {
        let (tracker, store) = tracker_with(SessionPolicy {
            open_sessions: OpenSessionPolicy::Permissive,
            ..SessionPolicy::default()
        });

        tracker.check_in(7, event(at(9, 0), None)).await.unwrap();
        tracker.check_in(7, event(at(9, 5), None)).await.unwrap();

        assert_eq!(store.open_count(7), 2);
    }

    #[actix_web::test]
    async fn test_check_out_without_session_is_not_found_when_strict() {
        let (tracker, store) = tracker_with(SessionPolicy::default());

        let err = tracker.check_out(7, event(at(17, 0), None)).await.unwrap_err();

        assert_eq!(
            err,
            AttendanceError::NotFound("No open attendance session".to_string())
        );
        assert!(store.snapshot().is_empty());
    }

    #[actix_web::test]
    async fn test_check_out_without_session_is_noop_when_lenient() {
        let (tracker, store) = tracker_with(SessionPolicy::legacy());

        let outcome = tracker.check_out(7, event(at(17, 0), None)).await.unwrap();

        assert!(matches!(outcome, CheckOutOutcome::NoOpenSession));
        assert!(store.snapshot().is_empty());
    }

    #[actix_web::test]
    async fn test_second_check_out_fails_after_first_closes() {
        let (tracker, _) = tracker_with(SessionPolicy::default());

        tracker.check_in(7, event(at(9, 0), None)).await.unwrap();

        let first = tracker.check_out(7, event(at(17, 0), None)).await.unwrap();
        assert!(matches!(first, CheckOutOutcome::Closed { .. }));

        let second = tracker.check_out(7, event(at(17, 1), None)).await.unwrap_err();
        assert!(matches!(second, AttendanceError::NotFound(_)));
    }

    #[actix_web::test]
    async fn test_round_trip_produces_one_closed_record() {
        let (tracker, store) = tracker_with(SessionPolicy::default());
        let check_in_at = at(9, 0);
        let check_out_at = check_in_at + Duration::seconds(1);

        tracker
            .check_in(7, event(check_in_at, Some(office())))
            .await
            .unwrap();
        tracker
            .check_out(7, event(check_out_at, Some(office())))
            .await
            .unwrap();

        let records = store.snapshot();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.check_in, check_in_at);
        let check_out = record.check_out.expect("check_out set");
        assert!(check_out > record.check_in);
        assert_eq!(record.out_location, Some(office()));
        assert!(!record.is_outside_zone);
    }

    #[actix_web::test]
    async fn test_outside_check_out_flags_inside_check_in() {
        let (tracker, _) = tracker_with(SessionPolicy::default());

        tracker.check_in(7, event(at(9, 0), Some(office()))).await.unwrap();
        let outcome = tracker
            .check_out(7, event(at(17, 0), Some(far())))
            .await
            .unwrap();

        let CheckOutOutcome::Closed { record, zone } = outcome else {
            panic!("expected a closed record");
        };
        assert_eq!(zone, ZoneStatus::Outside);
        assert!(record.is_outside_zone);
    }

    #[actix_web::test]
    async fn test_inside_check_out_keeps_outside_check_in_flag() {
        let (tracker, _) = tracker_with(SessionPolicy::default());

        tracker.check_in(7, event(at(9, 0), Some(far()))).await.unwrap();
        let outcome = tracker
            .check_out(7, event(at(17, 0), Some(office())))
            .await
            .unwrap();

        let CheckOutOutcome::Closed { record, zone } = outcome else {
            panic!("expected a closed record");
        };
        assert_eq!(zone, ZoneStatus::Inside);
        assert!(record.is_outside_zone);
    }

    #[actix_web::test]
    async fn test_check_out_closes_most_recent_open_record() {
        let (tracker, store) = tracker_with(SessionPolicy::legacy());

        tracker.check_in(7, event(at(8, 0), None)).await.unwrap();
        tracker.check_in(7, event(at(9, 0), None)).await.unwrap();
        tracker.check_out(7, event(at(17, 0), None)).await.unwrap();

        let records = store.snapshot();
        assert!(records[0].is_open());
        assert!(!records[1].is_open());
    }

    #[actix_web::test]
    async fn test_selfie_reference_is_passed_through() {
        let (tracker, _) = tracker_with(SessionPolicy::default());

        let receipt = tracker
            .check_in(
                7,
                AttendanceEvent {
                    at: at(9, 0),
                    location: None,
                    selfie: Some("in_1_abc.png".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(receipt.record.in_selfie.as_deref(), Some("in_1_abc.png"));
    }

    #[actix_web::test]
    async fn test_storage_failure_surfaces_and_writes_nothing() {
        let (tracker, store) = tracker_with(SessionPolicy::default());
        store.fail_writes.store(true, Ordering::Relaxed);

        let err = tracker.check_in(7, event(at(9, 0), None)).await.unwrap_err();

        assert!(err.is_retryable());
        assert!(store.snapshot().is_empty());
    }

    #[actix_web::test]
    async fn test_recent_is_newest_first_and_limited() {
        let (tracker, _) = tracker_with(SessionPolicy::default());

        for day_hour in [8, 10, 12] {
            tracker.check_in(7, event(at(day_hour, 0), None)).await.unwrap();
            tracker
                .check_out(7, event(at(day_hour + 1, 0), None))
                .await
                .unwrap();
        }

        let recent = tracker.recent(7, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].check_in, at(12, 0));
        assert_eq!(recent[1].check_in, at(10, 0));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("strict".parse::<OpenSessionPolicy>().unwrap(), OpenSessionPolicy::Strict);
        assert_eq!(
            "permissive".parse::<OpenSessionPolicy>().unwrap(),
            OpenSessionPolicy::Permissive
        );
        assert_eq!(
            "lenient".parse::<MissingSessionPolicy>().unwrap(),
            MissingSessionPolicy::Lenient
        );
        assert!("loose".parse::<MissingSessionPolicy>().is_err());
    }

    #[actix_web::test]
    async fn test_events_stamped_now_close_a_session_in_order() {
        let (tracker, store) = tracker_with(SessionPolicy::default());

        let check_in = AttendanceEvent::now(Some(office()), None);
        let stamped_at = Utc::now().naive_utc();
        assert!((stamped_at - check_in.at).num_seconds().abs() <= 1);

        tracker.check_in(7, check_in).await.unwrap();
        let outcome = tracker
            .check_out(7, AttendanceEvent::now(Some(office()), None))
            .await
            .unwrap();

        assert!(matches!(outcome, CheckOutOutcome::Closed { .. }));
        let record = &store.snapshot()[0];
        assert!(record.check_out.is_some_and(|out| out >= record.check_in));
    }
}
