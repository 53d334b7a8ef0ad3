use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use super::classifier::AttendanceStatus;
use super::geofence::{GeoFenceConfig, GeoPoint};
use crate::error::AttendanceError;

/// One check-in/check-out pair. `check_out == None` means the session is open.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 42)]
    pub id: u64,
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05T09:02:11", value_type = String, format = "date-time")]
    pub check_in: NaiveDateTime,
    #[schema(example = "2026-01-05T17:31:40", value_type = Option<String>, format = "date-time")]
    pub check_out: Option<NaiveDateTime>,
    pub in_location: Option<GeoPoint>,
    pub out_location: Option<GeoPoint>,
    /// Opaque reference into the selfie file store.
    pub in_selfie: Option<String>,
    pub out_selfie: Option<String>,
    pub status: Option<AttendanceStatus>,
    pub is_outside_zone: bool,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub employee_id: u64,
    pub at: NaiveDateTime,
    pub location: Option<GeoPoint>,
    pub selfie: Option<String>,
    pub status: AttendanceStatus,
    pub is_outside_zone: bool,
}

#[derive(Debug)]
pub enum OpenOutcome {
    Opened(AttendanceRecord),
    /// Returned only for exclusive opens; nothing was written.
    AlreadyOpen(AttendanceRecord),
}

/// Fields written when a session is closed.
///
/// `outside_zone` is OR-ed into the stored flag so a record stays flagged
/// when either end was outside the fence.
#[derive(Debug, Clone)]
pub struct CheckOutPatch {
    pub at: NaiveDateTime,
    pub location: Option<GeoPoint>,
    pub selfie: Option<String>,
    pub outside_zone: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub employee_id: Option<u64>,
    pub outside_zone: Option<bool>,
    pub date: Option<NaiveDate>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug)]
pub struct AttendancePage {
    pub records: Vec<AttendanceRecord>,
    pub total: i64,
}

/// Persistence collaborator for attendance records.
///
/// Implementations must make `open_session` (when `exclusive`) and
/// `close_latest_open` atomic per employee: the probe for an open record
/// and the write that follows cannot interleave with another call.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn open_session(
        &self,
        new: NewCheckIn,
        exclusive: bool,
    ) -> Result<OpenOutcome, AttendanceError>;

    /// Closes the most recently created open record of the employee.
    /// `Ok(None)` when there is nothing to close.
    async fn close_latest_open(
        &self,
        employee_id: u64,
        patch: CheckOutPatch,
    ) -> Result<Option<AttendanceRecord>, AttendanceError>;

    async fn recent(
        &self,
        employee_id: u64,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError>;

    async fn list(&self, filter: &AttendanceFilter) -> Result<AttendancePage, AttendanceError>;
}

/// Supplies the geo-fence in force for the current call.
#[async_trait]
pub trait GeoFenceSource: Send + Sync {
    async fn current(&self) -> Result<GeoFenceConfig, AttendanceError>;
}

#[async_trait]
impl GeoFenceSource for GeoFenceConfig {
    async fn current(&self) -> Result<GeoFenceConfig, AttendanceError> {
        Ok(*self)
    }
}
