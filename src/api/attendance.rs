use crate::attendance::geofence::{GeoPoint, ZoneStatus};
use crate::attendance::store::{AttendanceFilter, AttendanceRecord};
use crate::attendance::tracker::{AttendanceEvent, AttendanceTracker, CheckOutOutcome};
use crate::auth::auth::AuthUser;
use crate::error::AttendanceError;
use crate::utils::db_utils::paginate;
use crate::utils::selfie_store::{SelfieKind, SelfieStore};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

/// Browsers send coordinates either as JSON numbers or as form strings.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn as_text(&self) -> String {
        match self {
            Coordinate::Number(n) => n.to_string(),
            Coordinate::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AttendanceRequest {
    #[schema(example = "12.9716")]
    pub lat: Option<Coordinate>,
    #[schema(example = "77.5946")]
    pub lng: Option<Coordinate>,
    /// Base64 PNG data URL captured from the camera.
    #[schema(example = "data:image/png;base64,iVBORw0KGgo...")]
    pub selfie: Option<String>,
}

impl AttendanceRequest {
    fn location(&self) -> Result<Option<GeoPoint>, AttendanceError> {
        let lat = self.lat.as_ref().map(Coordinate::as_text);
        let lng = self.lng.as_ref().map(Coordinate::as_text);
        GeoPoint::parse(lat.as_deref(), lng.as_deref())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceResponse {
    pub message: String,
    /// Absent when nothing was recorded.
    pub zone: Option<ZoneStatus>,
    pub record: Option<AttendanceRecord>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MyAttendanceQuery {
    /// Number of records, newest first (1-100, default 10)
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AttendanceQuery {
    pub employee_id: Option<u64>,
    /// Only records flagged (or not flagged) as outside the geo-fence
    pub outside_zone: Option<bool>,
    /// Calendar day of the check-in (YYYY-MM-DD)
    #[param(value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceRecord>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

async fn store_selfie(
    selfies: &dyn SelfieStore,
    payload: Option<&str>,
    kind: SelfieKind,
) -> Result<Option<String>, AttendanceError> {
    match payload {
        Some(payload) => selfies.save(payload, kind).await,
        None => Ok(None),
    }
}

/// Removes a selfie that ended up attached to nothing.
async fn discard_orphan(selfies: &dyn SelfieStore, reference: Option<String>) {
    if let Some(reference) = reference {
        if let Err(e) = selfies.discard(&reference).await {
            warn!(error = %e, file = %reference, "Failed to discard orphaned selfie");
        }
    }
}

fn log_rejection(employee_id: u64, e: &AttendanceError) {
    if e.is_retryable() {
        error!(error = %e, employee_id, "Attendance write failed");
    } else {
        info!(error = %e, employee_id, "Attendance event rejected");
    }
}

/// Check-in
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Checked in", body = AttendanceResponse),
        (status = 400, description = "Invalid coordinates or selfie"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 409, description = "A session is already open"),
        (status = 503, description = "Storage unavailable, retry later")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    body: web::Json<AttendanceRequest>,
    tracker: web::Data<AttendanceTracker>,
    selfies: web::Data<dyn SelfieStore>,
) -> actix_web::Result<HttpResponse> {
    let employee_id = auth.require_employee()?;
    let location = body.location()?;
    let selfie = store_selfie(selfies.get_ref(), body.selfie.as_deref(), SelfieKind::CheckIn).await?;

    let event = AttendanceEvent::now(location, selfie.clone());

    match tracker.check_in(employee_id, event).await {
        Ok(receipt) => {
            let message = match receipt.zone {
                ZoneStatus::Outside => "Checked in outside the office zone",
                _ => "Checked in successfully",
            };

            Ok(HttpResponse::Ok().json(AttendanceResponse {
                message: message.to_string(),
                zone: Some(receipt.zone),
                record: Some(receipt.record),
            }))
        }
        Err(e) => {
            log_rejection(employee_id, &e);
            discard_orphan(selfies.get_ref(), selfie).await;
            Err(e.into())
        }
    }
}

/// Check-out
#[utoipa::path(
    put,
    path = "/api/attendance",
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Checked out", body = AttendanceResponse),
        (status = 400, description = "Invalid coordinates or selfie"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 404, description = "No open attendance session"),
        (status = 503, description = "Storage unavailable, retry later")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    body: web::Json<AttendanceRequest>,
    tracker: web::Data<AttendanceTracker>,
    selfies: web::Data<dyn SelfieStore>,
) -> actix_web::Result<HttpResponse> {
    let employee_id = auth.require_employee()?;
    let location = body.location()?;
    let selfie =
        store_selfie(selfies.get_ref(), body.selfie.as_deref(), SelfieKind::CheckOut).await?;

    let event = AttendanceEvent::now(location, selfie.clone());

    match tracker.check_out(employee_id, event).await {
        Ok(CheckOutOutcome::Closed { record, zone }) => {
            let message = match zone {
                ZoneStatus::Outside => "Checked out outside the office zone",
                _ => "Checked out successfully",
            };

            Ok(HttpResponse::Ok().json(AttendanceResponse {
                message: message.to_string(),
                zone: Some(zone),
                record: Some(record),
            }))
        }
        Ok(CheckOutOutcome::NoOpenSession) => {
            discard_orphan(selfies.get_ref(), selfie).await;

            Ok(HttpResponse::Ok().json(AttendanceResponse {
                message: "No open attendance session, nothing to close".to_string(),
                zone: None,
                record: None,
            }))
        }
        Err(e) => {
            log_rejection(employee_id, &e);
            discard_orphan(selfies.get_ref(), selfie).await;
            Err(e.into())
        }
    }
}

/// Own attendance history
#[utoipa::path(
    get,
    path = "/api/attendance/me",
    params(MyAttendanceQuery),
    responses(
        (status = 200, description = "Most recent records first", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    query: web::Query<MyAttendanceQuery>,
    tracker: web::Data<AttendanceTracker>,
) -> actix_web::Result<HttpResponse> {
    let employee_id = auth.require_employee()?;
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let records = tracker.recent(employee_id, limit).await.map_err(|e| {
        error!(error = %e, employee_id, "Failed to load attendance history");
        e
    })?;

    Ok(HttpResponse::Ok().json(records))
}

/// Attendance list (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance records", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    query: web::Query<AttendanceQuery>,
    tracker: web::Data<AttendanceTracker>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let (page, per_page, offset) = paginate(query.page, query.per_page, 20);

    let filter = AttendanceFilter {
        employee_id: query.employee_id,
        outside_zone: query.outside_zone,
        date: query.date,
        limit: per_page,
        offset,
    };

    let result = tracker.list(&filter).await.map_err(|e| {
        error!(error = %e, "Failed to list attendance");
        e
    })?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data: result.records,
        page,
        per_page,
        total: result.total,
    }))
}
