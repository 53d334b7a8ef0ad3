use crate::auth::auth::AuthUser;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType, validate_application};
use crate::model::role::Role;
use crate::utils::db_utils::{BindSqlValue, Filters, SqlValue, paginate};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

const SELECT_LEAVE: &str = r#"
    SELECT
        l.id, l.employee_id, e.name AS employee_name, l.leave_type,
        l.start_date, l.end_date, l.reason, l.status,
        l.approved_by, l.approved_at, l.created_at
    FROM leave_requests l
    LEFT JOIN employees e ON e.id = l.employee_id
"#;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "sick")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Fever")]
    pub reason: String,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams)]
pub struct LeaveFilter {
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    /// Filter by leave status (pending, approved, rejected)
    #[param(value_type = Option<String>)]
    pub status: Option<LeaveStatus>,
    /// Filter by leave type
    #[param(value_type = Option<String>)]
    pub leave_type: Option<LeaveType>,
    /// Search by employee name
    pub search: Option<String>,
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    /// Items per page
    pub per_page: Option<u32>,
}

/// Apply for leave
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body = CreateLeave,
    responses(
        (status = 201, description = "Leave request submitted", body = Object, example = json!({
            "message": "Leave request submitted",
            "status": "pending"
        })),
        (status = 400, description = "Invalid dates or missing reason"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    if let Err(message) =
        validate_application(payload.start_date, payload.end_date, &payload.reason)
    {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, leave_type, start_date, end_date, reason, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.leave_type.as_ref())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.reason.trim())
    .bind(LeaveStatus::Pending.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to create leave request");
        ErrorInternalServerError("Internal Server Error")
    })?;

    info!(employee_id, leave_id = result.last_insert_id(), "Leave request submitted");

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave request submitted",
        "id": result.last_insert_id(),
        "status": LeaveStatus::Pending
    })))
}

/// Own leave requests
#[utoipa::path(
    get,
    path = "/api/leave/me",
    responses(
        (status = 200, description = "Leave requests of the caller, newest first", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let sql = format!("{SELECT_LEAVE} WHERE l.employee_id = ? ORDER BY l.id DESC");
    let leaves = sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(employee_id)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to fetch own leave requests");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(leaves))
}

async fn decide(
    auth: AuthUser,
    pool: &MySqlPool,
    leave_id: u64,
    decision: LeaveStatus,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, approved_by = ?, approved_at = NOW()
        WHERE id = ?
        AND status = ?
        "#,
    )
    .bind(decision.as_ref())
    .bind(auth.user_id)
    .bind(leave_id)
    .bind(LeaveStatus::Pending.as_ref())
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, %decision, "Leave decision failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Leave request not found or already processed"
        })));
    }

    info!(leave_id, %decision, approver = auth.user_id, "Leave request decided");

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Leave {decision}"),
        "status": decision
    })))
}

/// Approve leave (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = Object, example = json!({
            "message": "Leave approved",
            "status": "approved"
        })),
        (status = 400, description = "Leave request not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide(auth, pool.get_ref(), path.into_inner(), LeaveStatus::Approved).await
}

/// Reject leave (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected", body = Object, example = json!({
            "message": "Leave rejected",
            "status": "rejected"
        })),
        (status = 400, description = "Leave request not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide(auth, pool.get_ref(), path.into_inner(), LeaveStatus::Rejected).await
}

/// Leave request details
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let sql = format!("{SELECT_LEAVE} WHERE l.id = ?");
    let leave = sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(leave_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, leave_id, "Failed to fetch leave request");
            ErrorInternalServerError("Internal Server Error")
        })?;

    // employees only see their own requests
    let visible = |l: &LeaveRequest| {
        auth.role != Role::Employee || auth.employee_id == Some(l.employee_id)
    };

    match leave {
        Some(data) if visible(&data) => Ok(HttpResponse::Ok().json(data)),
        _ => Ok(HttpResponse::NotFound().json(json!({
            "message": "Leave request not found"
        }))),
    }
}

/// Leave requests (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (page, per_page, offset) = paginate(query.page, query.per_page, 10);

    let mut filters = Filters::default();

    if let Some(employee_id) = query.employee_id {
        filters.push("l.employee_id = ?", SqlValue::U64(employee_id));
    }

    if let Some(status) = query.status {
        filters.push("l.status = ?", SqlValue::String(status.to_string()));
    }

    if let Some(leave_type) = query.leave_type {
        filters.push("l.leave_type = ?", SqlValue::String(leave_type.to_string()));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        filters.push("e.name LIKE ?", SqlValue::String(format!("%{search}%")));
    }

    let where_clause = filters.where_clause();

    let count_sql = format!(
        "SELECT COUNT(*) FROM leave_requests l LEFT JOIN employees e ON e.id = l.employee_id {where_clause}"
    );
    debug!(sql = %count_sql, "Counting leave requests");

    let total = sqlx::query_scalar::<_, i64>(&count_sql)
        .bind_all(filters.values())
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count leave requests");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!("{SELECT_LEAVE} {where_clause} ORDER BY l.id DESC LIMIT ? OFFSET ?");

    let leaves = sqlx::query_as::<_, LeaveRequest>(&data_sql)
        .bind_all(filters.values())
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch leave list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves,
        page,
        per_page,
        total,
    }))
}
