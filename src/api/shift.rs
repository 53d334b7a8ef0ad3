use crate::auth::auth::AuthUser;
use crate::model::shift::{Shift, validate_shift};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateShift {
    #[schema(example = "Night")]
    pub name: String,
    /// HH:MM or HH:MM:SS
    #[schema(example = "22:00")]
    pub start_time: String,
    #[schema(example = "06:00")]
    pub end_time: String,
}

/// List shifts
#[utoipa::path(
    get,
    path = "/api/shifts",
    responses(
        (status = 200, description = "All shifts", body = [Shift]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn list_shifts(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let shifts = sqlx::query_as::<_, Shift>(
        "SELECT id, name, start_time, end_time FROM shifts ORDER BY start_time",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch shifts");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(shifts))
}

/// Add a shift (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/shifts",
    request_body = CreateShift,
    responses(
        (status = 201, description = "Shift created", body = Shift),
        (status = 400, description = "Invalid name or times"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn create_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateShift>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (start_time, end_time) =
        match validate_shift(&payload.name, &payload.start_time, &payload.end_time) {
            Ok(times) => times,
            Err(message) => {
                return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
            }
        };

    let name = payload.name.trim().to_string();

    let result = sqlx::query("INSERT INTO shifts (name, start_time, end_time) VALUES (?, ?, ?)")
        .bind(&name)
        .bind(start_time)
        .bind(end_time)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create shift");
            ErrorInternalServerError("Internal Server Error")
        })?;

    info!(shift_id = result.last_insert_id(), name = %name, "Shift created");

    Ok(HttpResponse::Created().json(Shift {
        id: result.last_insert_id(),
        name,
        start_time,
        end_time,
    }))
}
