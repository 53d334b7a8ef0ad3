use crate::auth::auth::AuthUser;
use crate::model::holiday::Holiday;
use crate::utils::db_utils::is_unique_violation;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateHoliday {
    #[schema(example = "2026-01-26", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "Republic Day")]
    pub description: String,
}

#[derive(Deserialize, IntoParams)]
pub struct HolidayQuery {
    /// Only holidays in this calendar year
    pub year: Option<i32>,
}

/// List holidays
#[utoipa::path(
    get,
    path = "/api/holidays",
    params(HolidayQuery),
    responses(
        (status = 200, description = "Holidays by date", body = [Holiday]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Holiday"
)]
pub async fn list_holidays(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HolidayQuery>,
) -> actix_web::Result<impl Responder> {
    let holidays = match query.year {
        Some(year) => {
            sqlx::query_as::<_, Holiday>(
                "SELECT id, date, description FROM holidays WHERE YEAR(date) = ? ORDER BY date",
            )
            .bind(year)
            .fetch_all(pool.get_ref())
            .await
        }
        None => {
            sqlx::query_as::<_, Holiday>("SELECT id, date, description FROM holidays ORDER BY date")
                .fetch_all(pool.get_ref())
                .await
        }
    }
    .map_err(|e| {
        error!(error = %e, "Failed to fetch holidays");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(holidays))
}

/// Add a holiday (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/holidays",
    request_body = CreateHoliday,
    responses(
        (status = 201, description = "Holiday created", body = Holiday),
        (status = 400, description = "Description missing"),
        (status = 403, description = "HR/Admin only"),
        (status = 409, description = "A holiday already exists on that date")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Holiday"
)]
pub async fn create_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateHoliday>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let description = payload.description.trim();
    if description.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "description is required"
        })));
    }

    let result = sqlx::query("INSERT INTO holidays (date, description) VALUES (?, ?)")
        .bind(payload.date)
        .bind(description)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            info!(date = %payload.date, "Holiday added");
            Ok(HttpResponse::Created().json(Holiday {
                id: res.last_insert_id(),
                date: payload.date,
                description: description.to_string(),
            }))
        }
        Err(e) if is_unique_violation(&e) => Ok(HttpResponse::Conflict().json(json!({
            "message": format!("A holiday already exists on {}", payload.date)
        }))),
        Err(e) => {
            error!(error = %e, "Failed to add holiday");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}
