use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Casual,
    Sick,
    Annual,
    Maternity,
    Paternity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub employee_id: u64,
    /// Joined from `employees.name`.
    #[schema(example = "Asha Rao")]
    pub employee_name: Option<String>,
    #[schema(example = "sick", value_type = String)]
    pub leave_type: String,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-06", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    #[schema(example = "Fever")]
    pub reason: String,
    #[schema(example = "pending", value_type = String)]
    pub status: String,
    /// User id of the approver or rejecter.
    pub approved_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_at: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<NaiveDateTime>,
}

/// Checks an application before it is stored.
pub fn validate_application(
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: &str,
) -> Result<(), &'static str> {
    if start_date > end_date {
        return Err("start_date cannot be after end_date");
    }
    if reason.trim().is_empty() {
        return Err("A reason is required");
    }
    Ok(())
}
