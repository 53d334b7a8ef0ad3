use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "name": "Asha Rao",
        "department_id": 2,
        "designation": "Field Engineer",
        "email": "asha.rao@company.com",
        "phone": "+919812345678",
        "shift_id": 1,
        "status": "active",
        "created_at": "2026-01-01T09:00:00"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    /// Also the login username.
    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "Asha Rao")]
    pub name: String,

    #[schema(example = 2, nullable = true)]
    pub department_id: Option<u64>,

    #[schema(example = "Field Engineer", nullable = true)]
    pub designation: Option<String>,

    #[schema(example = "asha.rao@company.com", nullable = true)]
    pub email: Option<String>,

    #[schema(example = "+919812345678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = 1, nullable = true)]
    pub shift_id: Option<u64>,

    #[schema(example = "active")]
    pub status: String,

    #[schema(example = "2026-01-01T09:00:00", value_type = Option<String>, format = "date-time")]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
}
