use chrono::NaiveDateTime;
use serde::Serialize;

/// Login row. Employees get one when their profile is created.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(skip)]
    pub password: String,
    pub role_id: u8,
    pub employee_id: Option<u64>,
    pub is_active: bool,
    pub last_login_at: Option<NaiveDateTime>,
}
