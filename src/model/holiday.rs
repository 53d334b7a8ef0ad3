use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Holiday {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = "2026-01-26", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "Republic Day")]
    pub description: String,
}
