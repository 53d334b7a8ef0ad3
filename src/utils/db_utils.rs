use actix_web::error::ErrorBadRequest;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use sqlx::Executor;
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::{Query, QueryAs, QueryScalar};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Null,
}

/// Binds a `SqlValue` onto any of the sqlx query builders.
pub trait BindSqlValue: Sized {
    fn bind_value(self, value: SqlValue) -> Self;

    fn bind_all(self, values: &[SqlValue]) -> Self {
        values
            .iter()
            .cloned()
            .fold(self, |query, value| query.bind_value(value))
    }
}

macro_rules! bind_sql_value {
    ($query:expr, $value:expr) => {
        match $value {
            SqlValue::String(v) => $query.bind(v),
            SqlValue::I64(v) => $query.bind(v),
            SqlValue::U64(v) => $query.bind(v),
            SqlValue::F64(v) => $query.bind(v),
            SqlValue::Bool(v) => $query.bind(v),
            SqlValue::Date(v) => $query.bind(v),
            SqlValue::Time(v) => $query.bind(v),
            SqlValue::DateTime(v) => $query.bind(v),
            SqlValue::Null => $query.bind(None::<String>),
        }
    };
}

impl<'q> BindSqlValue for Query<'q, MySql, MySqlArguments> {
    fn bind_value(self, value: SqlValue) -> Self {
        bind_sql_value!(self, value)
    }
}

impl<'q, O> BindSqlValue for QueryAs<'q, MySql, O, MySqlArguments> {
    fn bind_value(self, value: SqlValue) -> Self {
        bind_sql_value!(self, value)
    }
}

impl<'q, O> BindSqlValue for QueryScalar<'q, MySql, O, MySqlArguments> {
    fn bind_value(self, value: SqlValue) -> Self {
        bind_sql_value!(self, value)
    }
}

/// ===============================
/// WHERE clause builder
/// ===============================
#[derive(Debug, Default)]
pub struct Filters {
    conditions: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl Filters {
    pub fn push(&mut self, condition: &'static str, value: SqlValue) {
        self.conditions.push(condition);
        self.values.push(value);
    }

    /// Adds a condition with several placeholders.
    pub fn push_many(&mut self, condition: &'static str, values: Vec<SqlValue>) {
        self.conditions.push(condition);
        self.values.extend(values);
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys listed in `allowed_columns` may appear in the payload; the
/// column names are interpolated into the statement, values are bound.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed_columns: &[&str],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    if let Some(unknown) = obj.keys().find(|k| !allowed_columns.contains(&k.as_str())) {
        return Err(ErrorBadRequest(format!("Field '{unknown}' cannot be updated")));
    }

    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table, set_clause, id_column
    );

    let mut values = Vec::with_capacity(obj.len() + 1);

    // Convert JSON values → SqlValue
    for value in obj.values() {
        match value {
            Value::String(s) => {
                if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    values.push(SqlValue::Date(d));
                } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                    values.push(SqlValue::DateTime(dt));
                } else {
                    values.push(SqlValue::String(s.clone()));
                }
            }
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    values.push(SqlValue::U64(u));
                } else if let Some(i) = n.as_i64() {
                    values.push(SqlValue::I64(i));
                } else if let Some(f) = n.as_f64() {
                    values.push(SqlValue::F64(f));
                }
            }
            Value::Bool(b) => values.push(SqlValue::Bool(*b)),
            Value::Null => values.push(SqlValue::Null),
            _ => return Err(ErrorBadRequest("Unsupported JSON value type")),
        }
    }

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update<'c, E>(executor: E, update: SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    let result = sqlx::query(&update.sql)
        .bind_all(&update.values)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Duplicate key (MySQL 1062). SQLSTATE 23000 alone also covers foreign keys.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// Referenced row missing (MySQL 1452) or still referenced (1451).
pub fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.is_foreign_key_violation(),
        _ => false,
    }
}

/// Page/per-page normalisation shared by the list endpoints.
pub fn paginate(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> (u32, u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(default_per_page).clamp(1, 100);
    (page, per_page, (page - 1).saturating_mul(per_page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::fmt;

    #[derive(Debug)]
    struct ConstraintError(ErrorKind);

    impl fmt::Display for ConstraintError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "constraint failed: {:?}", self.0)
        }
    }

    impl std::error::Error for ConstraintError {}

    impl DatabaseError for ConstraintError {
        fn message(&self) -> &str {
            "constraint failed"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            // MySQL reports both kinds under the same SQLSTATE
            Some(Cow::Borrowed("23000"))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn db_error(kind: ErrorKind) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ConstraintError(kind)))
    }

    const COLUMNS: &[&str] = &["name", "email", "shift_id", "status"];

    #[test]
    fn test_build_update_sql_binds_values_in_key_order() {
        let update =
            build_update_sql("employees", &json!({"name": "Asha", "shift_id": 2}), COLUMNS, "id", 9)
                .unwrap();

        assert_eq!(update.sql, "UPDATE employees SET name = ?, shift_id = ? WHERE id = ?");
        assert_eq!(
            update.values,
            vec![
                SqlValue::String("Asha".into()),
                SqlValue::U64(2),
                SqlValue::U64(9)
            ]
        );
    }

    #[test]
    fn test_build_update_sql_rejects_unknown_columns() {
        let err = build_update_sql(
            "employees",
            &json!({"name = 'x', role_id": 1}),
            COLUMNS,
            "id",
            1,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_build_update_sql_rejects_empty_and_non_objects() {
        assert!(build_update_sql("employees", &json!({}), COLUMNS, "id", 1).is_err());
        assert!(build_update_sql("employees", &json!(["name"]), COLUMNS, "id", 1).is_err());
        assert!(build_update_sql("employees", &json!({"name": {"a": 1}}), COLUMNS, "id", 1).is_err());
    }

    #[test]
    fn test_build_update_sql_maps_scalars() {
        let update = build_update_sql(
            "employees",
            &json!({"status": null, "email": "2026-01-01"}),
            COLUMNS,
            "id",
            3,
        )
        .unwrap();

        assert!(update.values.contains(&SqlValue::Null));
        assert!(update.values.contains(&SqlValue::Date(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
        )));
    }

    #[test]
    fn test_filters_where_clause() {
        let mut filters = Filters::default();
        assert_eq!(filters.where_clause(), "");

        filters.push("employee_id = ?", SqlValue::U64(4));
        filters.push("is_outside_zone = ?", SqlValue::Bool(true));
        assert_eq!(
            filters.where_clause(),
            "WHERE employee_id = ? AND is_outside_zone = ?"
        );
        assert_eq!(filters.values().len(), 2);
    }

    #[test]
    fn test_paginate_clamps() {
        assert_eq!(paginate(None, None, 20), (1, 20, 0));
        assert_eq!(paginate(Some(0), Some(500), 20), (1, 100, 0));
        assert_eq!(paginate(Some(3), Some(10), 20), (3, 10, 20));
        assert_eq!(paginate(Some(u32::MAX), Some(100), 20), (u32::MAX, 100, u32::MAX));
    }

    #[test]
    fn test_constraint_kinds_are_told_apart() {
        let duplicate = db_error(ErrorKind::UniqueViolation);
        assert!(is_unique_violation(&duplicate));
        assert!(!is_foreign_key_violation(&duplicate));

        let missing_parent = db_error(ErrorKind::ForeignKeyViolation);
        assert!(!is_unique_violation(&missing_parent));
        assert!(is_foreign_key_violation(&missing_parent));

        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
