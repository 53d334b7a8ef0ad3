use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, warn};

use super::classifier::AttendanceStatus;
use super::geofence::GeoPoint;
use super::store::{
    AttendanceFilter, AttendancePage, AttendanceRecord, AttendanceStore, CheckOutPatch,
    NewCheckIn, OpenOutcome,
};
use crate::error::AttendanceError;
use crate::utils::db_utils::{BindSqlValue, Filters, SqlValue};

const COLUMNS: &str = "id, employee_id, check_in, check_out, in_lat, in_lng, out_lat, out_lng, \
                       in_selfie, out_selfie, status, is_outside_zone";

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    check_in: NaiveDateTime,
    check_out: Option<NaiveDateTime>,
    in_lat: Option<f64>,
    in_lng: Option<f64>,
    out_lat: Option<f64>,
    out_lng: Option<f64>,
    in_selfie: Option<String>,
    out_selfie: Option<String>,
    status: Option<String>,
    is_outside_zone: bool,
}

fn stored_point(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
    match (lat, lng) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint {
            latitude,
            longitude,
        }),
        _ => None,
    }
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(row: AttendanceRow) -> Self {
        let status = row.status.as_deref().and_then(|s| {
            s.parse::<AttendanceStatus>()
                .map_err(|_| warn!(record_id = row.id, status = s, "Unknown attendance status"))
                .ok()
        });

        AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            check_in: row.check_in,
            check_out: row.check_out,
            in_location: stored_point(row.in_lat, row.in_lng),
            out_location: stored_point(row.out_lat, row.out_lng),
            in_selfie: row.in_selfie,
            out_selfie: row.out_selfie,
            status,
            is_outside_zone: row.is_outside_zone,
        }
    }
}

pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn open_session(
        &self,
        new: NewCheckIn,
        exclusive: bool,
    ) -> Result<OpenOutcome, AttendanceError> {
        let mut tx = self.pool.begin().await?;

        // Serialises concurrent check-ins of the same employee.
        let employee: Option<(u64,)> =
            sqlx::query_as("SELECT id FROM employees WHERE id = ? FOR UPDATE")
                .bind(new.employee_id)
                .fetch_optional(&mut *tx)
                .await?;

        if employee.is_none() {
            return Err(AttendanceError::NotFound(
                "Employee profile not found".to_string(),
            ));
        }

        if exclusive {
            let open = sqlx::query_as::<_, AttendanceRow>(&format!(
                "SELECT {COLUMNS} FROM attendance \
                 WHERE employee_id = ? AND check_out IS NULL \
                 ORDER BY id DESC LIMIT 1"
            ))
            .bind(new.employee_id)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(open) = open {
                tx.rollback().await?;
                return Ok(OpenOutcome::AlreadyOpen(open.into()));
            }
        }

        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (employee_id, check_in, in_lat, in_lng, in_selfie, status, is_outside_zone)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.employee_id)
        .bind(new.at)
        .bind(new.location.map(|p| p.latitude))
        .bind(new.location.map(|p| p.longitude))
        .bind(new.selfie)
        .bind(new.status.to_string())
        .bind(new.is_outside_zone)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_id();

        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {COLUMNS} FROM attendance WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(record_id = id, employee_id = new.employee_id, "Attendance row inserted");

        Ok(OpenOutcome::Opened(row.into()))
    }

    async fn close_latest_open(
        &self,
        employee_id: u64,
        patch: CheckOutPatch,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        let mut tx = self.pool.begin().await?;

        let open = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {COLUMNS} FROM attendance \
             WHERE employee_id = ? AND check_out IS NULL \
             ORDER BY id DESC LIMIT 1 \
             FOR UPDATE"
        ))
        .bind(employee_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(open) = open else {
            tx.rollback().await?;
            return Ok(None);
        };

        if patch.at < open.check_in {
            return Err(AttendanceError::validation(
                "Check-out time precedes check-in time",
            ));
        }

        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?,
                out_lat = ?,
                out_lng = ?,
                out_selfie = ?,
                is_outside_zone = (is_outside_zone OR ?)
            WHERE id = ?
            AND check_out IS NULL
            "#,
        )
        .bind(patch.at)
        .bind(patch.location.map(|p| p.latitude))
        .bind(patch.location.map(|p| p.longitude))
        .bind(patch.selfie)
        .bind(patch.outside_zone)
        .bind(open.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // the row lock makes this unreachable unless the row vanished
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {COLUMNS} FROM attendance WHERE id = ?"
        ))
        .bind(open.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(record_id = open.id, employee_id, "Attendance row closed");

        Ok(Some(row.into()))
    }

    async fn recent(
        &self,
        employee_id: u64,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {COLUMNS} FROM attendance WHERE employee_id = ? ORDER BY id DESC LIMIT ?"
        ))
        .bind(employee_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list(&self, filter: &AttendanceFilter) -> Result<AttendancePage, AttendanceError> {
        let mut filters = Filters::default();

        if let Some(employee_id) = filter.employee_id {
            filters.push("employee_id = ?", SqlValue::U64(employee_id));
        }
        if let Some(outside) = filter.outside_zone {
            filters.push("is_outside_zone = ?", SqlValue::Bool(outside));
        }
        if let Some(date) = filter.date {
            filters.push("DATE(check_in) = ?", SqlValue::Date(date));
        }

        let where_clause = filters.where_clause();

        let count_sql = format!("SELECT COUNT(*) FROM attendance {where_clause}");
        debug!(sql = %count_sql, bindings = ?filters.values(), "Counting attendance");

        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind_all(filters.values())
            .fetch_one(&self.pool)
            .await?;

        let data_sql = format!(
            "SELECT {COLUMNS} FROM attendance {where_clause} ORDER BY id DESC LIMIT ? OFFSET ?"
        );

        let rows = sqlx::query_as::<_, AttendanceRow>(&data_sql)
            .bind_all(filters.values())
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(AttendancePage {
            records: rows.into_iter().map(Into::into).collect(),
            total,
        })
    }
}
