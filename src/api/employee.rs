use crate::{
    auth::{auth::AuthUser, password::hash_password},
    config::Config,
    model::{
        department::Department,
        employee::{Employee, EmployeeStatus},
        role::Role,
    },
    utils::db_utils::{
        BindSqlValue, Filters, SqlValue, build_update_sql, execute_update,
        is_foreign_key_violation, is_unique_violation, paginate,
    },
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

const EMPLOYEE_COLUMNS: &str = "id, employee_code, name, department_id, designation, email, phone, shift_id, status, created_at";

/// Columns HR may change after creation. The code is the login name and stays fixed.
const UPDATABLE_COLUMNS: &[&str] = &[
    "name",
    "department_id",
    "designation",
    "email",
    "phone",
    "shift_id",
    "status",
];

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "Asha Rao")]
    pub name: String,
    #[schema(example = 2)]
    pub department_id: Option<u64>,
    #[schema(example = "Field Engineer")]
    pub designation: Option<String>,
    #[schema(example = "asha.rao@company.com", format = "email")]
    pub email: Option<String>,
    #[schema(example = "+919812345678")]
    pub phone: Option<String>,
    #[schema(example = 1)]
    pub shift_id: Option<u64>,
    /// Initial login password; the configured default when blank
    #[schema(example = "s3cret-pass", format = "password")]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    pub shift_id: Option<u64>,
    /// active or inactive
    pub status: Option<String>,
    /// Matches name, code or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Partial update; only the fields present are written.
#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub name: Option<String>,
    pub department_id: Option<u64>,
    pub designation: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub shift_id: Option<u64>,
    #[schema(example = "inactive")]
    pub status: Option<String>,
    /// Resets the login password
    #[schema(format = "password")]
    pub password: Option<String>,
}

fn blank_to_none(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn initial_password<'a>(payload: &'a CreateEmployee, config: &'a Config) -> &'a str {
    blank_to_none(&payload.password).unwrap_or(&config.default_employee_password)
}

/// Splits a password reset off the column updates; it goes to `users`.
fn take_password(body: &mut Value) -> Result<Option<String>, String> {
    let Some(fields) = body.as_object_mut() else {
        return Ok(None);
    };

    match fields.remove("password") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(p)) if !p.trim().is_empty() => Ok(Some(p)),
        Some(_) => Err("password cannot be empty".to_string()),
    }
}

fn has_fields(body: &Value) -> bool {
    body.as_object().is_none_or(|fields| !fields.is_empty())
}

fn validate_new_employee(payload: &CreateEmployee) -> Result<(), &'static str> {
    if payload.employee_code.trim().is_empty() {
        return Err("employee_code is required");
    }
    if payload.name.trim().is_empty() {
        return Err("name is required");
    }
    Ok(())
}

fn validate_update(body: &Value) -> Result<(), String> {
    if let Some(status) = body.get("status") {
        let valid = status
            .as_str()
            .is_some_and(|s| s.parse::<EmployeeStatus>().is_ok());
        if !valid {
            return Err(format!("Invalid status: {status}"));
        }
    }
    if let Some(name) = body.get("name") {
        if name.as_str().is_none_or(|s| s.trim().is_empty()) {
            return Err("name cannot be empty".to_string());
        }
    }
    Ok(())
}

/// Create Employee
///
/// Also provisions the employee's login: username is the employee code,
/// password is the one supplied or the configured default.
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee and login created", body = Object, example = json!({
            "message": "Employee created",
            "id": 12
        })),
        (status = 400, description = "Missing code or name, or unknown department/shift"),
        (status = 403, description = "HR/Admin only"),
        (status = 409, description = "Employee code already in use"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if let Err(message) = validate_new_employee(&payload) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
    }

    let code = payload.employee_code.trim();

    let hashed = hash_password(initial_password(&payload, &config)).map_err(|e| {
        error!(error = %e, "Failed to hash initial password");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let result = async {
        let mut tx = pool.begin().await?;

        let employee_id = sqlx::query(
            r#"
            INSERT INTO employees
                (employee_code, name, department_id, designation, email, phone, shift_id, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(code)
        .bind(payload.name.trim())
        .bind(payload.department_id)
        .bind(blank_to_none(&payload.designation))
        .bind(blank_to_none(&payload.email))
        .bind(blank_to_none(&payload.phone))
        .bind(payload.shift_id)
        .bind(EmployeeStatus::Active.as_ref())
        .execute(&mut *tx)
        .await?
        .last_insert_id();

        sqlx::query(
            "INSERT INTO users (username, password, role_id, employee_id) VALUES (?, ?, ?, ?)",
        )
        .bind(code)
        .bind(&hashed)
        .bind(Role::Employee.id())
        .bind(employee_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok::<_, sqlx::Error>(employee_id)
    }
    .await;

    match result {
        Ok(id) => {
            info!(employee_id = id, code, created_by = auth.user_id, "Employee created");
            Ok(HttpResponse::Created().json(json!({
                "message": "Employee created",
                "id": id
            })))
        }
        Err(e) if is_unique_violation(&e) => Ok(HttpResponse::Conflict().json(json!({
            "message": "Employee code or login already exists"
        }))),
        Err(e) if is_foreign_key_violation(&e) => Ok(HttpResponse::BadRequest().json(json!({
            "message": "Unknown department or shift"
        }))),
        Err(e) => {
            error!(error = %e, "Failed to create employee");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (page, per_page, offset) = paginate(query.page, query.per_page, 20);

    // ---------- build WHERE clause dynamically ----------
    let mut filters = Filters::default();

    if let Some(department_id) = query.department_id {
        filters.push("department_id = ?", SqlValue::U64(department_id));
    }

    if let Some(shift_id) = query.shift_id {
        filters.push("shift_id = ?", SqlValue::U64(shift_id));
    }

    if let Some(status) = blank_to_none(&query.status) {
        filters.push("status = ?", SqlValue::String(status.to_string()));
    }

    if let Some(search) = blank_to_none(&query.search) {
        let like = format!("%{search}%");
        filters.push_many(
            "(name LIKE ? OR employee_code LIKE ? OR email LIKE ?)",
            vec![
                SqlValue::String(like.clone()),
                SqlValue::String(like.clone()),
                SqlValue::String(like),
            ],
        );
    }

    let where_clause = filters.where_clause();

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM employees {where_clause}");
    debug!(sql = %count_sql, bindings = ?filters.values(), "Counting employees");

    let total = sqlx::query_scalar::<_, i64>(&count_sql)
        .bind_all(filters.values())
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, sql = %count_sql, "Failed to count employees");
            ErrorInternalServerError("Database error")
        })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees {where_clause} ORDER BY id DESC LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let employees = sqlx::query_as::<_, Employee>(&data_sql)
        .bind_all(filters.values())
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, sql = %data_sql, "Failed to fetch employees");
            ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Object, example = json!({
            "message": "Employee updated successfully"
        })),
        (status = 400, description = "Unknown field or invalid value"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let employee_id = path.into_inner();
    let mut body = body.into_inner();

    let password = match take_password(&mut body) {
        Ok(password) => password,
        Err(message) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
        }
    };

    if let Err(message) = validate_update(&body) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
    }

    // a bare password reset leaves the employee row untouched
    let update = if password.is_some() && !has_fields(&body) {
        None
    } else {
        Some(build_update_sql("employees", &body, UPDATABLE_COLUMNS, "id", employee_id)?)
    };

    let hashed = password
        .as_deref()
        .map(hash_password)
        .transpose()
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to hash password");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let result = async {
        let mut tx = pool.begin().await?;
        let mut affected = 0;

        if let Some(update) = update {
            affected += execute_update(&mut *tx, update).await?;
        }

        if let Some(hashed) = &hashed {
            affected += sqlx::query("UPDATE users SET password = ? WHERE employee_id = ?")
                .bind(hashed)
                .bind(employee_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            // sessions issued under the old password end here
            sqlx::query(
                r#"
                UPDATE refresh_tokens rt
                JOIN users u ON u.id = rt.user_id
                SET rt.revoked = TRUE
                WHERE u.employee_id = ? AND rt.revoked = FALSE
                "#,
            )
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok::<_, sqlx::Error>(affected)
    }
    .await;

    let affected = match result {
        Ok(affected) => affected,
        Err(e) if is_foreign_key_violation(&e) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Unknown department or shift"
            })));
        }
        Err(e) => {
            error!(error = %e, employee_id, "Failed to update employee");
            return Err(ErrorInternalServerError("Internal Server Error"));
        }
    };

    // MySQL reports 0 rows for a no-op update, so confirm the row exists
    if affected == 0 {
        let exists: Option<u64> = sqlx::query_scalar("SELECT id FROM employees WHERE id = ?")
            .bind(employee_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, employee_id, "Failed to look up employee");
                ErrorInternalServerError("Internal Server Error")
            })?;

        if exists.is_none() {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Employee not found"
            })));
        }
    }

    info!(
        employee_id,
        updated_by = auth.user_id,
        password_reset = hashed.is_some(),
        "Employee updated"
    );

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully"
    })))
}

/// Delete Employee (Admin)
///
/// Removes the login as well; attendance and leave rows cascade.
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    let result = async {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM users WHERE employee_id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok::<_, sqlx::Error>(deleted)
    }
    .await;

    match result {
        Ok(0) => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
        Ok(_) => {
            info!(employee_id, deleted_by = auth.user_id, "Employee deleted");
            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }
        Err(e) => {
            error!(error = %e, employee_id, "Failed to delete employee");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id: u64 = path.into_inner();

    // employees may read their own profile
    if auth.employee_id != Some(employee_id) {
        auth.require_hr_or_admin()?;
    }

    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
    let employee = sqlx::query_as::<_, Employee>(&sql)
        .bind(employee_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to fetch employee");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match employee {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
    }
}

/// List Departments
#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "All departments", body = [Department])
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_departments(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let departments = sqlx::query_as::<_, Department>("SELECT id, name FROM departments ORDER BY name")
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch departments");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(departments))
}
