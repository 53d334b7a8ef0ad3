use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    model::{role::Role, user::User},
    models::{Claims, LoginReqDto, TokenPair, TokenType},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument, warn};

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issues an access/refresh pair and records the refresh token id.
async fn issue_tokens(
    pool: &MySqlPool,
    config: &Config,
    user_id: u64,
    username: &str,
    role: u8,
    employee_id: Option<u64>,
) -> Result<TokenPair, HttpResponse> {
    let access_token = generate_access_token(
        user_id,
        username.to_string(),
        role,
        employee_id,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    let refresh = generate_refresh_token(
        user_id,
        username.to_string(),
        role,
        employee_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    let (access_token, (refresh_token, refresh_claims)) = match (access_token, refresh) {
        (Ok(a), Ok(r)) => (a, r),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Failed to sign tokens");
            return Err(HttpResponse::InternalServerError().finish());
        }
    };

    debug!(user_id, jti = %refresh_claims.jti, "Storing refresh token");

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await
    {
        error!(error = %e, "Failed to store refresh token");
        return Err(HttpResponse::InternalServerError().finish());
    }

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().json(json!({
            "message": "Username or password required"
        }));
    }

    let db_user = match sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role_id, employee_id, is_active, last_login_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim())
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(u)) if u.is_active => u,
        Ok(_) => {
            info!("Invalid credentials: unknown or inactive user");
            return HttpResponse::Unauthorized().json(json!({"message": "Invalid credentials"}));
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().json(json!({"message": "Invalid credentials"}));
    }

    let tokens = match issue_tokens(
        pool.get_ref(),
        &config,
        db_user.id,
        &db_user.username,
        db_user.role_id,
        db_user.employee_id,
    )
    .await
    {
        Ok(t) => t,
        Err(resp) => return resp,
    };

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        // not fatal for the login itself
        warn!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");
    HttpResponse::Ok().json(tokens)
}

async fn revoke(pool: &MySqlPool, claims: &Claims) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = ?
        AND revoked = FALSE
        AND expires_at > NOW()
        "#,
    )
    .bind(&claims.jti)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::Unauthorized().json(json!({"message": "No token"}));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::Unauthorized().finish(),
    };

    // revoking first makes a replayed token lose the race
    match revoke(pool.get_ref(), &claims).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id = claims.user_id, jti = %claims.jti, "Refresh token reuse or expiry");
            return HttpResponse::Unauthorized().finish();
        }
        Err(e) => {
            error!(error = %e, "Failed to revoke refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    }

    match issue_tokens(
        pool.get_ref(),
        &config,
        claims.user_id,
        &claims.sub,
        claims.role,
        claims.employee_id,
    )
    .await
    {
        Ok(tokens) => HttpResponse::Ok().json(tokens),
        Err(resp) => resp,
    }
}

/// Logout (revokes the refresh token)
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::NoContent().finish();
    };

    // only refresh tokens can log out; anything else is a silent success
    if let Ok(claims) = verify_token(token, &config.jwt_secret) {
        if claims.token_type == TokenType::Refresh {
            if let Err(e) = revoke(pool.get_ref(), &claims).await {
                error!(error = %e, "Failed to revoke refresh token on logout");
            }
        }
    }

    HttpResponse::NoContent().finish()
}

/// Creates the configured admin login when no admin exists yet.
pub async fn ensure_bootstrap_admin(pool: &MySqlPool, config: &Config) -> anyhow::Result<()> {
    let Some((username, password)) = &config.bootstrap_admin else {
        return Ok(());
    };

    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role_id = ?")
        .bind(Role::Admin.id())
        .fetch_one(pool)
        .await?;

    if admins > 0 {
        debug!("Admin already present, skipping bootstrap");
        return Ok(());
    }

    let hashed = hash_password(password).map_err(|e| anyhow::anyhow!("{e}"))?;

    sqlx::query("INSERT INTO users (username, password, role_id) VALUES (?, ?, ?)")
        .bind(username)
        .bind(hashed)
        .bind(Role::Admin.id())
        .execute(pool)
        .await?;

    info!(username = %username, "Bootstrap admin created");
    Ok(())
}
