use anyhow::{Context, anyhow};
use dotenvy::dotenv;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::attendance::tracker::{MissingSessionPolicy, OpenSessionPolicy, SessionPolicy};

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Attendance
    pub upload_dir: PathBuf,
    pub session_policy: SessionPolicy,
    pub geofence_cache_ttl: Duration,

    pub default_employee_password: String,
    /// (username, password) of an admin created at startup if none exists.
    pub bootstrap_admin: Option<(String, String)>,

    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_source(|key| env::var(key).ok())
    }

    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{key} must be set"));

        let bootstrap_admin = match (
            get("BOOTSTRAP_ADMIN_USERNAME"),
            get("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(user), Some(pass)) => Some((user, pass)),
            (None, None) => None,
            _ => {
                return Err(anyhow!(
                    "BOOTSTRAP_ADMIN_USERNAME and BOOTSTRAP_ADMIN_PASSWORD must be set together"
                ));
            }
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or(&get, "ACCESS_TOKEN_TTL", "900")?, // default 15 min
            refresh_token_ttl: parse_or(&get, "REFRESH_TOKEN_TTL", "604800")?, // default 7 days

            rate_login_per_min: parse_or(&get, "RATE_LOGIN_PER_MIN", "60")?,
            rate_refresh_per_min: parse_or(&get, "RATE_REFRESH_PER_MIN", "30")?,
            rate_protected_per_min: parse_or(&get, "RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: get("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            upload_dir: get("UPLOAD_DIR")
                .unwrap_or_else(|| "uploads".to_string())
                .into(),
            session_policy: SessionPolicy {
                open_sessions: parse_or::<OpenSessionPolicy>(&get, "CHECKIN_POLICY", "strict")?,
                missing_session: parse_or::<MissingSessionPolicy>(
                    &get,
                    "CHECKOUT_POLICY",
                    "strict",
                )?,
            },
            geofence_cache_ttl: Duration::from_secs(parse_or(&get, "GEOFENCE_CACHE_TTL", "60")?),

            default_employee_password: get("DEFAULT_EMPLOYEE_PASSWORD")
                .unwrap_or_else(|| "emp123".to_string()),
            bootstrap_admin,

            log_level: parse_or(&get, "LOG_LEVEL", "debug")?,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::from_source(|key| match key {
            "SERVER_ADDR" => Some("127.0.0.1:0".to_string()),
            "DATABASE_URL" => Some("mysql://test@localhost/test".to_string()),
            "JWT_SECRET" => Some("test-secret".to_string()),
            _ => None,
        })
        .expect("test config")
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = get(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}
