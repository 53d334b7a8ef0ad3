use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Failures of the attendance core.
///
/// `Storage` is the only transient kind: a checkout may be retried as-is,
/// a check-in must not be blindly retried by the caller.
#[derive(Debug, Clone, Display, PartialEq)]
pub enum AttendanceError {
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "storage failure: {}", _0)]
    Storage(String),
}

impl AttendanceError {
    pub fn validation(message: impl Into<String>) -> Self {
        AttendanceError::Validation(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AttendanceError::Storage(_))
    }
}

impl std::error::Error for AttendanceError {}

impl From<sqlx::Error> for AttendanceError {
    fn from(e: sqlx::Error) -> Self {
        AttendanceError::Storage(e.to_string())
    }
}

impl From<std::io::Error> for AttendanceError {
    fn from(e: std::io::Error) -> Self {
        AttendanceError::Storage(e.to_string())
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::Validation(_) => StatusCode::BAD_REQUEST,
            AttendanceError::Conflict(_) => StatusCode::CONFLICT,
            AttendanceError::NotFound(_) => StatusCode::NOT_FOUND,
            AttendanceError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // storage details stay in the logs
        let message = match self {
            AttendanceError::Storage(_) => "Storage temporarily unavailable, please retry".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "message": message,
            "retryable": self.is_retryable(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AttendanceError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AttendanceError::Conflict("open".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AttendanceError::NotFound("no open session".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AttendanceError::Storage("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_only_storage_is_retryable() {
        assert!(AttendanceError::Storage("pool timed out".into()).is_retryable());
        assert!(!AttendanceError::validation("bad latitude").is_retryable());
        assert!(!AttendanceError::Conflict("open".into()).is_retryable());
        assert!(!AttendanceError::NotFound("none".into()).is_retryable());
    }

    #[test]
    fn test_display_keeps_message() {
        let err = AttendanceError::NotFound("no open session".into());
        assert_eq!(err.to_string(), "no open session");
    }
}
