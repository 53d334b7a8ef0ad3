use crate::config::Config;
use crate::{auth::jwt::verify_token, model::role::Role, models::TokenType};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest,
    dev::Payload,
    error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized},
    web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    /// Decodes a bearer access token into an authenticated user.
    pub fn from_token(token: &str, secret: &str) -> Result<Self, &'static str> {
        let claims = verify_token(token, secret).map_err(|_| "Invalid or expired token")?;

        if claims.token_type != TokenType::Access {
            return Err("Access token required");
        }

        let role = Role::from_id(claims.role).ok_or("Invalid role")?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }

    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ErrorForbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Hr) {
            Ok(())
        } else {
            Err(ErrorForbidden("HR/Admin only"))
        }
    }

    /// The employee profile this login acts for. Attendance and leave
    /// operations never take the employee id from the request body.
    pub fn require_employee(&self) -> actix_web::Result<u64> {
        self.employee_id
            .ok_or_else(|| ErrorForbidden("No employee profile"))
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // already decoded by auth_middleware
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(ErrorInternalServerError("Config missing"))),
        };

        ready(AuthUser::from_token(token, &config.jwt_secret).map_err(ErrorUnauthorized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{generate_access_token, generate_refresh_token};

    #[test]
    fn test_from_token_maps_claims() {
        let token =
            generate_access_token(5, "hr.lead".into(), Role::Hr.id(), None, "k", 60).unwrap();
        let user = AuthUser::from_token(&token, "k").unwrap();

        assert_eq!(user.user_id, 5);
        assert_eq!(user.role, Role::Hr);
        assert!(user.require_hr_or_admin().is_ok());
        assert!(user.require_admin().is_err());
        assert!(user.require_employee().is_err());
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let (token, _) =
            generate_refresh_token(5, "x".into(), Role::Employee.id(), Some(1), "k", 60).unwrap();
        assert_eq!(
            AuthUser::from_token(&token, "k").unwrap_err(),
            "Access token required"
        );
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let token = generate_access_token(5, "x".into(), 9, None, "k", 60).unwrap();
        assert_eq!(AuthUser::from_token(&token, "k").unwrap_err(), "Invalid role");
    }
}
