use crate::api::attendance::{AttendanceListResponse, AttendanceRequest, AttendanceResponse, Coordinate};
use crate::api::employee::{CreateEmployee, EmployeeListResponse, UpdateEmployee};
use crate::api::holiday::CreateHoliday;
use crate::api::leave_request::{CreateLeave, LeaveListResponse};
use crate::api::settings::UpdateGeoFence;
use crate::api::shift::CreateShift;
use crate::attendance::classifier::AttendanceStatus;
use crate::attendance::geofence::{GeoFenceConfig, GeoPoint, ZoneStatus};
use crate::attendance::store::AttendanceRecord;
use crate::model::department::Department;
use crate::model::employee::Employee;
use crate::model::holiday::Holiday;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::shift::Shift;
use crate::models::{LoginReqDto, TokenPair};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Geo Attendance API",
        version = "1.0.0",
        description = r#"
## Geo-fenced Attendance System

Employees check in and out with their GPS position and an optional selfie.
Each record is flagged when either end falls outside the office geo-fence.

### Key Features
- **Attendance**: check-in, check-out, own history, HR listing with filters
- **Geo-fence settings**: office coordinate and radius
- **Employees**: profiles with an auto-provisioned login
- **Leave**: apply, approve or reject
- **Shifts and holidays**

### Security
Every `/api` endpoint needs a **JWT Bearer** access token from `/auth/login`.
HR and Admin roles are required for management operations.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::my_attendance,
        crate::api::attendance::list_attendance,

        crate::api::settings::get_geofence,
        crate::api::settings::update_geofence,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::list_departments,

        crate::api::shift::list_shifts,
        crate::api::shift::create_shift,

        crate::api::holiday::list_holidays,
        crate::api::holiday::create_holiday,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::my_leaves,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave
    ),
    components(
        schemas(
            LoginReqDto,
            TokenPair,
            Coordinate,
            AttendanceRequest,
            AttendanceResponse,
            AttendanceListResponse,
            AttendanceRecord,
            AttendanceStatus,
            GeoPoint,
            ZoneStatus,
            GeoFenceConfig,
            UpdateGeoFence,
            CreateEmployee,
            UpdateEmployee,
            Employee,
            EmployeeListResponse,
            Department,
            Shift,
            CreateShift,
            Holiday,
            CreateHoliday,
            CreateLeave,
            LeaveRequest,
            LeaveListResponse,
            LeaveStatus,
            LeaveType
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Attendance", description = "Geo-fenced check-in and check-out"),
        (name = "Settings", description = "Office geo-fence"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Shift", description = "Work shifts"),
        (name = "Holiday", description = "Holiday calendar"),
        (name = "Leave", description = "Leave management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_attendance_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/attendance"));
        assert!(doc.paths.paths.contains_key("/api/attendance/me"));
        assert!(doc.paths.paths.contains_key("/api/settings/geofence"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
