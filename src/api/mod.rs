pub mod attendance;
pub mod employee;
pub mod holiday;
pub mod leave_request;
pub mod settings;
pub mod shift;
