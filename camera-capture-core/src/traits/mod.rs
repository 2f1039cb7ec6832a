pub mod capture_control;
pub mod capture_hardware;
pub mod permission_authority;
