pub mod virtual_device;
pub mod virtual_permissions;
