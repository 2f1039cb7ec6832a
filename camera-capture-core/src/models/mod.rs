pub mod camera_models;
pub mod config;
pub mod configuration_result;
pub mod error;
pub mod state;
