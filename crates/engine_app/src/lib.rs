pub mod app;
pub mod config;
pub mod head_pose;
pub mod solar_system;
