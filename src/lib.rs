pub mod build;
pub mod config;
pub mod errors;
pub mod monitor;
pub mod notify;
pub mod telemetry;
