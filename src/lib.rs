pub mod config;
pub mod constants;
pub mod eda;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod types;

// Ports and their adapters
pub mod app;
pub mod infra;
