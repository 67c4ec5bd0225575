pub mod analytics;
pub mod api;
pub mod config;
pub mod export;
pub mod ingest;
pub mod metrics_server;
pub mod observability;

pub use ingest::{import_readings, ImportError, ImportOutcome};
