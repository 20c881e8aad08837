//! AWP weather-station exporter.
//!
//! Accepts station reports on `/data/report/<station>`, exposes the readings
//! as Prometheus gauges on `/metrics`, and optionally mirrors each report to
//! a second collector.

pub mod config;
pub mod handlers;
pub mod ingest;
pub mod mirror;
pub mod registry;
pub mod state;

pub use handlers::create_router;
pub use state::AppState;
