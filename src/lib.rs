pub mod api;
pub mod app;
pub mod geocode;
pub mod identity;
pub mod metrics;
pub mod notifications;
pub mod records;
pub mod sos;
pub mod store;
pub mod telemetry;
