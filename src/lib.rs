//! probewatch collects network-measurement results from a distributed
//! probe mesh, enriches them with probe metadata, aggregates them per
//! measurement and exposes the aggregates to a pull-based metrics scraper.

pub mod client;
pub mod config;
pub mod exporter;
pub mod measurement;
pub mod probe;
pub mod protocols;
pub mod server;
pub mod strategy;
pub mod telemetry;
