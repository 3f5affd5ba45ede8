/// Basic application code
pub mod app;
/// Operator authorization
pub mod auth;
/// REST clients for outside services
pub mod client;
/// Controllers for REST endpoints
pub mod controller;
/// Domain objects
pub mod domain;
/// Errors and their HTTP mapping
pub mod error;
/// Stored records
pub mod model;
/// Repositories
pub mod repo;
/// Deal ingestion, notification and digest services
pub mod service;
/// Application settings
pub mod settings;
/// Application telemetry for tracing and logging
pub mod telemetry;
