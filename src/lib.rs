//! Argentina Economic Dashboard Library
//!
//! This library provides the core functionality for the Argentina economic
//! dashboard service: upstream API clients (ArgenStats, BCRA, Series de
//! Tiempo, Presupuesto), fallback data, the concurrent aggregator, HTTP
//! handlers and the server-rendered dashboard page.
//!
//! # Modules
//!
//! - `api`: API-layer components (handlers, router, page).
//! - `core`: Aggregation, fallback data and shared models/errors.
//! - `integrations`: Upstream API clients.
//! - `aggregator`: Concurrent fan-out with deadlines and fallback substitution.
//! - `app`: Router construction.
//! - `argenstats_client`: ArgenStats API client.
//! - `config`: Configuration management.
//! - `dashboard`: Server-rendered dashboard page.
//! - `errors`: Error handling types.
//! - `fallback`: Fallback constants and synthetic series.
//! - `format`: es-AR number and date formatting.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `normalize`: Upstream JSON shape normalization.
//! - `services`: BCRA, Series de Tiempo and Presupuesto clients.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod aggregator;
pub mod app;
pub mod argenstats_client;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod fallback;
pub mod format;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod services;
