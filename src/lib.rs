//! This crate provides an analysis server for chemical process equipment. It accepts CSV files
//! listing equipment with their flowrate, pressure and temperature, cleans them, and computes
//! descriptive statistics, correlations, efficiency rankings, outliers and recommendations.
//! Results are stored per user and can be downloaded again as JSON or as a PDF report.
//!
//! The analysis itself is a synchronous pipeline over an in-memory dataset, see [pipeline]. Each
//! section of the result that cannot be computed for a dataset carries the reason instead, so a
//! successful analysis always has the same shape.
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team, on top of the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON response data and stored results.
//! * [csv] parses uploaded files.
//! * [ndarray] and [ndarray_stats] provide the numerical columns and their statistics.
//! * [sled] is an embedded database holding stored results.
//! * [genpdf] lays out PDF reports.

pub mod app;
pub mod app_state;
pub mod cli;
pub mod config;
pub mod correlation;
pub mod efficiency;
pub mod error;
pub mod ingest;
pub mod insights;
pub mod metrics;
pub mod models;
pub mod outliers;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod statistics;
pub mod store;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod types;
pub mod upload;
