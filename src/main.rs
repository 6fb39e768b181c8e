//! This file defines the chemviz binary entry point.

use chemviz::app;
use chemviz::cli;
use chemviz::metrics;
use chemviz::server;
use chemviz::tracing;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing(&args);
    ::tracing::event!(::tracing::Level::DEBUG, ?args, "parsed arguments");
    metrics::register_metrics();
    let service = app::service(&args);
    server::serve(&args, service).await;
    tracing::shutdown_tracing();
}
