use axum::{body::Body, http::Request, http::StatusCode, response::Response};
use lazy_static::lazy_static;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
};
use tracing::Span;

/// Outcome label of a successful analysis.
pub const OUTCOME_OK: &str = "ok";
/// Outcome label of an upload rejected by ingest.
pub const OUTCOME_REJECTED: &str = "rejected";

lazy_static! {
    // Registry for holding metric state
    pub static ref REGISTRY: Registry = Registry::new();
    // Simple request counter
    pub static ref INCOMING_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("incoming_requests", "The number of HTTP requests received"),
        &["http_method"]
    ).unwrap();
    // Request counter by status code
    pub static ref RESPONSE_CODE_COLLECTOR: IntCounterVec = IntCounterVec::new(
        Opts::new("outgoing_response", "The number of responses sent."),
        &["status_code"]
    ).unwrap();
    // Request histogram by response time
    pub static ref RESPONSE_TIME_COLLECTOR: HistogramVec = HistogramVec::new(
        HistogramOpts{
            common_opts: Opts::new("response_time", "The time taken to respond to each request"),
            buckets: prometheus::DEFAULT_BUCKETS.to_vec(),
        },
        &[],
    ).unwrap();
    // Analysis counter by outcome
    pub static ref ANALYSES: IntCounterVec = IntCounterVec::new(
        Opts::new("analyses", "The number of uploads analysed"),
        &["outcome"]
    ).unwrap();
    // Histogram of rows remaining after cleaning
    pub static ref CLEANED_ROWS: Histogram = Histogram::with_opts(
        HistogramOpts::new("cleaned_rows", "The number of rows in each cleaned dataset")
            .buckets(prometheus::exponential_buckets(1.0, 4.0, 10).unwrap()),
    ).unwrap();
}

pub fn register_metrics() {
    REGISTRY
        .register(Box::new(INCOMING_REQUESTS.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(RESPONSE_CODE_COLLECTOR.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(RESPONSE_TIME_COLLECTOR.clone()))
        .unwrap();
    REGISTRY.register(Box::new(ANALYSES.clone())).unwrap();
    REGISTRY.register(Box::new(CLEANED_ROWS.clone())).unwrap();
}

/// Renders all registered metrics in the prometheus text format.
pub async fn metrics_handler() -> Result<String, StatusCode> {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Increments the prometheus counter on all incoming requests, labelled by http method
pub fn request_counter(request: &Request<Body>, _span: &Span) {
    INCOMING_REQUESTS
        .with_label_values(&[&request.method().to_string().to_ascii_uppercase()])
        .inc();
}

/// Increment the prometheus counter on all outgoing responses, labelled by status code
pub fn record_response_metrics<B>(
    response: &Response<B>,
    latency: std::time::Duration,
    _span: &Span,
) {
    RESPONSE_CODE_COLLECTOR
        .with_label_values(&[response.status().as_str()])
        .inc();

    RESPONSE_TIME_COLLECTOR
        .with_label_values(&[])
        .observe(latency.as_secs_f64());
}

/// Records the outcome of an analysis.
///
/// # Arguments
///
/// * `cleaned_rows`: Rows remaining after cleaning, or `None` if the upload was rejected
pub fn record_analysis(cleaned_rows: Option<usize>) {
    match cleaned_rows {
        Some(rows) => {
            ANALYSES.with_label_values(&[OUTCOME_OK]).inc();
            CLEANED_ROWS.observe(rows as f64);
        }
        None => ANALYSES.with_label_values(&[OUTCOME_REJECTED]).inc(),
    }
}
