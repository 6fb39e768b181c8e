//! Equipment analysis HTTP API
//!
//! The `/api` routes accept CSV uploads, run the analysis pipeline over them and serve stored
//! results back as JSON or PDF.

use crate::app_state::{AppState, SharedAppState};
use crate::cli::CommandLineArgs;
use crate::error::ChemvizError;
use crate::metrics::{self, metrics_handler, record_analysis};
use crate::models::{AnalysisResponse, HistoryResponse, StoredDataset};
use crate::pipeline;
use crate::report;
use crate::upload::CsvUpload;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Path, State},
    headers::{authorization::Basic, Authorization},
    http::header,
    http::Request,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    routing::post,
    Json, Router, TypedHeader,
};
use std::sync::Arc;
use tower::Layer;
use tower::ServiceBuilder;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;
use tower_http::validate_request::ValidateRequestHeaderLayer;
use tracing::{event, Level};

/// User uploads are attributed to when no Basic auth username is given.
pub const ANONYMOUS_USER: &str = "anonymous";

/// `axum::Router` wrapped in a path normalising layer.
pub type Service = NormalizePath<Router>;

/// Optional Basic auth credentials of a request.
type Credentials = Option<TypedHeader<Authorization<Basic>>>;

/// Returns the user a request is attributed to.
fn user(credentials: &Credentials) -> &str {
    match credentials {
        Some(TypedHeader(auth)) if !auth.username().is_empty() => auth.username(),
        _ => ANONYMOUS_USER,
    }
}

/// Returns an [axum::Router] for the API.
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn router(state: SharedAppState) -> Router {
    fn api(max_upload_size: usize) -> Router<SharedAppState> {
        Router::new()
            .route("/analyze", post(analyze))
            .route("/history", get(history))
            .route("/dataset/:id", get(dataset).delete(delete_dataset))
            .route("/dataset/:id/report", get(dataset_report))
            .layer(
                ServiceBuilder::new()
                    .layer(DefaultBodyLimit::max(max_upload_size))
                    .layer(ValidateRequestHeaderLayer::custom(
                        // Validate that an authorization header has been provided.
                        |request: &mut Request<Body>| {
                            if request.headers().contains_key(header::AUTHORIZATION) {
                                Ok(())
                            } else {
                                Err(StatusCode::UNAUTHORIZED.into_response())
                            }
                        },
                    )),
            )
    }

    let max_upload_size = state.args.max_upload_size;
    Router::new()
        .route("/", get(root))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api(max_upload_size))
        .layer(
            TraceLayer::new_for_http()
                .on_request(metrics::request_counter)
                .on_response(metrics::record_response_metrics),
        )
        .with_state(state)
}

/// Returns a [crate::app::Service] for the API.
///
/// The service trims trailing slashes from request paths before routing.
///
/// # Arguments
///
/// * `args`: Command line arguments
pub fn service(args: &CommandLineArgs) -> Service {
    let state = Arc::new(AppState::new(args));
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

async fn root() -> &'static str {
    "Chemviz equipment analysis server"
}

/// Analyse an uploaded CSV file and store the result.
#[tracing::instrument(
    level = "DEBUG",
    skip_all,
    fields(filename = %upload.meta.filename, file_size = upload.meta.file_size)
)]
async fn analyze(
    State(state): State<SharedAppState>,
    credentials: Credentials,
    upload: CsvUpload,
) -> Result<Json<AnalysisResponse>, ChemvizError> {
    let result = if state.args.use_rayon {
        let data = upload.data.clone();
        let config = state.config.clone();
        tokio_rayon::spawn(move || pipeline::analyze(&data, &config)).await
    } else {
        pipeline::analyze(&upload.data, &state.config)
    };
    record_analysis(
        result
            .as_ref()
            .ok()
            .map(|result| result.dataset_info.cleaned_rows),
    );
    let result = result?;

    let stored = state.store.store(
        user(&credentials),
        &upload.meta.filename,
        upload.meta.file_size,
        result,
    )?;
    event!(Level::INFO, id = stored.dataset.id, user = %stored.dataset.user, "stored analysis");
    Ok(Json(AnalysisResponse {
        dataset_id: stored.dataset.id,
        dataset: stored.dataset,
        analysis_results: stored.analysis_results,
    }))
}

async fn history(
    State(state): State<SharedAppState>,
    credentials: Credentials,
) -> Result<Json<HistoryResponse>, ChemvizError> {
    let datasets = state.store.history(user(&credentials))?;
    Ok(Json(HistoryResponse {
        count: datasets.len(),
        datasets,
    }))
}

/// Load a dataset belonging to the requesting user.
fn load_owned(
    state: &AppState,
    id: u64,
    credentials: &Credentials,
) -> Result<StoredDataset, ChemvizError> {
    match state.store.load(id)? {
        Some(stored) if stored.dataset.user == user(credentials) => Ok(stored),
        _ => Err(ChemvizError::DatasetNotFound { id }),
    }
}

async fn dataset(
    State(state): State<SharedAppState>,
    Path(id): Path<u64>,
    credentials: Credentials,
) -> Result<Json<StoredDataset>, ChemvizError> {
    load_owned(&state, id, &credentials).map(Json)
}

async fn delete_dataset(
    State(state): State<SharedAppState>,
    Path(id): Path<u64>,
    credentials: Credentials,
) -> Result<StatusCode, ChemvizError> {
    if state.store.delete(id, user(&credentials))? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ChemvizError::DatasetNotFound { id })
    }
}

async fn dataset_report(
    State(state): State<SharedAppState>,
    Path(id): Path<u64>,
    credentials: Credentials,
) -> Result<Response, ChemvizError> {
    let stored = load_owned(&state, id, &credentials)?;
    let fonts = state
        .fonts
        .clone()
        .ok_or(ChemvizError::ReportFontsUnavailable)?;
    let content = report::build(&stored.analysis_results, &stored.dataset);
    let pdf = report::render(&content, fonts)?;
    Ok((
        [
            (header::CONTENT_TYPE, mime::APPLICATION_PDF.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"report_{id}.pdf\""),
            ),
        ],
        pdf,
    )
        .into_response())
}
