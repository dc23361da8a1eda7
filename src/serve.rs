/*!
housemap Dashboard Server

Serves the interactive choropleth dashboard and a small JSON API over the
two input files.

## Usage

```bash
housemap-server --market state_market_tracker.tsv000.gz \
    --boundaries us-state-boundaries.geojson --host 127.0.0.1 --port 3000
```

## Endpoints

- `GET /` - Dashboard page for the query-string selection
- `GET /api/v1/map` - Rendered map layers + legend as JSON
- `GET /api/v1/months` - Snapshot months available in the data window
- `GET /api/v1/health` - Health check
- `GET /api/v1/version` - Version information

Every request re-runs the full join/filter pipeline for its selection;
the raw file loads are cached by path for the process lifetime.
*/

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use housemap::map::MapSpec;
use housemap::reader::BoundaryCollection;
use housemap::selection::{Metric, PropertyType, Selection};
use housemap::writer::{leaflet, LeafletWriter, Writer};
use housemap::{page, pipeline, reader, HousemapError, VERSION};

/// CLI arguments for the dashboard server
#[derive(Parser)]
#[command(name = "housemap-server")]
#[command(about = "housemap Dashboard Server")]
#[command(version = VERSION)]
struct Cli {
    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind to
    #[arg(long, default_value = "3000")]
    port: u16,

    /// CORS allowed origins (comma-separated)
    #[arg(long, default_value = "*")]
    cors_origin: String,

    /// Path to the gzip-compressed market tracker TSV
    #[arg(long, default_value = "state_market_tracker.tsv000.gz")]
    market: PathBuf,

    /// Path to the state-boundary GeoJSON
    #[arg(long, default_value = "us-state-boundaries.geojson")]
    boundaries: PathBuf,
}

/// Shared application state: just the two input paths. The loaded tables
/// live in the reader's process-wide cache, so cloning this is cheap.
#[derive(Clone)]
struct AppState {
    market_path: PathBuf,
    boundaries_path: PathBuf,
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Selection parameters accepted by `/` and `/api/v1/map`. Missing
/// parameters fall back to the defaults (most recent month, all
/// residential, median sale price).
#[derive(Debug, Default, Deserialize)]
struct SelectionQuery {
    period: Option<String>,
    property_type: Option<String>,
    metric: Option<String>,
}

/// Successful API response
#[derive(Debug, Serialize)]
struct ApiSuccess<T> {
    status: String,
    data: T,
}

/// Error API response
#[derive(Debug, Serialize)]
struct ApiError {
    status: String,
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

/// Rendered map layers for one selection
#[derive(Debug, Serialize)]
struct MapResult {
    choropleth: serde_json::Value,
    overlay: serde_json::Value,
    legend: serde_json::Value,
    metadata: MapMetadata,
}

#[derive(Debug, Serialize)]
struct MapMetadata {
    rows: usize,
    period_begin: String,
    property_type: String,
    metric: String,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Version response
#[derive(Debug, Serialize)]
struct VersionResponse {
    version: String,
    writers: Vec<String>,
}

// ============================================================================
// Error Handling
// ============================================================================

/// Custom error type for API responses
struct ApiErrorResponse {
    status: StatusCode,
    error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let json = Json(self.error);
        (self.status, json).into_response()
    }
}

impl From<HousemapError> for ApiErrorResponse {
    fn from(err: HousemapError) -> Self {
        // Load and pipeline failures are fatal server-side conditions;
        // only malformed selection parameters rank as client errors, and
        // those are mapped explicitly before reaching here.
        let error_type = match &err {
            HousemapError::ReaderError(_) => "ReaderError",
            HousemapError::PipelineError(_) => "PipelineError",
            HousemapError::WriterError(_) => "WriterError",
            HousemapError::InternalError(_) => "InternalError",
        };

        ApiErrorResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: ApiError {
                status: "error".to_string(),
                error: ErrorDetails {
                    message: err.to_string(),
                    error_type: error_type.to_string(),
                },
            },
        }
    }
}

impl From<String> for ApiErrorResponse {
    fn from(msg: String) -> Self {
        ApiErrorResponse {
            status: StatusCode::BAD_REQUEST,
            error: ApiError {
                status: "error".to_string(),
                error: ErrorDetails {
                    message: msg,
                    error_type: "BadRequest".to_string(),
                },
            },
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

struct PreparedData {
    joined: DataFrame,
    boundaries: std::sync::Arc<BoundaryCollection>,
    months: Vec<String>,
}

/// Run the load + join + window steps for a request. The raw loads come
/// out of the path cache; the joined frame is derived fresh each time.
fn prepare(state: &AppState) -> Result<PreparedData, ApiErrorResponse> {
    let market = reader::read_market(&state.market_path)?;
    let boundaries = reader::read_boundaries(&state.boundaries_path)?;
    let joined = pipeline::join_boundaries(
        &pipeline::market_window(&market)?,
        &boundaries.attribute_frame()?,
    )?;
    let months = pipeline::snapshot_months(&joined)?;
    Ok(PreparedData {
        joined,
        boundaries,
        months,
    })
}

/// Apply query-string overrides on top of the default selection. Unknown
/// property types and metrics are client errors; an unknown period is
/// allowed and simply filters to zero rows.
fn resolve_selection(
    joined: &DataFrame,
    query: &SelectionQuery,
) -> Result<Selection, ApiErrorResponse> {
    let mut selection = Selection::default_for(joined)?;
    if let Some(ref period) = query.period {
        selection.period_begin = period.clone();
    }
    if let Some(ref label) = query.property_type {
        selection.property_type =
            PropertyType::from_label(label).map_err(|e| ApiErrorResponse::from(e.to_string()))?;
    }
    if let Some(ref column) = query.metric {
        selection.metric =
            Metric::from_column(column).map_err(|e| ApiErrorResponse::from(e.to_string()))?;
    }
    Ok(selection)
}

// ============================================================================
// Handler Functions
// ============================================================================

/// GET / - Render the dashboard page for the selection
async fn dashboard_handler(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> Result<Html<String>, ApiErrorResponse> {
    let prepared = prepare(&state)?;
    let selection = resolve_selection(&prepared.joined, &query)?;
    info!(
        "Rendering dashboard: period={} property_type={} metric={}",
        selection.period_begin, selection.property_type, selection.metric
    );

    let filtered = pipeline::apply_selection(&prepared.joined, &selection)?;
    let writer = LeafletWriter::new();
    let map_html = writer.write(
        &MapSpec::for_selection(&selection),
        &filtered,
        &prepared.boundaries,
    )?;

    Ok(Html(page::compose(&selection, &prepared.months, &map_html)))
}

/// GET /api/v1/map - Rendered map layers as JSON
async fn map_handler(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> Result<Json<ApiSuccess<MapResult>>, ApiErrorResponse> {
    let prepared = prepare(&state)?;
    let selection = resolve_selection(&prepared.joined, &query)?;
    let filtered = pipeline::apply_selection(&prepared.joined, &selection)?;
    let spec = MapSpec::for_selection(&selection);

    let result = MapResult {
        choropleth: leaflet::choropleth_feature_collection(&spec, &filtered, &prepared.boundaries)?,
        overlay: leaflet::overlay_feature_collection(&spec, &filtered, &prepared.boundaries)?,
        legend: leaflet::legend(&spec, &filtered)?,
        metadata: MapMetadata {
            rows: filtered.height(),
            period_begin: selection.period_begin.clone(),
            property_type: selection.property_type.label().to_string(),
            metric: selection.metric.column().to_string(),
        },
    };

    Ok(Json(ApiSuccess {
        status: "success".to_string(),
        data: result,
    }))
}

/// GET /api/v1/months - Snapshot months in the data window
async fn months_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiSuccess<Vec<String>>>, ApiErrorResponse> {
    let prepared = prepare(&state)?;
    Ok(Json(ApiSuccess {
        status: "success".to_string(),
        data: prepared.months,
    }))
}

/// GET /api/v1/health - Health check
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
    })
}

/// GET /api/v1/version - Version information
async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: VERSION.to_string(),
        writers: vec!["leaflet".to_string()],
    })
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api/v1/map", get(map_handler))
        .route("/api/v1/months", get(months_handler))
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/version", get(version_handler))
        .with_state(state)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "housemap_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load both datasets up front so a missing or malformed file aborts
    // before the server ever answers a request.
    info!("Loading market data from {}", cli.market.display());
    reader::read_market(&cli.market)?;
    info!("Loading boundaries from {}", cli.boundaries.display());
    reader::read_boundaries(&cli.boundaries)?;

    let state = AppState {
        market_path: cli.market,
        boundaries_path: cli.boundaries,
    };

    // Configure CORS
    let cors = if cli.cors_origin == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(vec![header::CONTENT_TYPE])
    } else {
        let origins: Vec<_> = cli
            .cors_origin
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(vec![header::CONTENT_TYPE])
    };

    let app = build_router(state)
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid host or port: {}", e))?;

    info!("Starting housemap dashboard server on {}", addr);
    info!("  GET  /                - dashboard page");
    info!("  GET  /api/v1/map      - rendered map layers");
    info!("  GET  /api/v1/months   - snapshot months");
    info!("  GET  /api/v1/health   - health check");
    info!("  GET  /api/v1/version  - version info");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
