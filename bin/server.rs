// NoteParse - Web Server
// Paste-notes page plus a JSON API: parse, dashboard, export

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use noteparse::{export, Config, Dashboard, ExportFormat, GridRow, ParsedTable};

/// Shared application state
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Deserialize)]
struct ParseRequest {
    text: String,
}

/// Rows as the browser grid holds them after edits
#[derive(Deserialize)]
struct RowsRequest {
    rows: Vec<GridRow>,
    #[serde(default)]
    format: ExportFormat,
}

impl AppState {
    fn table_from(&self, rows: &[GridRow]) -> ParsedTable {
        ParsedTable::from_grid_rows(rows, &self.config.cell_coercion())
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/parse - Parse pasted notes into records
async fn parse_notes(State(state): State<AppState>, Json(request): Json<ParseRequest>) -> Response {
    match state.config.note_parser().parse_checked(&request.text) {
        Ok(table) => (StatusCode::OK, Json(ApiResponse::ok(table))).into_response(),
        Err(err) => {
            warn!(error = %err, "parse request rejected");
            (StatusCode::BAD_REQUEST, Json(ApiResponse::<ParsedTable>::error(err.to_string()))).into_response()
        }
    }
}

/// POST /api/dashboard - Totals per day and shares per item for the edited rows
async fn dashboard(State(state): State<AppState>, Json(request): Json<RowsRequest>) -> impl IntoResponse {
    let table = state.table_from(&request.rows);
    let dashboard = Dashboard::from_table(&table, &state.config.date_inference());
    Json(ApiResponse::ok(dashboard))
}

/// POST /api/export - Edited rows as a downloadable spreadsheet
async fn export_rows(State(state): State<AppState>, Json(request): Json<RowsRequest>) -> Response {
    let table = state.table_from(&request.rows);

    match export(&table, request.format, Local::now().naive_local()) {
        Ok(file) => {
            info!(file = %file.file_name, rows = table.len(), "serving export");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, file.mime.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", file.file_name),
                    ),
                ],
                file.bytes,
            )
                .into_response()
        }
        Err(err) => {
            warn!(error = %err, "export failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(err.to_string())),
            )
                .into_response()
        }
    }
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/parse", post(parse_notes))
        .route("/dashboard", post(dashboard))
        .route("/export", post(export_rows))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(None)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = config.server_addr.clone();
    let state = AppState {
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("NoteParse server running on http://{}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
