#![cfg(feature = "web")]
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::downloader::{self, ExportFormat};
use crate::error::{DashboardError, Result};
use crate::figure::{self, ChartId, Figure};
use crate::graph::{self, GraphOptions};
use crate::orders::{OrderFilter, OrdersTable};

/// Shared, read-only state handed to every handler
pub struct AppState {
    pub table: OrdersTable,
    pub graph: GraphOptions,
}

impl AppState {
    pub fn new(table: OrdersTable, graph: GraphOptions) -> Arc<Self> {
        Arc::new(Self { table, graph })
    }
}

#[derive(Serialize)]
struct DropdownOptions {
    cities: Vec<String>,
    categories: Vec<String>,
}

#[derive(Serialize)]
struct PageChart {
    id: &'static str,
    filtered: bool,
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
    #[serde(flatten)]
    filter: OrderFilter,
}

/// Builds the dashboard router
///
/// # Arguments
/// * `state` - Loaded orders and chart size
/// * `static_dir` - Directory served under `/static`
pub fn router(state: Arc<AppState>, static_dir: impl AsRef<FsPath>) -> Router {
    Router::new()
        .route("/", get(serve_dashboard))
        .route("/health", get(health))
        .route("/api/options", get(get_options))
        .route("/api/figure/:chart", get(get_figure))
        .route("/api/graph/:chart", get(get_graph))
        .route("/api/export", get(export_orders))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .with_state(state)
}

/// Serves the dashboard until Ctrl+C
pub async fn run(config: &Config, table: OrdersTable) -> Result<()> {
    let state = AppState::new(
        table,
        GraphOptions {
            width: config.chart_width,
            height: config.chart_height,
        },
    );
    let app = router(state, &config.static_dir);

    let listener = TcpListener::bind(config.bind_addr()).await?;
    log::info!("Dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received, stopping");
}

fn dropdown_options(table: &OrdersTable) -> DropdownOptions {
    DropdownOptions {
        cities: table.cities(),
        categories: table.categories(),
    }
}

async fn serve_dashboard(State(state): State<Arc<AppState>>) -> Html<String> {
    let mut template = include_str!("./static/dashboard.html").to_string();

    let charts: Vec<PageChart> = ChartId::ALL
        .iter()
        .map(|c| PageChart {
            id: c.slug(),
            filtered: c.is_filtered(),
        })
        .collect();
    let options_json = serde_json::to_string(&dropdown_options(&state.table))
        .unwrap_or_else(|_| "{\"cities\":[],\"categories\":[]}".to_string());
    let charts_json = serde_json::to_string(&charts).unwrap_or_else(|_| "[]".to_string());

    template = template.replace(
        "</head>",
        &format!(
            "    <script>const DASHBOARD_OPTIONS = {};\n    \
             const DASHBOARD_CHARTS = {};</script>\n</head>",
            script_safe(&options_json),
            script_safe(&charts_json)
        ),
    );

    Html(template)
}

/// Keeps JSON embedded in a `<script>` block from closing the tag early
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "orders": state.table.len(),
    }))
}

async fn get_options(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(dropdown_options(&state.table))
}

async fn get_figure(
    Path(chart): Path<String>,
    Query(filter): Query<OrderFilter>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Figure>> {
    let chart: ChartId = chart.parse()?;
    log::debug!("figure {} for {:?}", chart, filter);
    Ok(Json(figure::build_figure(chart, &state.table, &filter)))
}

async fn get_graph(
    Path(chart): Path<String>,
    Query(filter): Query<OrderFilter>,
    State(state): State<Arc<AppState>>,
) -> Result<Response> {
    let chart: ChartId = chart.parse()?;
    log::debug!("graph {} for {:?}", chart, filter);

    let png = tokio::task::spawn_blocking(move || {
        let figure = figure::build_figure(chart, &state.table, &filter);
        graph::render_png(&figure, &state.graph)
    })
    .await
    .map_err(|e| DashboardError::Render(e.to_string()))??;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        png,
    )
        .into_response())
}

async fn export_orders(
    Query(query): Query<ExportQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response> {
    let format = match query.format.as_deref() {
        None | Some("") => ExportFormat::default(),
        Some(value) => ExportFormat::parse(value)?,
    };

    let rows = state.table.filter(&query.filter);
    log::debug!("export of {} orders as {:?}", rows.len(), format);

    let body = match format {
        ExportFormat::Csv => downloader::to_csv(&rows)?,
        ExportFormat::Xlsx => downloader::to_xlsx(&rows)?,
    };
    let disposition = format!("attachment; filename=\"{}\"", format.file_name());

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
