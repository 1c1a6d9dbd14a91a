use axum::{
    Json, Router,
    extract::{Query, Request, State},
    http::{HeaderValue, Method, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::chart::{self, ChartKind, ChartSpec};
use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::info::{self, FileInfo};
use crate::locks::PathLocks;
use crate::response::ApiResponse;
use crate::table::{self, SheetSnapshot};
use crate::workbook::{DEFAULT_SHEET, Workbook};

pub const SERVICE_NAME: &str = "excel-service";

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

#[derive(Default)]
pub struct AppState {
    locks: PathLocks,
}

type SharedState = Arc<AppState>;
type JsonBody<T> = WithRejection<Json<T>, ServiceError>;

#[derive(Deserialize)]
struct ReadRequest {
    file_path: String,
    sheet_name: Option<String>,
    start_row: Option<i64>,
    end_row: Option<i64>,
    start_col: Option<String>,
    end_col: Option<String>,
}

#[derive(Serialize)]
struct ReadData {
    rows: SheetSnapshot,
    sheet_name: String,
    total_rows: usize,
}

#[derive(Deserialize)]
struct WriteRequest {
    file_path: String,
    sheet_name: Option<String>,
    data: Vec<Map<String, Value>>,
    start_row: Option<i64>,
    start_col: Option<String>,
}

#[derive(Serialize)]
struct WriteData {
    file_path: String,
    sheet_name: String,
    rows_written: usize,
}

#[derive(Deserialize)]
struct ChartRequest {
    file_path: String,
    sheet_name: Option<String>,
    chart_type: String,
    data_range: String,
    title: Option<String>,
    x_axis_title: Option<String>,
    y_axis_title: Option<String>,
}

#[derive(Serialize)]
struct ChartData {
    file_path: String,
    sheet_name: String,
    chart_type: String,
}

#[derive(Deserialize)]
struct FileInfoQuery {
    file_path: Option<String>,
}

#[derive(Serialize)]
struct HealthData {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Build the HTTP application with its routes and middleware.
pub fn router() -> Router {
    router_with_state(Arc::new(AppState::default()))
}

pub fn router_with_state(state: SharedState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/file-info", get(file_info))
        .route("/read", post(read_excel))
        .route("/write", post(write_excel))
        .route("/chart", post(create_chart));

    Router::new()
        .nest("/api/v1", api)
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(preflight))
        .layer(middleware::from_fn(log_requests))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
}

pub async fn run(config: ServiceConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let app = router();

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    log::info!("{SERVICE_NAME} listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("{SERVICE_NAME} stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("cannot listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("shutdown requested");
}

/// Answer every `OPTIONS` request directly; CORS headers are added outside.
async fn preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    next.run(request).await
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    log::info!(
        "{} {} -> {} ({:?})",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

/// Reject empty strings in fields the request must carry.
fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidRequest(format!("{field} is required")));
    }
    Ok(value)
}

async fn not_found(uri: Uri) -> ServiceError {
    ServiceError::RouteNotFound(uri.path().to_string())
}

async fn health() -> Json<ApiResponse<HealthData>> {
    Json(ApiResponse::ok(
        HealthData {
            status: "healthy",
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
        },
        "Service is running",
    ))
}

async fn read_excel(
    WithRejection(Json(req), _): JsonBody<ReadRequest>,
) -> Result<Json<ApiResponse<ReadData>>> {
    let path = PathBuf::from(required("file_path", &req.file_path)?);
    let data = tokio::task::spawn_blocking(move || -> Result<ReadData> {
        let book = Workbook::open(&path)?;
        let sheet_name = book.resolve_sheet_name(req.sheet_name.as_deref());

        let rows = book.snapshot(&sheet_name)?;
        let rows = table::apply_row_window(rows, req.start_row, req.end_row);
        let rows = table::apply_col_window(rows, req.start_col.as_deref(), req.end_col.as_deref())?;

        Ok(ReadData {
            total_rows: rows.len(),
            rows,
            sheet_name,
        })
    })
    .await??;

    Ok(Json(ApiResponse::ok(data, "Excel file read successfully")))
}

async fn write_excel(
    State(state): State<SharedState>,
    WithRejection(Json(req), _): JsonBody<WriteRequest>,
) -> Result<Json<ApiResponse<WriteData>>> {
    let path = PathBuf::from(required("file_path", &req.file_path)?);
    let layout = table::layout_rows(&req.data, req.start_row, req.start_col.as_deref())?;
    let sheet_name = req
        .sheet_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_SHEET.to_string());

    let _guard = state.locks.acquire(&path).await;

    let rows_written = layout.rows_written;
    log::debug!(
        "writing {rows_written} rows under {:?} to {}!{sheet_name}",
        layout.headers,
        path.display()
    );
    let sheet = sheet_name.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut book = Workbook::open_or_create(&path)?;
        book.ensure_sheet(&sheet)?;
        book.write_cells(&sheet, &layout.cells)?;
        book.save()
    })
    .await??;

    Ok(Json(ApiResponse::ok(
        WriteData {
            file_path: req.file_path,
            sheet_name,
            rows_written,
        },
        "Excel file written successfully",
    )))
}

async fn create_chart(
    State(state): State<SharedState>,
    WithRejection(Json(req), _): JsonBody<ChartRequest>,
) -> Result<Json<ApiResponse<ChartData>>> {
    let path = PathBuf::from(required("file_path", &req.file_path)?);
    required("chart_type", &req.chart_type)?;
    required("data_range", &req.data_range)?;
    let spec = ChartSpec {
        kind: ChartKind::from_request(&req.chart_type),
        data_range: req.data_range,
        title: req.title,
        x_axis_title: req.x_axis_title,
        y_axis_title: req.y_axis_title,
    };
    let requested_sheet = req.sheet_name;

    let _guard = state.locks.acquire(&path).await;

    let sheet_name = tokio::task::spawn_blocking(move || -> Result<String> {
        let mut book = Workbook::read(&path)?;
        let sheet_name = book.resolve_sheet_name(requested_sheet.as_deref());
        chart::insert_chart(&mut book, &sheet_name, &spec)?;
        book.save()?;
        Ok(sheet_name)
    })
    .await??;

    Ok(Json(ApiResponse::ok(
        ChartData {
            file_path: req.file_path,
            sheet_name,
            chart_type: req.chart_type,
        },
        "Chart created successfully",
    )))
}

async fn file_info(
    WithRejection(Query(query), _): WithRejection<Query<FileInfoQuery>, ServiceError>,
) -> Result<Json<ApiResponse<FileInfo>>> {
    let file_path = query
        .file_path
        .filter(|p| !p.is_empty())
        .ok_or(ServiceError::MissingParameter("file_path"))?;

    let info = tokio::task::spawn_blocking(move || info::inspect_file(&PathBuf::from(file_path)))
        .await??;

    Ok(Json(ApiResponse::ok(
        info,
        "Enhanced file info retrieved successfully with structure analysis",
    )))
}
