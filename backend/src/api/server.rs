//! HTTP Server for the Carteira API.
//!
//! The upload form posts a brokerage workbook here; the normalized records
//! come back as JSON and can be sent back to `/api/export` for download.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/normalize`  | Upload workbook for normalization    |
//! | POST   | `/api/export`     | Download records as a workbook       |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderName, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, nothing_to_export_response, ExportRequest, NormalizeResponse};
use crate::error::{ExportError, PipelineError, ServerError};
use crate::export::{export_as, ExportOutcome};
use crate::transform::pipeline::{normalize_bytes_with, NormalizeOptions};
use crate::transform::routing::RoutingTable;

/// Environment variable holding the default port.
pub const PORT_ENV: &str = "CARTEIRA_PORT";

/// Default port when neither `--port` nor `CARTEIRA_PORT` is given.
pub const DEFAULT_PORT: u16 = 3000;

type ApiError = (StatusCode, Json<Value>);

/// Shared server state
pub struct AppState {
    table: RoutingTable,
    busy: BusyFlag,
}

/// Allows one normalization at a time.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

/// Held while a normalization runs; releases the flag on drop.
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl BusyFlag {
    /// Take the flag, or `None` if a run is already in flight.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(Arc::clone(&self.0)))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Build the router. The routing table is resolved here so a bad
/// table stops startup instead of failing every upload.
pub fn router(options: &NormalizeOptions) -> Result<Router, PipelineError> {
    let state = Arc::new(AppState {
        table: options.routing_table()?,
        busy: BusyFlag::default(),
    });

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Ok(Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/normalize", post(normalize_upload))
        .route("/api/export", post(export_records))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state))
}

/// Start the HTTP server
pub async fn start_server(
    port: u16,
    options: NormalizeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(&options)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Carteira server running on http://localhost:{}", port);
    println!("   POST /api/normalize - Upload brokerage workbook");
    println!("   POST /api/export    - Download normalized workbook");
    println!("   GET  /api/logs      - SSE log stream");
    println!("   GET  /health        - Health check");
    if let Some(ref routes) = options.routes_path {
        println!("   Routing table: {}", routes);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "carteira",
        "version": env!("CARGO_PKG_VERSION"),
        "busy": state.busy.is_busy(),
        "endpoints": {
            "normalize": "POST /api/normalize",
            "export": "POST /api/export",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers just skip what they missed
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Map an error to its HTTP status and JSON body.
fn api_error(err: ServerError) -> ApiError {
    let status = match &err {
        ServerError::Pipeline(PipelineError::Workbook(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        ServerError::Pipeline(PipelineError::Export(ExportError::InvalidRecord { .. }))
        | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Busy => StatusCode::CONFLICT,
        ServerError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    // Container and export errors go to the user as one readable line
    let message = match err {
        ServerError::Pipeline(PipelineError::Workbook(e)) => e.to_string(),
        ServerError::Pipeline(PipelineError::Export(e)) => e.to_string(),
        other => other.to_string(),
    };
    log_error(&message);
    (status, Json(error_response(&message)))
}

/// Upload workbook endpoint
async fn normalize_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<NormalizeResponse>, ApiError> {
    let _guard = state
        .busy
        .try_acquire()
        .ok_or_else(|| api_error(ServerError::Busy))?;

    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(ServerError::BadRequest(format!("Multipart error: {}", e))))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| api_error(ServerError::BadRequest(format!("Read error: {}", e))))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes =
        file_data.ok_or_else(|| api_error(ServerError::BadRequest("No file provided".into())))?;

    log_info(format!(
        "📄 New upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let result = normalize_bytes_with(&bytes, &state.table)
        .map_err(|e| api_error(ServerError::from(e)))?;

    Ok(Json(NormalizeResponse::new(result, file_name)))
}

/// Export records endpoint
async fn export_records(Json(request): Json<ExportRequest>) -> Result<Response, ApiError> {
    let today = chrono::Local::now().date_naive();
    let outcome = export_as(&request.records, request.format, today)
        .map_err(|e| api_error(ServerError::from(PipelineError::from(e))))?;

    match outcome {
        ExportOutcome::NothingToExport => {
            log_info("Nothing to export");
            Ok(Json(nothing_to_export_response()).into_response())
        }
        ExportOutcome::Exported(artifact) => {
            log_info(format!(
                "💾 Exported {} records as {}",
                request.records.len(),
                artifact.file_name
            ));
            let headers: [(HeaderName, String); 2] = [
                (header::CONTENT_TYPE, artifact.format.content_type().to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", artifact.file_name),
                ),
            ];
            Ok((headers, artifact.bytes).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{export_file_name, ExportFormat};
    use crate::models::{AssetType, PositionRecord};
    use crate::parser::parse_bytes_auto;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const BOUNDARY: &str = "carteira-upload";
    const POSICAO_XLS: &[u8] = include_bytes!("../../fixtures/posicao.xls");

    fn app() -> Router {
        router(&NormalizeOptions::default()).unwrap()
    }

    fn upload(field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/api/normalize")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn export_request(body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/export")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    fn record(product: &str, quantity: f64) -> PositionRecord {
        PositionRecord {
            product: product.into(),
            quantity,
            updated_value: 2500.0,
            asset_type: AssetType::Equity,
        }
    }

    #[tokio::test]
    async fn test_upload_returns_normalized_records() {
        let response = app().oneshot(upload("file", "posicao.xls", POSICAO_XLS)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: NormalizeResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body.status, "ready");
        assert_eq!(body.records.len(), 2);
        assert_eq!(body.records[0].product, "PETR4");
        assert_eq!(body.metadata.count, 2);
        assert_eq!(body.metadata.workbook.format, "xls");
        assert_eq!(body.metadata.workbook.file_name.as_deref(), Some("posicao.xls"));
        assert_eq!(body.metadata.dropped_rows.get("empty product"), Some(&1));
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let response = app().oneshot(upload("document", "posicao.xls", POSICAO_XLS)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "Invalid request: No file provided");
    }

    #[tokio::test]
    async fn test_upload_not_a_spreadsheet() {
        let response = app()
            .oneshot(upload("file", "posicao.csv", b"Produto;Quantidade\nPETR4;100"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"], "File is not a spreadsheet (expected .xlsx or .xls)");
    }

    #[tokio::test]
    async fn test_export_empty_records() {
        let response = app().oneshot(export_request(json!({ "records": [] }))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body, json!({ "status": "empty", "message": "Nothing to export" }));
    }

    #[tokio::test]
    async fn test_export_returns_dated_attachment() {
        let request = export_request(json!({ "records": [record("PETR4", 100.0)] }));
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], ExportFormat::Xlsx.content_type());
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        let today = export_file_name(ExportFormat::Xlsx, chrono::Local::now().date_naive());
        assert_eq!(disposition, format!("attachment; filename=\"{}\"", today));

        let parsed = parse_bytes_auto(&body_bytes(response).await).unwrap();
        assert_eq!(parsed.sheet_names, vec!["Acoes"]);
        assert_eq!(parsed.workbook.row_count(), 1);
    }

    #[tokio::test]
    async fn test_export_csv_format() {
        let request = export_request(json!({ "records": [record("PETR4", 100.0)], "format": "csv" }));
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            ExportFormat::Csv.content_type()
        );

        let text = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(text.starts_with("product,quantity,updatedValue,assetType"));
    }

    #[tokio::test]
    async fn test_export_rejects_invalid_record() {
        let request = export_request(json!({ "records": [record("PETR4", 100.0), record("", 5.0)] }));
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"], "Record 1: empty product");
    }

    #[test]
    fn test_busy_flag_single_holder() {
        let flag = BusyFlag::default();
        assert!(!flag.is_busy());

        let guard = flag.try_acquire().expect("first acquire");
        assert!(flag.is_busy());
        assert!(flag.try_acquire().is_none());

        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn test_busy_flag_shared_between_clones() {
        let flag = BusyFlag::default();
        let other = flag.clone();
        let _guard = flag.try_acquire().unwrap();
        assert!(other.try_acquire().is_none());
    }

    #[test]
    fn test_api_error_status() {
        let (status, body) = api_error(ServerError::from(PipelineError::from(
            crate::error::WorkbookError::UnknownFormat,
        )));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.0["error"], "File is not a spreadsheet (expected .xlsx or .xls)");

        let (status, _) = api_error(ServerError::Busy);
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = api_error(ServerError::BadRequest("No file provided".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = api_error(ServerError::from(PipelineError::from(
            ExportError::InvalidRecord { index: 0, reason: "empty product" },
        )));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0["error"], "Record 0: empty product");

        let (status, _) = api_error(ServerError::from(PipelineError::from(ExportError::Xlsx(
            "disk full".into(),
        ))));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_router_rejects_bad_routing_table() {
        let options = NormalizeOptions {
            routes_path: Some("/nonexistent/routes.json".into()),
        };
        assert!(matches!(router(&options), Err(PipelineError::Routing(_))));
        assert!(router(&NormalizeOptions::default()).is_ok());
    }
}
