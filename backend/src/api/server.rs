//! HTTP server for the adjustment API.
//!
//! The server is stateless between requests: clients hold the rows and send
//! them back with each action.
//!
//! # API Endpoints
//!
//! | Method | Path           | Description                              |
//! |--------|----------------|------------------------------------------|
//! | GET    | `/health`      | Health check                             |
//! | GET    | `/api/columns` | Export schema and input format help      |
//! | POST   | `/api/input`   | Validate/auto-format the adjustment field|
//! | POST   | `/api/ingest`  | Upload a CSV file (multipart `file`)     |
//! | POST   | `/api/adjust`  | Apply the adjustment to rows             |
//! | POST   | `/api/export`  | Download rows as a spreadsheet           |
//! | POST   | `/api/save`    | Simulated save                           |
//! | GET    | `/api/logs`    | SSE stream for real-time logs            |

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{
    error_response, AdjustRequest, AdjustResponse, ColumnsResponse, ExportRequest,
    IngestResponse, InputRequest, InputResponse, SaveRequest, SaveResponse,
};
use crate::config::{Settings, MAX_UPLOAD_SIZE};
use crate::decimal::input;
use crate::error::{
    ExportError, IngestError, LookupError, PipelineError, ServerError, ServerResult,
    SessionError,
};
use crate::export::CsvSheetWriter;
use crate::lookup::{ConfiguredLookup, LookupSource};
use crate::parser;
use crate::session::Session;
use crate::transform::pipeline::{export_rows, ingest_upload, run_adjustment};

/// Shared, read-only server state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub lookup: ConfiguredLookup,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            lookup: settings.lookup_source(),
            settings,
        }
    }
}

/// Build the router with all routes and layers.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/columns", get(columns))
        .route("/api/input", post(check_input))
        .route("/api/ingest", post(ingest_csv))
        .route("/api/adjust", post(adjust))
        .route("/api/export", post(export))
        .route("/api/save", post(save))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let port = settings.port;
    let state = Arc::new(AppState::new(settings));
    let lookup = state.lookup.clone();
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, lookup = %lookup.describe(), "server listening");
    println!("🚀 nfadjust server running on http://localhost:{}", port);
    println!("   POST /api/ingest - Upload CSV file");
    println!("   POST /api/adjust - Apply decimal adjustment");
    println!("   POST /api/export - Download adjusted rows");
    println!("   GET  /api/logs   - SSE log stream");
    println!("   GET  /health     - Health check");

    axum::serve(listener, app).await?;

    Ok(())
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(err) => match err {
                PipelineError::Ingest(IngestError::NotCsv(_))
                | PipelineError::Adjustment(_)
                | PipelineError::Export(ExportError::NoData)
                | PipelineError::Session(SessionError::NothingToSave) => StatusCode::BAD_REQUEST,
                PipelineError::Session(SessionError::NotProcessed) => StatusCode::CONFLICT,
                PipelineError::Lookup(LookupError::Http(_)) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "nfadjust",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn columns() -> Json<ColumnsResponse> {
    Json(ColumnsResponse::default())
}

async fn check_input(Json(req): Json<InputRequest>) -> Json<InputResponse> {
    Json(input::check(&req.value).into())
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        // Lagged subscriber: skip what was dropped
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload CSV endpoint
async fn ingest_csv(mut multipart: Multipart) -> ServerResult<Json<IngestResponse>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?
                    .to_vec(),
            );
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;
    let file_name = file_name.unwrap_or_default();
    if !parser::is_csv_file_name(&file_name) {
        return Err(PipelineError::from(IngestError::NotCsv(file_name)).into());
    }

    log_info(format!("📄 New upload: {} ({} bytes)", file_name, bytes.len()));
    let parsed = ingest_upload(&bytes);

    Ok(Json(IngestResponse::new(file_name, parsed)))
}

async fn adjust(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdjustRequest>,
) -> ServerResult<Json<AdjustResponse>> {
    let run = run_adjustment(&req.rows, &req.value, req.mode(), &state.lookup).await?;
    Ok(Json(run.into()))
}

async fn export(Json(req): Json<ExportRequest>) -> ServerResult<Response> {
    let now = chrono::Local::now().naive_local();
    let file = export_rows(&req.rows, &CsvSheetWriter::default(), now)?;

    let headers = [
        (header::CONTENT_TYPE, file.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.file_name),
        ),
    ];
    Ok((headers, file.bytes).into_response())
}

async fn save(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveRequest>,
) -> ServerResult<Json<SaveResponse>> {
    let session = Session::from(req);
    let receipt = session
        .save(state.settings.save_delay)
        .await
        .map_err(PipelineError::from)?;
    Ok(Json(receipt.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LookupDocument, LookupEntry};
    use std::io::Write;

    async fn spawn(settings: Settings) -> String {
        let app = router(Arc::new(AppState::new(settings)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn lookup_file() -> tempfile::NamedTempFile {
        let document = LookupDocument {
            items: vec![LookupEntry {
                nf_id: "1234567890".into(),
                num_item: "000001".into(),
                vl_opr_saida: "10,00".into(),
                base: "1.00".into(),
                ..Default::default()
            }],
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&document).unwrap()).unwrap();
        file
    }

    fn settings(lookup: &tempfile::NamedTempFile) -> Settings {
        Settings {
            lookup: lookup.path().display().to_string(),
            save_delay: Duration::ZERO,
            ..Settings::default()
        }
    }

    fn multipart_body(file_name: &str, content: &str) -> (String, String) {
        let boundary = "nfadjust-test-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
            b = boundary,
            f = file_name,
            c = content
        );
        (format!("multipart/form-data; boundary={}", boundary), body)
    }

    #[tokio::test]
    async fn test_health_and_columns() {
        let lookup = lookup_file();
        let base = spawn(settings(&lookup)).await;
        let client = reqwest::Client::new();

        let health: Value = client
            .get(format!("{}/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");

        let columns: Value = client
            .get(format!("{}/api/columns", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(columns["columns"][0]["label"], "NF_ID");
    }

    #[tokio::test]
    async fn test_input_endpoint() {
        let lookup = lookup_file();
        let base = spawn(settings(&lookup)).await;

        let res: Value = reqwest::Client::new()
            .post(format!("{}/api/input", base))
            .json(&json!({ "value": "3,500" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(res["value"], "3,50");
        assert_eq!(res["state"], "success");
        assert!(res["hint"].is_null());
    }

    #[tokio::test]
    async fn test_ingest_adjust_export_save() {
        let lookup = lookup_file();
        let base = spawn(settings(&lookup)).await;
        let client = reqwest::Client::new();

        // Ingest
        let (content_type, body) =
            multipart_body("notas.csv", "NF_ID;NUM_ITEM\n1234567890;1\n1234567890;2\nabc;1");
        let ingested: Value = client
            .post(format!("{}/api/ingest", base))
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(ingested["rows"].as_array().unwrap().len(), 2);
        assert_eq!(ingested["errors"][0]["line"], 4);

        // Adjust
        let res = client
            .post(format!("{}/api/adjust", base))
            .json(&json!({ "rows": ingested["rows"], "value": "0,50", "increase": true }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let adjusted: Value = res.json().await.unwrap();
        assert_eq!(adjusted["adjustment"], "+0,50");
        assert_eq!(adjusted["matchedCount"], 1);
        assert_eq!(adjusted["unmatchedCount"], 1);
        assert_eq!(adjusted["rows"][0]["vlOprSaida"], "10,50");
        assert_eq!(adjusted["rows"][0]["base"], "1,50");
        assert_eq!(adjusted["rows"][1]["vlOprSaida"], "");

        // Export
        let res = client
            .post(format!("{}/api/export", base))
            .json(&json!({ "rows": adjusted["rows"] }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let disposition = res.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"dados_ajustados_"));
        let csv = res.text().await.unwrap();
        assert!(csv.contains("1234567890;000001;10,50;"));

        // Save
        let saved: Value = client
            .post(format!("{}/api/save", base))
            .json(&json!({ "rows": adjusted["rows"], "processed": true }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(saved["saved"], 2);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let lookup = lookup_file();
        let base = spawn(settings(&lookup)).await;
        let client = reqwest::Client::new();

        let (content_type, body) = multipart_body("notas.txt", "NF_ID;NUM_ITEM\n");
        let res = client
            .post(format!("{}/api/ingest", base))
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err: Value = res.json().await.unwrap();
        assert_eq!(err["error"], "Apenas arquivos CSV são permitidos.");

        let res = client
            .post(format!("{}/api/adjust", base))
            .json(&json!({ "rows": [], "value": "50" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = client
            .post(format!("{}/api/export", base))
            .json(&json!({ "rows": [] }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err: Value = res.json().await.unwrap();
        assert_eq!(err["error"], "Não há dados para exportar.");

        let res = client
            .post(format!("{}/api/save", base))
            .json(&json!({ "rows": [], "processed": false }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = client
            .post(format!("{}/api/save", base))
            .json(&json!({ "rows": [], "processed": true }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err: Value = res.json().await.unwrap();
        assert_eq!(err["error"], "Não há dados para salvar.");

        // Client rows go through the same checks as ingested ones
        for row in [
            json!({ "nfId": "abc", "numItem": "1" }),
            json!({ "nfId": "1234567890", "numItem": "1" }),
        ] {
            let res = client
                .post(format!("{}/api/adjust", base))
                .json(&json!({ "rows": [row], "value": "0,50" }))
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[tokio::test]
    async fn test_missing_lookup_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn(Settings {
            lookup: dir.path().join("absent.json").display().to_string(),
            ..Settings::default()
        })
        .await;

        let res = reqwest::Client::new()
            .post(format!("{}/api/adjust", base))
            .json(&json!({ "rows": [], "value": "0,50" }))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err: Value = res.json().await.unwrap();
        assert!(err["error"]
            .as_str()
            .unwrap()
            .starts_with("Ocorreu um erro ao processar os dados"));
    }
}
