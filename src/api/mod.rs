use axum::{
    Router,
    extract::{Json, Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    CaseLedgers, Edit, EditError, Milestone, SoADocument, WaterfallResult, compute,
    compute_with_chart, format_capital, format_money, format_prescribed_part,
};
use crate::report::render_html;
use crate::store::{
    Computed, MemoryRepository, OutboxConfig, RetryPolicy, ServiceError, SoaService, StoreError,
    heal_document,
};

#[derive(Debug, Parser)]
#[command(
    name = "soa",
    version,
    about = "Statement of Affairs waterfall engine: HTTP API, calculator and report export"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    #[arg(long, global = true, env = "SOA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Compute a statement read from a JSON file and print the waterfall.
    Compute(ComputeArgs),
    /// Render a statement read from a JSON file as HTML.
    Report(ReportArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "SOA_PORT", default_value_t = 8080)]
    pub port: u16,
    #[arg(
        long,
        env = "SOA_DEBOUNCE_MS",
        default_value_t = 750,
        help = "Quiet period before queued edits are written"
    )]
    pub debounce_ms: u64,
    #[arg(long, env = "SOA_MAX_RETRIES", default_value_t = 4)]
    pub max_retries: u32,
    #[arg(
        long,
        env = "SOA_INITIAL_BACKOFF_MS",
        default_value_t = 200,
        help = "First retry delay; doubles on each further attempt"
    )]
    pub initial_backoff_ms: u64,
    #[arg(long, help = "JSON object of case id to ledgers, loaded at start-up")]
    pub ledgers: Option<PathBuf>,
}

impl ServeArgs {
    pub fn outbox_config(&self) -> OutboxConfig {
        OutboxConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            },
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ComputeArgs {
    #[arg(long)]
    pub document: PathBuf,
    #[arg(long, help = "Chart of accounts as a JSON object of code to description")]
    pub chart: Option<PathBuf>,
    #[arg(long, help = "Print the full result as JSON")]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    #[arg(long)]
    pub document: PathBuf,
    #[arg(long, help = "Chart of accounts as a JSON object of code to description")]
    pub chart: Option<PathBuf>,
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Store(err) => ApiError::Store(err),
            ServiceError::Edit(err) => ApiError::Edit(err),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Json(_) => StatusCode::BAD_REQUEST,
            ApiError::Edit(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(
                StoreError::RateLimited | StoreError::QueueClosed | StoreError::Exhausted { .. },
            ) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(StoreError::Network(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Store(StoreError::Serialization(_)) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_response(self.status(), &self.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeResponse<'a> {
    result: &'a WaterfallResult,
    milestones: Vec<Milestone>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CaseResponse {
    #[serde(flatten)]
    computed: Computed,
    milestones: Vec<Milestone>,
}

impl From<Computed> for CaseResponse {
    fn from(computed: Computed) -> Self {
        let milestones = computed.result.milestones();
        Self {
            computed,
            milestones,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EditRequest {
    edits: Vec<Edit>,
}

#[derive(Clone)]
pub struct AppState {
    service: Arc<SoaService<MemoryRepository>>,
}

impl AppState {
    pub fn new(service: Arc<SoaService<MemoryRepository>>) -> Self {
        Self { service }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/compute", post(compute_handler))
        .route("/api/report", post(report_handler))
        .route(
            "/api/cases/:case_id/soa",
            get(load_handler).put(save_handler).patch(edit_handler),
        )
        .route("/api/cases/:case_id/soa/versions", post(new_version_handler))
        .route(
            "/api/cases/:case_id/soa/sync/creditors",
            post(sync_creditors_handler),
        )
        .route(
            "/api/cases/:case_id/soa/sync/shareholders",
            post(sync_shareholders_handler),
        )
        .route("/api/cases/:case_id/soa/report", get(case_report_handler))
        .route("/api/cases/:case_id/ledgers", put(ledgers_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(args: ServeArgs) -> Result<(), ApiError> {
    let ledgers = match &args.ledgers {
        Some(path) => read_json::<HashMap<String, CaseLedgers>>(path)?,
        None => HashMap::new(),
    };
    let cases = ledgers.len();
    let repo = Arc::new(MemoryRepository::with_ledgers(ledgers));
    let service = Arc::new(SoaService::new(repo, args.outbox_config()));
    let app = router(AppState::new(service.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, cases, debounce_ms = args.debounce_ms, "SoA HTTP API listening");
    info!("Local access: http://127.0.0.1:{}/api/compute", args.port);

    axum::serve(listener, app).await?;
    service.flush().await;
    Ok(())
}

/// Computes a statement file; returns the text to print.
pub fn run_compute(args: &ComputeArgs) -> Result<String, ApiError> {
    let document = read_document(&args.document)?;
    let chart = read_chart(args.chart.as_deref())?;
    let (_, result) = evaluate(&document, chart.as_ref());

    if args.json {
        let response = ComputeResponse {
            milestones: result.milestones(),
            result: &result,
        };
        return Ok(serde_json::to_string_pretty(&response)?);
    }

    let mut lines = vec![format!(
        "Statement of Affairs {} (version {})",
        document.case_id, document.version
    )];
    let milestones = result.milestones();
    for milestone in &milestones {
        lines.push(format!(
            "{:<68} {:>14}",
            milestone.label,
            format_money(milestone.amount)
        ));
        if milestone.key == "afterSecondaryPreferential" {
            lines.push(format!(
                "{:<68} {:>14}",
                "Prescribed part",
                format_prescribed_part(result.prescribed_part)
            ));
        }
        if milestone.key == "afterUnsecured" {
            lines.push(format!(
                "{:<68} {:>14}",
                "Issued and called up capital",
                format_capital(result.called_up_capital)
            ));
        }
    }
    for warning in &result.warnings {
        lines.push(format!("warning: {warning}"));
    }
    Ok(lines.join("\n"))
}

pub fn run_report(args: &ReportArgs) -> Result<(), ApiError> {
    let document = read_document(&args.document)?;
    let chart = read_chart(args.chart.as_deref())?;
    let (document, result) = evaluate(&document, chart.as_ref());
    let html = render_html(&document, &result);
    std::fs::write(&args.out, html)?;
    info!(out = %args.out.display(), "Report written");
    Ok(())
}

/// Computes with asset coding when a chart of accounts is supplied.
fn evaluate(
    document: &SoADocument,
    chart: Option<&BTreeMap<String, String>>,
) -> (SoADocument, WaterfallResult) {
    match chart {
        Some(chart) => compute_with_chart(document, chart),
        None => (document.clone(), compute(document)),
    }
}

fn read_chart(path: Option<&FsPath>) -> Result<Option<BTreeMap<String, String>>, ApiError> {
    path.map(read_json).transpose()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &FsPath) -> Result<T, ApiError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Statement files go through the same healing as stored records.
fn read_document(path: &FsPath) -> Result<SoADocument, ApiError> {
    let raw: serde_json::Value = read_json(path)?;
    let case_id = raw
        .get("caseId")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();
    let (document, _) = heal_document(&case_id, raw);
    Ok(document)
}

/// Body of the stateless endpoints: a bare statement, or a statement wrapped
/// with the chart of accounts to code it against.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatementRequest {
    Charted {
        document: SoADocument,
        #[serde(rename = "chartOfAccounts")]
        chart_of_accounts: Option<BTreeMap<String, String>>,
    },
    Bare(SoADocument),
}

impl StatementRequest {
    fn evaluate(self) -> (SoADocument, WaterfallResult) {
        match self {
            StatementRequest::Charted {
                document,
                chart_of_accounts,
            } => evaluate(&document, chart_of_accounts.as_ref()),
            StatementRequest::Bare(document) => evaluate(&document, None),
        }
    }
}

fn statement_from(
    payload: Result<Json<StatementRequest>, JsonRejection>,
) -> Result<StatementRequest, ApiError> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn document_from(payload: Result<Json<SoADocument>, JsonRejection>) -> Result<SoADocument, ApiError> {
    payload
        .map(|Json(document)| document)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn compute_handler(payload: Result<Json<StatementRequest>, JsonRejection>) -> Response {
    let (_, result) = match statement_from(payload) {
        Ok(request) => request.evaluate(),
        Err(err) => return err.into_response(),
    };
    json_response(
        StatusCode::OK,
        ComputeResponse {
            milestones: result.milestones(),
            result: &result,
        },
    )
}

async fn report_handler(payload: Result<Json<StatementRequest>, JsonRejection>) -> Response {
    match statement_from(payload) {
        Ok(request) => {
            let (document, result) = request.evaluate();
            with_cache_control(Html(render_html(&document, &result)))
        }
        Err(err) => err.into_response(),
    }
}

async fn load_handler(State(state): State<AppState>, Path(case_id): Path<String>) -> Response {
    case_response(StatusCode::OK, state.service.load(&case_id).await)
}

async fn save_handler(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    payload: Result<Json<SoADocument>, JsonRejection>,
) -> Response {
    let document = match document_from(payload) {
        Ok(document) => document,
        Err(err) => return err.into_response(),
    };
    case_response(StatusCode::OK, state.service.save(&case_id, document).await)
}

async fn edit_handler(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    payload: Result<Json<EditRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };
    case_response(StatusCode::OK, state.service.edit(&case_id, request.edits).await)
}

async fn new_version_handler(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Response {
    case_response(StatusCode::CREATED, state.service.new_version(&case_id).await)
}

async fn sync_creditors_handler(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Response {
    case_response(StatusCode::OK, state.service.sync_creditors(&case_id).await)
}

async fn sync_shareholders_handler(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Response {
    case_response(StatusCode::OK, state.service.sync_shareholders(&case_id).await)
}

async fn case_report_handler(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Response {
    match state.service.load(&case_id).await {
        Ok(computed) => with_cache_control(Html(render_html(&computed.document, &computed.result))),
        Err(err) => ApiError::from(err).into_response(),
    }
}

async fn ledgers_handler(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    payload: Result<Json<CaseLedgers>, JsonRejection>,
) -> Response {
    let ledgers = match payload {
        Ok(Json(ledgers)) => ledgers,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };
    state
        .service
        .repository()
        .put_ledgers(&case_id, ledgers.clone())
        .await;
    info!(%case_id, creditors = ledgers.creditors.len(), "Ledgers replaced");
    json_response(StatusCode::OK, ledgers)
}

fn case_response(status: StatusCode, outcome: Result<Computed, ServiceError>) -> Response {
    match outcome {
        Ok(computed) => json_response(status, CaseResponse::from(computed)),
        Err(err) => ApiError::from(err).into_response(),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let repo = Arc::new(MemoryRepository::default());
        let service = Arc::new(SoaService::new(repo, OutboxConfig::default()));
        router(AppState::new(service))
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Response) {
        let response = app.clone().oneshot(req).await.expect("response");
        (response.status(), response)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn worked_example() -> Value {
        json!({
            "caseId": "case-1",
            "scheduleA": {
                "chargeHolderSections": [{
                    "id": "s1",
                    "assets": [{ "id": "a1", "description": "Plant", "estimatedToRealise": "60000" }],
                    "claims": [{ "id": "c1", "name": "Lender", "amount": "50000" }],
                    "fixedChargeSurplus": 10000
                }],
                "globalAssets": {
                    "floating": [{ "id": "a2", "estimatedToRealise": 5000 }],
                    "uncharged": [{ "id": "a3", "estimatedToRealise": "2,000" }]
                }
            },
            "scheduleC": {
                "companyCreditors": [{
                    "id": "cr1", "name": "Supplies Ltd", "creditorType": "unsecured",
                    "unsecuredCreditorType": "trade_expense", "balanceOwed": 4000
                }],
                "employeeCreditors": [{ "id": "e1", "name": "A Worker", "totalPreferentialClaim": 3000 }]
            }
        })
    }

    #[tokio::test]
    async fn compute_returns_every_milestone() {
        let app = app();
        let (status, response) =
            send(&app, request("POST", "/api/compute", Some(worked_example()))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
        let body = json_body(response).await;
        assert_eq!(body["result"]["assetsForPreferential"], "17000");
        assert_eq!(body["result"]["assetsForFloating"], "8200");
        assert_eq!(body["result"]["afterMembers"], "10000");
        assert_eq!(body["result"]["warnings"], json!([]));
        let milestones = body["milestones"].as_array().expect("milestones");
        assert_eq!(milestones.len(), 10);
        assert_eq!(milestones[9]["key"], "afterMembers");
    }

    #[tokio::test]
    async fn malformed_body_is_a_json_error() {
        let app = app();
        let req = Request::builder()
            .method("POST")
            .uri("/api/compute")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .expect("request");
        let (status, response) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = app();
        let (status, response) = send(&app, request("GET", "/nope", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Not found");
    }

    #[tokio::test]
    async fn case_lifecycle_over_http() {
        let app = app();
        let ledgers = json!({
            "creditors": [{ "id": "cr1", "name": "Supplies Ltd", "creditorType": "unsecured", "balanceOwed": 900 }],
            "shareholders": [{ "id": "sh1", "name": "Founder", "amountPaid": 100 }]
        });
        let (status, _) = send(
            &app,
            request("PUT", "/api/cases/case-5/ledgers", Some(ledgers)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, response) = send(&app, request("GET", "/api/cases/case-5/soa", None)).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["document"]["caseId"], "case-5");
        assert_eq!(body["result"]["afterMembers"], "-1000");

        let edits = json!({ "edits": [
            { "op": "upsertAsset", "location": { "pool": "uncharged" },
              "asset": { "id": "cash", "description": "Cash", "estimatedToRealise": 1500 } }
        ]});
        let (status, response) =
            send(&app, request("PATCH", "/api/cases/case-5/soa", Some(edits))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(response).await["result"]["afterMembers"], "500");

        let (status, response) = send(
            &app,
            request("POST", "/api/cases/case-5/soa/versions", None),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json_body(response).await["document"]["version"], 2);

        let (status, response) =
            send(&app, request("GET", "/api/cases/case-5/soa/report", None)).await;
        assert_eq!(status, StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/html"));
    }

    #[tokio::test]
    async fn invalid_edit_is_unprocessable() {
        let app = app();
        let edits = json!({ "edits": [{ "op": "removeSection", "sectionId": "ghost" }] });
        let (status, response) =
            send(&app, request("PATCH", "/api/cases/case-1/soa", Some(edits))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            json_body(response).await["error"],
            "unknown charge section ghost"
        );
    }

    #[tokio::test]
    async fn sync_restores_schedule_c_from_ledgers() {
        let app = app();
        let ledgers = json!({ "creditors": [{ "id": "cr1", "name": "Supplies Ltd" }] });
        send(&app, request("PUT", "/api/cases/c9/ledgers", Some(ledgers))).await;
        let edits = json!({ "edits": [{ "op": "removeCreditor", "ledger": "company", "creditorId": "cr1" }] });
        let (_, response) = send(&app, request("PATCH", "/api/cases/c9/soa", Some(edits))).await;
        assert_eq!(
            json_body(response).await["document"]["scheduleC"]["companyCreditors"],
            json!([])
        );

        let (status, response) = send(
            &app,
            request("POST", "/api/cases/c9/soa/sync/creditors", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["document"]["scheduleC"]["companyCreditors"][0]["id"], "cr1");
    }

    #[test]
    fn cli_reads_serve_defaults() {
        let cli = Cli::try_parse_from(["soa", "serve", "--max-retries", "2"]).expect("parse");
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.max_retries, 2);
        let config = args.outbox_config();
        assert_eq!(config.retry.max_retries, 2);
        assert!(config.debounce > Duration::ZERO);
    }

    #[test]
    fn compute_command_prints_milestones() {
        let dir = std::env::temp_dir().join(format!("soa-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("document.json");
        std::fs::write(&path, worked_example().to_string()).expect("write fixture");

        let text = run_compute(&ComputeArgs {
            document: path.clone(),
            chart: None,
            json: false,
        })
        .expect("compute");
        assert!(text.contains("Statement of Affairs case-1 (version 1)"));
        assert!(text.contains("5,800"));
        assert!(text.lines().last().unwrap_or_default().ends_with("10,000"));

        let out = dir.join("report.html");
        run_report(&ReportArgs {
            document: path,
            chart: None,
            out: out.clone(),
        })
        .expect("report");
        let html = std::fs::read_to_string(out).expect("read report");
        assert!(html.contains("D &ndash; Members"));
    }

    fn coded_example() -> Value {
        let mut document = worked_example();
        document["scheduleA"]["globalAssets"]["floating"][0]["accountCode"] = json!("7777");
        document
    }

    #[test]
    fn report_command_codes_assets_against_chart() {
        let dir = std::env::temp_dir().join(format!("soa-chart-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("document.json");
        std::fs::write(&path, coded_example().to_string()).expect("write fixture");
        let chart = dir.join("chart.json");
        std::fs::write(&chart, json!({ "1000": "Stock" }).to_string()).expect("write chart");

        let out = dir.join("report.html");
        run_report(&ReportArgs {
            document: path,
            chart: Some(chart),
            out: out.clone(),
        })
        .expect("report");
        let html = std::fs::read_to_string(out).expect("read report");
        assert!(html.contains("account code &#39;7777&#39; not in chart"));

        let cli = Cli::try_parse_from([
            "soa", "report", "--document", "d.json", "--chart", "c.json", "--out", "r.html",
        ])
        .expect("parse");
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.chart, Some(PathBuf::from("c.json")));
    }

    #[tokio::test]
    async fn report_endpoint_accepts_chart_of_accounts() {
        let app = app();
        let body = json!({ "document": coded_example(), "chartOfAccounts": { "1000": "Stock" } });
        let (status, response) = send(&app, request("POST", "/api/report", Some(body))).await;
        assert_eq!(status, StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let html = String::from_utf8(bytes.to_vec()).expect("utf-8");
        assert!(html.contains("account code &#39;7777&#39; not in chart"));

        let (_, response) = send(&app, request("POST", "/api/compute", Some(coded_example()))).await;
        assert_eq!(json_body(response).await["result"]["warnings"], json!([]));
    }
}
