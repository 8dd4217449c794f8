use crate::{
    config::Config,
    content::{self, FileDescriptor},
    errors::{AppError, AppResult},
    extract::Extractors,
    root::{RootHandle, RootInfo},
    security,
    tree::{DirectoryNode, Enumerator, Listing},
};
use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub root: RootHandle,
    pub extractors: Arc<Extractors>,
}

impl AppState {
    pub fn new(cfg: Config, root: RootHandle, extractors: Extractors) -> Self {
        Self { cfg: Arc::new(cfg), root, extractors: Arc::new(extractors) }
    }
}

pub async fn serve(shared: AppState) -> anyhow::Result<()> {
    let addr: std::net::SocketAddr = format!("{}:{}", shared.cfg.server.bind_addr, shared.cfg.server.port)
        .parse()
        .context("parsing bind address")?;
    let app = build_router(shared);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(shared: AppState) -> Router {
    let limit_bytes = shared.cfg.limits.max_request_kb * 1024;
    Router::new()
        .route("/healthz", get(health))
        .route(
            "/api/set-root",
            post(set_root).layer(RequestBodyLimitLayer::new(limit_bytes)),
        )
        .route("/api/root-info", get(root_info))
        .route("/api/structure", get(structure))
        .route("/api/folders", get(structure))
        .route("/api/folders/*path", get(folders))
        .route("/api/home-structure", get(home_structure))
        .route("/api/file/*path", get(file))
        .route("/api/download/*path", get(download))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRootRequest {
    pub folder_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRootResponse {
    pub success: bool,
    pub root_path: String,
    pub folder_name: String,
}

async fn set_root(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SetRootRequest>, JsonRejection>,
) -> Response {
    let audit = Audit::start("set-root", "");
    audit.finish(apply_root(&state, &headers, body).await.map(Json))
}

async fn apply_root(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Json<SetRootRequest>, JsonRejection>,
) -> AppResult<SetRootResponse> {
    security::content_length_ok(headers, state.cfg.limits.max_request_kb)?;
    let Json(req) = body.map_err(|rej| match rej.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::RequestTooLarge,
        _ => AppError::BadRequest(rej.body_text()),
    })?;
    let info = state.root.set(&PathBuf::from(req.folder_path.trim())).await?;
    Ok(SetRootResponse {
        success: true,
        root_path: info.root_path.unwrap_or_default(),
        folder_name: info.folder_name.unwrap_or_default(),
    })
}

async fn root_info(State(state): State<AppState>) -> Json<RootInfo> {
    Json(state.root.info().await)
}

async fn structure(State(state): State<AppState>) -> Response {
    let audit = Audit::start("structure", "");
    audit.finish(list(&state, "").await.map(Json))
}

async fn folders(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let audit = Audit::start("folders", &path);
    audit.finish(list(&state, &path).await.map(Json))
}

async fn home_structure(State(state): State<AppState>) -> Response {
    let audit = Audit::start("home-structure", "");
    audit.finish(tree(&state).await.map(Json))
}

async fn file(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let audit = Audit::start("file", &path);
    audit.finish(describe(&state, &path).await.map(Json))
}

async fn download(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let audit = Audit::start("download", &path);
    audit.finish(fetch(&state, &path).await)
}

async fn list(state: &AppState, rel: &str) -> AppResult<Listing> {
    let root = state.root.require().await?;
    let dir = security::resolve(&root, rel)?;
    let cfg = state.cfg.clone();
    tokio::task::spawn_blocking(move || {
        if !dir.is_dir() {
            return Err(AppError::NotADirectory);
        }
        Enumerator::new(&root, &cfg.browse)
            .list_level(&dir)
            .map_err(|e| AppError::from_io(&e))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
}

async fn tree(state: &AppState) -> AppResult<DirectoryNode> {
    let root = state.root.require().await?;
    let cfg = state.cfg.clone();
    tokio::task::spawn_blocking(move || {
        Enumerator::new(&root, &cfg.browse)
            .folder_tree(&root)
            .map_err(|e| AppError::from_io(&e))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
}

async fn describe(state: &AppState, rel: &str) -> AppResult<FileDescriptor> {
    let root = state.root.require().await?;
    let full = security::resolve(&root, rel)?;
    let display = security::relative_display(&root, &full);
    content::read_content(&full, display, &state.extractors).await
}

async fn fetch(state: &AppState, rel: &str) -> AppResult<Response> {
    let root = state.root.require().await?;
    let full = security::resolve(&root, rel)?;
    let meta = tokio::fs::metadata(&full).await.map_err(|e| AppError::from_io(&e))?;
    if meta.is_dir() {
        return Err(AppError::NotAFile);
    }
    let data = tokio::fs::read(&full).await.map_err(|e| AppError::from_io(&e))?;
    let name = full
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, attachment_disposition(&name)),
        ],
        Bytes::from(data),
    )
        .into_response())
}

/// `attachment` disposition with an ASCII fallback name and an RFC 5987 UTF-8 name.
pub fn attachment_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect();
    let encoded = urlencoding::encode(name);
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

struct Audit<'a> {
    request_id: String,
    route: &'static str,
    target: &'a str,
    started: Instant,
}

impl<'a> Audit<'a> {
    fn start(route: &'static str, target: &'a str) -> Self {
        Self { request_id: uuid::Uuid::new_v4().to_string(), route, target, started: Instant::now() }
    }

    fn finish<T: IntoResponse>(self, result: AppResult<T>) -> Response {
        let duration_ms = self.started.elapsed().as_millis() as u64;
        match result {
            Ok(body) => {
                self.log("allow", "OK", duration_ms);
                body.into_response()
            }
            Err(e) => {
                let decision = if e.status().is_client_error() { "deny" } else { "error" };
                self.log(decision, e.code(), duration_ms);
                e.into_response()
            }
        }
    }

    fn log(&self, decision: &str, code: &str, duration_ms: u64) {
        tracing::info!(
            request_id = %self.request_id,
            route = self.route,
            target = self.target,
            decision = decision,
            code = code,
            duration_ms = duration_ms,
            "audit"
        );
    }
}
