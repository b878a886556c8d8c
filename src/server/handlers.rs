use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::models::{
    BlockPayload, ErrorResponse, NavigateRequest, NavigateResponse, NotebookAddRequest,
    NotebookResponse, PhaseResponse, ReselectRequest, ScanRequest, ScanResponse, SessionRequest,
    SpeakRequest, SpeakResponse, TextResponse, TranslateRequest, TranslationResponse,
};
use super::state::{ServerState, SessionRegistry};
use crate::gateways::{GatewayError, OcrGateway, SpeechGateway, TranslateGateway};
use crate::geometry::{block_extent, cluster, normalize, ClusterThresholds, ScaleFactors};
use crate::media;
use crate::notebook::Notebook;
use crate::session::ScanSession;
use crate::settings::Settings;

pub async fn run_server(settings: Settings, addr: String) -> Result<()> {
    let client = reqwest::Client::new();
    let state = Arc::new(ServerState {
        ocr: OcrGateway::new(client.clone(), &settings),
        translator: TranslateGateway::new(client.clone(), &settings),
        speech: SpeechGateway::new(client.clone(), &settings),
        client,
        settings,
        sessions: Mutex::new(SessionRegistry::default()),
        notebook: Mutex::new(Notebook::new()),
    });
    let app = Router::new()
        .route("/health", get(health))
        .route("/scan", post(scan))
        .route("/reselect", post(reselect))
        .route("/edit", post(edit))
        .route("/close-edit", post(close_edit))
        .route("/dismiss", post(dismiss))
        .route("/translate", post(translate))
        .route("/speak", post(speak))
        .route("/navigate", post(navigate))
        .route("/notebook/add", post(notebook_add))
        .route("/notebook", get(notebook_list))
        .route("/notebook/translate", post(notebook_translate))
        .route("/notebook/clear", post(notebook_clear))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| "failed to bind server address")?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::internal(err.to_string())
    }
}

impl From<GatewayError> for ServerError {
    fn from(err: GatewayError) -> Self {
        let status = match &err {
            GatewayError::Transport(_) => StatusCode::BAD_GATEWAY,
            GatewayError::EmptyResult(_) => StatusCode::NOT_FOUND,
            GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        };
        Self {
            status,
            message: err.message().to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, ServerError> {
    mutex
        .lock()
        .map_err(|_| ServerError::internal("state lock poisoned"))
}

async fn scan(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ServerError> {
    let page_url = payload
        .page_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ServerError::bad_request("page_url is required"))?
        .to_string();
    let rendered = (
        payload.rendered_w.unwrap_or(0.0),
        payload.rendered_h.unwrap_or(0.0),
    );
    if rendered.0 <= 0.0 || rendered.1 <= 0.0 {
        return Err(ServerError::bad_request(
            "rendered_w and rendered_h must be positive",
        ));
    }

    let frame = match (payload.url.as_deref(), payload.data_base64.as_deref()) {
        (Some(url), None) => media::fetch_media(&state.client, url)
            .await
            .map_err(|err| ServerError::unprocessable(err.to_string()))?,
        (None, Some(data)) => media::frame_from_base64(data)
            .map_err(|err| ServerError::bad_request(err.to_string()))?,
        _ => {
            return Err(ServerError::bad_request(
                "exactly one of url or data_base64 is required",
            ));
        }
    };

    let mut session = ScanSession::new(&page_url, &frame, rendered);
    let raw = state.ocr.scan(&frame).await?;
    let words = normalize(raw, state.settings.row_band);
    let blocks = cluster(
        &words,
        ClusterThresholds {
            same_line: state.settings.same_line,
            next_line: state.settings.next_line,
        },
    );
    let scale = ScaleFactors::new(
        (frame.width as f64, frame.height as f64),
        block_extent(&blocks),
        rendered,
    )
    .map_err(|err| ServerError::unprocessable(err.to_string()))?;
    session.overlay(words, blocks, scale)?;

    let response = ScanResponse {
        session_id: session.id.clone(),
        words: session.words.clone(),
        blocks: session
            .blocks
            .iter()
            .map(|block| BlockPayload {
                text: block.text.clone(),
                bbox: block.bbox,
                screen_bbox: scale.to_screen(&block.bbox),
            })
            .collect(),
    };
    lock(&state.sessions)?.insert(session);
    Ok(Json(response))
}

async fn reselect(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<ReselectRequest>,
) -> Result<Json<TextResponse>, ServerError> {
    let registry = lock(&state.sessions)?;
    let session = registry
        .get(&payload.session_id)
        .ok_or_else(|| ServerError::not_found("unknown session"))?;
    let text = session
        .reselect(&payload.rect)
        .map_err(|err| ServerError::conflict(err.to_string()))?;
    Ok(Json(TextResponse { text }))
}

async fn edit(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<PhaseResponse>, ServerError> {
    transition(&state, &payload.session_id, ScanSession::begin_edit)
}

async fn close_edit(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<PhaseResponse>, ServerError> {
    transition(&state, &payload.session_id, ScanSession::close_edit)
}

async fn dismiss(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<PhaseResponse>, ServerError> {
    transition(&state, &payload.session_id, ScanSession::dismiss)
}

fn transition(
    state: &ServerState,
    session_id: &str,
    apply: fn(&mut ScanSession) -> Result<()>,
) -> Result<Json<PhaseResponse>, ServerError> {
    let mut registry = lock(&state.sessions)?;
    let session = registry
        .get_mut(session_id)
        .ok_or_else(|| ServerError::not_found("unknown session"))?;
    apply(session).map_err(|err| ServerError::conflict(err.to_string()))?;
    Ok(Json(PhaseResponse {
        phase: session.phase().as_str(),
    }))
}

async fn translate(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<TranslateRequest>,
) -> Result<Json<TranslationResponse>, ServerError> {
    let text = require_text(&payload.text)?;
    let translation = state.translator.translate(text).await?;
    Ok(Json(TranslationResponse { translation }))
}

async fn speak(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<SpeakRequest>,
) -> Result<Json<SpeakResponse>, ServerError> {
    let text = require_text(&payload.text)?;
    let audio = state.speech.synthesize(text).await?;
    Ok(Json(SpeakResponse {
        audio: BASE64.encode(&audio),
    }))
}

async fn navigate(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<NavigateRequest>,
) -> Result<Json<NavigateResponse>, ServerError> {
    let invalidated = lock(&state.sessions)?.navigate(payload.page_url.trim());
    Ok(Json(NavigateResponse { invalidated }))
}

async fn notebook_add(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<NotebookAddRequest>,
) -> Result<Json<NotebookResponse>, ServerError> {
    let text = require_text(&payload.text)?.to_string();
    let mut notebook = lock(&state.notebook)?;
    notebook.add(&text);
    Ok(Json(NotebookResponse {
        lines: notebook.lines().to_vec(),
    }))
}

async fn notebook_list(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<NotebookResponse>, ServerError> {
    let notebook = lock(&state.notebook)?;
    Ok(Json(NotebookResponse {
        lines: notebook.lines().to_vec(),
    }))
}

async fn notebook_translate(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<TranslationResponse>, ServerError> {
    let script = lock(&state.notebook)?.script();
    if script.is_empty() {
        return Err(ServerError::bad_request("notebook is empty"));
    }
    let translation = state.translator.translate(&script).await?;
    Ok(Json(TranslationResponse { translation }))
}

async fn notebook_clear(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<NotebookResponse>, ServerError> {
    let mut notebook = lock(&state.notebook)?;
    notebook.clear();
    Ok(Json(NotebookResponse { lines: Vec::new() }))
}

fn require_text(text: &str) -> Result<&str, ServerError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ServerError::bad_request("text is required"));
    }
    Ok(trimmed)
}
