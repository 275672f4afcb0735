//! HTTP API server.
//!
//! Exposes the course/notes/chat surface over JSON. Identity is an opaque
//! owner id supplied by the external session service in the `X-User-Id`
//! header; the [`OwnerId`] extractor is the single subscription point for
//! it, and every query below is scoped by it.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness + version |
//! | `GET`  | `/courses` | List the owner's courses |
//! | `POST` | `/courses` | Create a course |
//! | `DELETE` | `/courses/{id}` | Delete a course, its texts, and raw files |
//! | `GET`  | `/courses/{id}/notes` | List notes with extracted text |
//! | `POST` | `/courses/{id}/notes` | Multipart upload: store, extract, upsert |
//! | `DELETE` | `/courses/{id}/notes/{file_name}` | Remove one note |
//! | `POST` | `/courses/{id}/chat` | Chat with course notes as LLM context |
//! | `POST` | `/extract` | Stateless extraction: multipart `file` → `{text}` |
//!
//! # Error Contract
//!
//! Error responses are `{ "error": "<message>" }` with 400 for bad input or
//! unsupported file types, 401 for a missing identity header, 404 for
//! unknown courses/notes, and 500 for storage or extraction failures.

use axum::{
    extract::{FromRequestParts, Multipart, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::context::assemble_context;
use crate::courses::{self, NewCourse};
use crate::db;
use crate::extract::{self, UnsupportedPolicy};
use crate::ingest::{self, IngestError};
use crate::llm::LlmClient;
use crate::migrate;
use crate::notes;
use crate::storage::BlobStore;

/// Shared application state. Every collaborator is constructed once at
/// startup and injected here; no module-scope singletons.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub store: BlobStore,
    pub llm: Arc<LlmClient>,
    pub policy: UnsupportedPolicy,
    pub context_max_chars: usize,
}

/// Starts the HTTP server: connects the database, runs migrations,
/// constructs the LLM client (failing fast on a missing API key), and
/// serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(&config.db).await?;
    migrate::run_migrations(&pool).await?;

    let llm = LlmClient::from_config(&config.llm)?;
    let store = BlobStore::new(
        config.storage.root.clone(),
        config.storage.public_base_url.clone(),
    );

    let state = AppState {
        pool,
        store,
        llm: Arc::new(llm),
        policy: config.unsupported_policy(),
        context_max_chars: config.context.max_chars,
    };

    let app = router(state);

    info!("studyhall listening on http://{}", config.server.bind);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router. Separate from [`run_server`] so integration tests can
/// drive it in-process.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/courses", get(handle_list_courses).post(handle_create_course))
        .route("/courses/{id}", delete(handle_delete_course))
        .route(
            "/courses/{id}/notes",
            get(handle_list_notes).post(handle_upload_note),
        )
        .route(
            "/courses/{id}/notes/{file_name}",
            delete(handle_delete_note),
        )
        .route("/courses/{id}/chat", post(handle_chat))
        .route("/extract", post(handle_extract))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Identity ============

/// Owner identity for the request, read once from the `X-User-Id` header.
/// The session service in front of this API is responsible for its value.
pub struct OwnerId(pub String);

impl FromRequestParts<AppState> for OwnerId {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let owner = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError {
                status: StatusCode::UNAUTHORIZED,
                message: "missing X-User-Id header".to_string(),
            })?;
        Ok(OwnerId(owner.to_string()))
    }
}

// ============ Error response ============

/// JSON error body: `{ "error": "<message>" }`.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(error = %err, "internal error");
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: err.to_string(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Courses ============

async fn handle_list_courses(
    State(state): State<AppState>,
    owner: OwnerId,
) -> Result<Json<serde_json::Value>, ApiError> {
    let courses = courses::list_courses(&state.pool, &owner.0)
        .await
        .map_err(internal)?;
    Ok(Json(serde_json::json!({ "courses": courses })))
}

async fn handle_create_course(
    State(state): State<AppState>,
    owner: OwnerId,
    Json(new): Json<NewCourse>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if new.name.trim().is_empty() {
        return Err(bad_request("course name must not be empty"));
    }
    let course = courses::create_course(&state.pool, &owner.0, &new)
        .await
        .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "course": course }))))
}

async fn handle_delete_course(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = courses::delete_course(&state.pool, &owner.0, &id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found(format!("course not found: {}", id)));
    }
    state
        .store
        .delete_course(&owner.0, &id)
        .map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ Notes ============

#[derive(Serialize)]
struct NoteResponse {
    name: String,
    url: String,
    text: String,
}

async fn handle_list_notes(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_course(&state.pool, &owner.0, &id).await?;

    let files = state.store.list(&owner.0, &id).map_err(internal)?;
    let texts = notes::list_note_texts(&state.pool, &owner.0, &id)
        .await
        .map_err(internal)?;

    let notes: Vec<NoteResponse> = files
        .into_iter()
        .map(|f| {
            let text = texts
                .iter()
                .find(|t| t.file_name == f.name)
                .map(|t| t.text.clone())
                .unwrap_or_default();
            NoteResponse {
                name: f.name,
                url: f.url,
                text,
            }
        })
        .collect();

    Ok(Json(serde_json::json!({ "notes": notes })))
}

#[derive(Serialize)]
struct UploadResponse {
    name: String,
    url: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

async fn handle_upload_note(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    require_course(&state.pool, &owner.0, &id).await?;

    let (file_name, bytes) = read_file_field(multipart).await?;

    let outcome = ingest::ingest_note(
        &state.pool,
        &state.store,
        state.policy,
        &owner.0,
        &id,
        &file_name,
        &bytes,
    )
    .await
    .map_err(|e| match e {
        IngestError::Input(msg) => bad_request(msg),
        IngestError::Internal(err) => internal(err),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            name: outcome.file_name,
            url: outcome.url,
            text: outcome.text,
            warning: outcome.warning,
        }),
    ))
}

async fn handle_delete_note(
    State(state): State<AppState>,
    owner: OwnerId,
    Path((id, file_name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    require_course(&state.pool, &owner.0, &id).await?;

    let raw_deleted = state
        .store
        .delete(&owner.0, &id, &file_name)
        .map_err(internal)?;
    let text_deleted = notes::delete_note_text(&state.pool, &owner.0, &id, &file_name)
        .await
        .map_err(internal)?;

    if !raw_deleted && !text_deleted {
        return Err(not_found(format!("note not found: {}", file_name)));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ============ Chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }
    require_course(&state.pool, &owner.0, &id).await?;

    // Context bundle is recomputed from scratch on every turn.
    let texts = notes::list_note_texts(&state.pool, &owner.0, &id)
        .await
        .map_err(internal)?;
    let files = state.store.list(&owner.0, &id).map_err(internal)?;
    let context = assemble_context(&texts, &files, state.context_max_chars);

    // LLM failures come back as the reply text, not as an HTTP error.
    let reply = state.llm.generate(context.as_deref(), &req.message).await;
    Ok(Json(ChatResponse { reply }))
}

// ============ POST /extract ============

#[derive(Serialize)]
struct ExtractResponse {
    text: String,
}

/// Stateless extraction endpoint: multipart `file` in, `{ "text": ... }`
/// out. Nothing is persisted.
async fn handle_extract(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractResponse>, ApiError> {
    let (file_name, bytes) = read_file_field(multipart).await?;

    match extract::extract_text(&file_name, &bytes, state.policy) {
        Ok(text) => Ok(Json(ExtractResponse { text })),
        Err(e) if e.is_unsupported() => Err(bad_request(e.to_string())),
        Err(e) => Err(ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }),
    }
}

// ============ Helpers ============

async fn require_course(pool: &SqlitePool, owner_id: &str, id: &str) -> Result<(), ApiError> {
    let found = courses::get_course(pool, owner_id, id)
        .await
        .map_err(internal)?;
    if found.is_none() {
        return Err(not_found(format!("course not found: {}", id)));
    }
    Ok(())
}

/// Pulls the `file` field out of a multipart body. 400 when absent or when
/// the part carries no file name.
async fn read_file_field(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(|n| n.to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| bad_request("file field has no file name"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(e.to_string()))?
            .to_vec();
        return Ok((file_name, bytes));
    }
    Err(bad_request("No file uploaded"))
}
