//! HTTP control server: axum router and request handlers.
//!
//! Two surfaces share one `ModeController`:
//! - The legacy device protocol, served from the router fallback so any
//!   path works: `GET` anything to query, `POST /<pattern>` or `POST` a
//!   JSON `{"pattern": ...}` body to switch.
//! - A versioned `/api/v1` API with OpenAPI docs at `/docs`.
//!
//! Handlers never touch the pixels. They only change the mode; the render
//! thread notices on its next tick.

use crate::mode::{ANY, Mode, ModeController};
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// ── App State ────────────────────────────────────────────────────────

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub modes: Arc<ModeController>,
}

// ── OpenAPI Documentation ────────────────────────────────────────────

#[derive(OpenApi)]
#[openapi(
    paths(get_pattern, put_pattern, get_patterns),
    components(schemas(PatternRequest, PatternResponse)),
    tags(
        (name = "pattern", description = "Display pattern selection"),
    ),
    info(
        title = "LED Ring API",
        version = env!("CARGO_PKG_VERSION"),
        description = "HTTP API for selecting the animation shown on the LED ring"
    )
)]
pub struct ApiDoc;

// ── Request/Response types ───────────────────────────────────────────

#[derive(Deserialize, utoipa::ToSchema)]
pub struct PatternRequest {
    /// Pattern name from `GET /api/v1/patterns`, or `any` for a random one
    #[schema(example = "sweep")]
    pattern: String,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct PatternResponse {
    /// Active pattern. `wifi` while the network is still connecting.
    #[schema(example = "clock")]
    pub pattern: String,
}

impl PatternResponse {
    fn of(mode: Mode) -> Self {
        Self {
            pattern: mode.name().to_string(),
        }
    }
}

// ── Router ───────────────────────────────────────────────────────────

/// Build the axum router with the API and the device protocol fallback.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(
            SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", ApiDoc::openapi())
                .config(utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"]).validator_url("none")),
        )
        .route("/api/v1/pattern", get(get_pattern).put(put_pattern))
        .route("/api/v1/patterns", get(get_patterns))
        .fallback(device_protocol)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Request decisions ────────────────────────────────────────────────

/// Apply a JSON body of the form `{"pattern": "<name>"}`.
///
/// 200 on a switch, 204 when the name is not a pattern, 400 when the
/// body has no string `pattern` field, 406 when it is not JSON at all.
pub fn apply_pattern_body(modes: &ModeController, body: &[u8]) -> StatusCode {
    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Error parsing JSON body: {}", e);
            return StatusCode::NOT_ACCEPTABLE;
        }
    };

    if !value.is_object() {
        tracing::warn!("Pattern request body is not a JSON object");
        return StatusCode::BAD_REQUEST;
    }

    let request: PatternRequest = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("Pattern request without a usable pattern: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    if modes.request_change(&request.pattern) {
        StatusCode::OK
    } else {
        StatusCode::NO_CONTENT
    }
}

/// Apply a `POST` in the device protocol.
///
/// The path with slashes stripped is tried as a pattern name first. If
/// that does not switch, a JSON body is tried. Without either, 400.
pub fn apply_device_post(
    modes: &ModeController,
    path: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> StatusCode {
    let name = path.replace('/', "");
    if !name.is_empty() && modes.request_change(&name) {
        return StatusCode::OK;
    }

    if is_json(headers) {
        apply_pattern_body(modes, body)
    } else {
        StatusCode::BAD_REQUEST
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with("application/json"))
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Anything that is not an `/api/v1` route: the protocol the older
/// device firmware spoke.
async fn device_protocol(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match method {
        Method::GET => Json(PatternResponse::of(state.modes.current())).into_response(),
        Method::POST => {
            apply_device_post(&state.modes, uri.path(), &headers, &body).into_response()
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// GET /api/v1/pattern — the active pattern
#[utoipa::path(
    get,
    path = "/api/v1/pattern",
    tag = "pattern",
    responses(
        (status = 200, description = "Active pattern", body = PatternResponse)
    )
)]
async fn get_pattern(State(state): State<AppState>) -> Json<PatternResponse> {
    Json(PatternResponse::of(state.modes.current()))
}

/// PUT /api/v1/pattern — switch pattern
#[utoipa::path(
    put,
    path = "/api/v1/pattern",
    tag = "pattern",
    request_body = PatternRequest,
    responses(
        (status = 200, description = "Pattern switched"),
        (status = 204, description = "No such pattern, nothing changed"),
        (status = 400, description = "Body has no pattern field"),
        (status = 406, description = "Body is not JSON")
    )
)]
async fn put_pattern(State(state): State<AppState>, body: Bytes) -> StatusCode {
    apply_pattern_body(&state.modes, &body)
}

/// GET /api/v1/patterns — selectable pattern names
#[utoipa::path(
    get,
    path = "/api/v1/patterns",
    tag = "pattern",
    responses(
        (status = 200, description = "Pattern names in registry order, then `any`", body = Vec<String>)
    )
)]
async fn get_patterns() -> Json<Vec<&'static str>> {
    let names = Mode::REGISTRY
        .into_iter()
        .map(Mode::name)
        .chain(std::iter::once(ANY))
        .collect();
    Json(names)
}
