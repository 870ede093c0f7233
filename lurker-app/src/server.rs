use crate::sync::{self, RefreshReport};
use crate::tether::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use lurker_social::SocialError;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/items/:id", get(item_handler))
        .route("/refresh", post(refresh_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root_handler() -> &'static str {
    "Hello World"
}

async fn item_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.cache.read(&id).map(Json).ok_or(ApiError::NotFound(id))
}

async fn refresh_handler(State(state): State<AppState>) -> Result<Json<RefreshReport>, ApiError> {
    sync::refresh(&state).await.map(Json).map_err(ApiError::Social)
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Social(SocialError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(id) => (StatusCode::NOT_FOUND, format!("no cached item with id {id}")),
            ApiError::Social(SocialError::Extraction { .. }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service temporarily unavailable".to_string(),
            ),
            ApiError::Social(SocialError::Upstream(_)) => {
                (StatusCode::BAD_GATEWAY, "upstream request failed".to_string())
            }
            ApiError::Social(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };
        if let ApiError::Social(err) = &self {
            tracing::warn!(status = status.as_u16(), error = %err, "api.error");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
