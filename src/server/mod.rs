//! HTTP API for the clipboard service
//!
//! Routes mirror the paths browser clients already call. Every failure is
//! answered as `{ "error": "<message>" }` with a status chosen by error kind.

mod error;

use std::net::SocketAddr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::service::{ClipboardService, NewItem, ServiceError};
use crate::store::ClipboardItem;

pub use error::{status_for, ApiError};

/// Shared state threaded through axum handlers
#[derive(Clone)]
pub struct AppState {
    pub service: ClipboardService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub is_private: Option<bool>,
    #[serde(default)]
    pub passcode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PasscodeRequest {
    #[serde(default)]
    pub passcode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub item: Option<NewItem>,
    #[serde(default)]
    pub passcode: Option<String>,
}

/// Query of `DELETE /clipboard/delete-item`
///
/// `itemIndex` stays a string here so a non-integer becomes our own 400
/// rather than a framework rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteItemQuery {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub item_index: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub passcode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub items: Vec<ClipboardItem>,
}

/// Build the API router
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/clipboard/go", post(go))
        .route("/clipboard/add-item", post(add_item))
        .route("/clipboard/delete-item", delete(delete_item))
        .route(
            "/clipboard/:code",
            get(list_items_query).post(list_items_body),
        )
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C
pub async fn run(addr: SocketAddr, state: AppState, config: &ServerConfig) -> crate::Result<()> {
    let app = router(state, config);
    let listener = TcpListener::bind(addr).await?;
    info!("ClipShare listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("ClipShare server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn health() -> &'static str {
    "clipshare server is working"
}

async fn fallback() -> ApiError {
    ApiError::rejected(StatusCode::NOT_FOUND, "Not found")
}

async fn go(
    State(state): State<AppState>,
    payload: Result<Json<GoRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let outcome = state
        .service
        .go_or_create(
            &req.code,
            req.is_private.unwrap_or(false),
            req.passcode.as_deref(),
        )
        .await?;

    let response = if outcome.created {
        (
            StatusCode::CREATED,
            Json(MessageResponse {
                message: "New clipboard created successfully",
            }),
        )
    } else {
        (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Clipboard authenticated successfully",
            }),
        )
    };
    Ok(response)
}

async fn list_items_body(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Result<Json<PasscodeRequest>, JsonRejection>,
) -> Result<Json<ItemsResponse>, ApiError> {
    // No JSON content type means no body was sent
    let req = match payload {
        Ok(Json(req)) => req,
        Err(JsonRejection::MissingJsonContentType(_)) => PasscodeRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    list_items(&state, &code, req.passcode.as_deref()).await
}

async fn list_items_query(
    State(state): State<AppState>,
    Path(code): Path<String>,
    query: Result<Query<PasscodeRequest>, QueryRejection>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let Query(req) = query?;
    list_items(&state, &code, req.passcode.as_deref()).await
}

async fn list_items(
    state: &AppState,
    code: &str,
    passcode: Option<&str>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let items = state.service.list_items(code, passcode).await?;
    Ok(Json(ItemsResponse {
        message: None,
        items,
    }))
}

async fn add_item(
    State(state): State<AppState>,
    payload: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let item = match req.item {
        Some(item) if !req.code.is_empty() => item,
        _ => {
            return Err(ServiceError::Validation("Code and item are required".to_string()).into())
        }
    };

    let items = state
        .service
        .add_item(&req.code, item, req.passcode.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ItemsResponse {
            message: Some("Item added successfully"),
            items,
        }),
    ))
}

async fn delete_item(
    State(state): State<AppState>,
    query: Result<Query<DeleteItemQuery>, QueryRejection>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let Query(req) = query?;
    let passcode = req.passcode.as_deref();

    let items = match (req.item_id.as_deref(), req.item_index.as_deref()) {
        (Some(id), _) => {
            let id = Uuid::parse_str(id.trim()).map_err(|_| {
                ServiceError::Validation("itemId must be a valid item id".to_string())
            })?;
            state.service.delete_item_by_id(&req.code, id, passcode).await?
        }
        (None, Some(index)) => {
            let index = parse_item_index(index)?;
            state.service.delete_item(&req.code, index, passcode).await?
        }
        (None, None) => {
            return Err(
                ServiceError::Validation("Code and itemIndex are required".to_string()).into(),
            )
        }
    };

    Ok(Json(ItemsResponse {
        message: Some("Item deleted successfully"),
        items,
    }))
}

/// Parse `itemIndex`, saturating integers too large for `i64`
///
/// A saturated index still goes through the service, so it fails as out of
/// range after the usual lookup and passcode checks.
fn parse_item_index(raw: &str) -> Result<i64, ServiceError> {
    let raw = raw.trim();
    if let Ok(index) = raw.parse::<i64>() {
        return Ok(index);
    }

    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(if raw.starts_with('-') { i64::MIN } else { i64::MAX });
    }

    Err(ServiceError::Validation(
        "itemIndex must be an integer".to_string(),
    ))
}
