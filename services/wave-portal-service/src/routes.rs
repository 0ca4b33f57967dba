use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use wp_api_types::{ConnectResponse, PortalView, WaveSubmitRequest, WaveSubmitResponse};
use wp_portal_core::{ConnectError, SubmitRejected, WavePortal};

const SERVICE_NAME: &str = "wave-portal-service";

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) portal: Arc<WavePortal>,
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/view", get(view))
        .route("/connect", post(connect))
        .route("/connect/request", post(connect_request))
        .route("/disconnect", post(disconnect))
        .route("/wave", post(wave))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: SERVICE_NAME,
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn view(State(state): State<AppState>) -> Json<PortalView> {
    Json(state.portal.view().await)
}

async fn connect(State(state): State<AppState>) -> Json<ConnectResponse> {
    let connection = state.portal.connect().await;
    Json(ConnectResponse {
        connection,
        view: state.portal.view().await,
    })
}

async fn connect_request(State(state): State<AppState>) -> ApiResult<ConnectResponse> {
    let connection = state.portal.request_connect().await.map_err(|err| {
        warn!("connection request failed: {}", err);
        match err {
            ConnectError::Network(_) => bad_gateway(&err.to_string()),
            ConnectError::ProviderMissing | ConnectError::UserRejected(_) => {
                bad_request(&err.to_string())
            }
        }
    })?;

    Ok(Json(ConnectResponse {
        connection,
        view: state.portal.view().await,
    }))
}

async fn disconnect(State(state): State<AppState>) -> Json<ConnectResponse> {
    let connection = state.portal.disconnect().await;
    info!("wallet disconnected");
    Json(ConnectResponse {
        connection,
        view: state.portal.view().await,
    })
}

async fn wave(
    State(state): State<AppState>,
    Json(request): Json<WaveSubmitRequest>,
) -> ApiResult<WaveSubmitResponse> {
    let transaction = state
        .portal
        .submit(&request.message)
        .await
        .map_err(|err| match err {
            SubmitRejected::AlreadyPending => conflict(&err.to_string()),
            SubmitRejected::NotConnected | SubmitRejected::ProviderMissing => {
                bad_request(&err.to_string())
            }
        })?;

    Ok(Json(WaveSubmitResponse {
        transaction,
        view: state.portal.view().await,
    }))
}

fn error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_owned(),
        }),
    )
}

fn bad_request(message: &str) -> ApiError {
    error(StatusCode::BAD_REQUEST, message)
}

fn conflict(message: &str) -> ApiError {
    error(StatusCode::CONFLICT, message)
}

fn bad_gateway(message: &str) -> ApiError {
    error(StatusCode::BAD_GATEWAY, message)
}
