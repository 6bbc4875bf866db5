// Request handlers for API endpoints

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::api::responses::{
    ActuationResponse, ApiError, ControllerConfigRequest, ControllerConfigResponse, DoorRequest,
    DoorStatusResponse, HealthResponse, LogsQuery, LogsResponse, ScanRequest, ServerInfo,
};
use crate::api::AppState;
use crate::core::errors::AccessError;
use crate::core::models::{Compartment, ScanReport};
use crate::hardware::LinkAddress;

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn compartment_from(request: &DoorRequest) -> Result<Compartment, AccessError> {
    match (request.row, request.column) {
        (Some(row), Some(column)) => Compartment::new(row, column, request.shelf),
        _ => Err(AccessError::InvalidInput(
            "Missing required parameters: row, column".to_string(),
        )),
    }
}

/// POST /v1/scan
///
/// Returns 200 with the full report whenever the identity passed the
/// eligibility check, even if individual items failed. The batch runs in its
/// own task, so a dropped connection cannot stop it between items.
pub async fn scan_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanReport>, ApiError> {
    let request_id = request_id(&headers);
    let user_id = request.user_id.unwrap_or_default();

    let orchestrator = app_state.orchestrator.clone();
    let report = tokio::spawn(async move { orchestrator.process_scan(&user_id).await })
        .await
        .map_err(|e| {
            error!(request_id = %request_id, error = %e, "Scan task failed");
            ApiError {
                request_id: Some(request_id.clone()),
                ..ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        })?
        .map_err(|e| ApiError::from_access_error_with_id(e, request_id.clone()))?;

    info!(
        request_id = %request_id,
        identity = %report.identity,
        success = report.success,
        "Scan request completed"
    );
    Ok(Json(report))
}

/// POST /v1/door/unlock
pub async fn unlock_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DoorRequest>,
) -> Result<Json<ActuationResponse>, ApiError> {
    let request_id = request_id(&headers);
    let compartment = compartment_from(&request)
        .map_err(|e| ApiError::from_access_error_with_id(e, request_id.clone()))?;

    let result = app_state
        .orchestrator
        .manual_unlock(compartment, request.user_id.as_deref())
        .await
        .map_err(|e| {
            warn!(request_id = %request_id, error = %e, "Manual unlock failed");
            ApiError::from_access_error_with_id(e, request_id.clone())
        })?;

    Ok(Json(ActuationResponse {
        success: true,
        message: "Door unlocked successfully".to_string(),
        result,
        timestamp: Utc::now(),
    }))
}

/// POST /v1/door/lock
pub async fn lock_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DoorRequest>,
) -> Result<Json<ActuationResponse>, ApiError> {
    let request_id = request_id(&headers);
    let compartment = compartment_from(&request)
        .map_err(|e| ApiError::from_access_error_with_id(e, request_id.clone()))?;

    let result = app_state
        .orchestrator
        .manual_lock(compartment, request.user_id.as_deref())
        .await
        .map_err(|e| {
            warn!(request_id = %request_id, error = %e, "Manual lock failed");
            ApiError::from_access_error_with_id(e, request_id.clone())
        })?;

    Ok(Json(ActuationResponse {
        success: true,
        message: "Door locked successfully".to_string(),
        result,
        timestamp: Utc::now(),
    }))
}

/// GET /v1/door/status
pub async fn door_status_handler(State(app_state): State<AppState>) -> Json<DoorStatusResponse> {
    let controller = app_state.orchestrator.link_status().await;
    Json(DoorStatusResponse {
        controller,
        server: ServerInfo {
            status: "running".to_string(),
            timestamp: Utc::now(),
        },
    })
}

/// POST /v1/door/controller
pub async fn controller_config_handler(
    State(app_state): State<AppState>,
    Json(request): Json<ControllerConfigRequest>,
) -> Result<Json<ControllerConfigResponse>, ApiError> {
    let host = request
        .host
        .ok_or_else(|| AccessError::InvalidInput("Controller host is required".to_string()))?;

    let mut address = LinkAddress::parse(&host)?;
    if let Some(port) = request.port {
        address.port = port;
    }

    let connected = app_state.orchestrator.reconfigure_link(address.clone()).await;

    Ok(Json(ControllerConfigResponse {
        message: "Lock controller configuration updated".to_string(),
        address: address.base_url(),
        connected,
    }))
}

/// GET /v1/door/logs
pub async fn logs_handler(
    State(app_state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let logs = app_state
        .orchestrator
        .audit_log(query.limit, query.user_id.as_deref())
        .await?;

    Ok(Json(LogsResponse {
        count: logs.len(),
        logs,
    }))
}

/// GET /health
pub async fn health_handler(State(app_state): State<AppState>) -> Json<HealthResponse> {
    let ledger = match tokio::time::timeout(
        std::time::Duration::from_millis(800),
        app_state.orchestrator.ledger_ping(),
    )
    .await
    {
        Ok(Ok(())) => "connected".to_string(),
        Ok(Err(e)) => {
            warn!(error = %e, "Ledger ping failed");
            format!("error: {}", e.user_message())
        }
        Err(_) => "slow: timeout".to_string(),
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        ledger,
        controller_connected: app_state.orchestrator.link().is_connected().await,
    })
}
