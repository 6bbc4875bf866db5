// Request and response types for API endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::AccessError;
use crate::core::models::{ActuationResult, AuditRecord, LinkStatus};

/// Body of a scan request
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(rename = "userId", alias = "user_id")]
    pub user_id: Option<String>,
}

/// Body of a manual unlock or lock request
#[derive(Debug, Deserialize)]
pub struct DoorRequest {
    pub row: Option<u32>,
    pub column: Option<u32>,
    pub shelf: Option<u32>,
    #[serde(rename = "userId", alias = "user_id")]
    pub user_id: Option<String>,
}

/// Body of a controller address change
#[derive(Debug, Deserialize)]
pub struct ControllerConfigRequest {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
    #[serde(rename = "userId", alias = "user_id")]
    pub user_id: Option<String>,
}

/// Manual actuation response
#[derive(Debug, Serialize)]
pub struct ActuationResponse {
    pub success: bool,
    pub message: String,
    pub result: ActuationResult,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DoorStatusResponse {
    pub controller: LinkStatus,
    pub server: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ControllerConfigResponse {
    pub message: String,
    pub address: String,
    pub connected: bool,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub count: usize,
    pub logs: Vec<AuditRecord>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub ledger: String,
    pub controller_connected: bool,
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// API error type that converts domain errors to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            request_id: None,
        }
    }

    pub fn from_access_error(err: AccessError) -> Self {
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            message: err.user_message(),
            request_id: None,
        }
    }

    pub fn from_access_error_with_id(err: AccessError, request_id: String) -> Self {
        Self {
            request_id: Some(request_id),
            ..Self::from_access_error(err)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            request_id: self.request_id,
        });
        (self.status, body).into_response()
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        ApiError::from_access_error(err)
    }
}
