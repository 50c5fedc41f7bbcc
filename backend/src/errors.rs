use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use shield_core::error::WorkflowError;
use shield_core::form::FormError;
use shield_core::services::ContractError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Wallet or encryption service not available.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Encryption service, wallet or contract call failed.
    #[error("upstream failure: {0}")]
    BadGateway(String),

    #[error("internal error")]
    Internal,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            ApiError::PreconditionFailed(m) => (StatusCode::PRECONDITION_FAILED, m.clone()),
            ApiError::BadGateway(m) => (StatusCode::BAD_GATEWAY, m.clone()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };

        (status, Json(ErrorBody { error: msg })).into_response()
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::WalletNotConnected | WorkflowError::EncryptionUnavailable => {
                ApiError::PreconditionFailed(err.to_string())
            }
            WorkflowError::InvalidDeposit(_) => ApiError::BadRequest(err.to_string()),
            WorkflowError::InvalidHandle(_)
            | WorkflowError::Encryption(_)
            | WorkflowError::Transaction(_)
            | WorkflowError::Signing(_)
            | WorkflowError::Contract(_)
            | WorkflowError::Decryption(_) => ApiError::BadGateway(err.to_string()),
        }
    }
}

impl From<ContractError> for ApiError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::NotFound(m) => ApiError::NotFound(m),
            ContractError::Reverted(_) | ContractError::Rpc(_) => ApiError::BadGateway(err.to_string()),
        }
    }
}

impl From<FormError> for ApiError {
    fn from(err: FormError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
