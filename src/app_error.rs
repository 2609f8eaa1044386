use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{gateway::GatewayError, store::StoreError};

/// Standard success envelope shared by every endpoint.
#[derive(Serialize, Debug, ToSchema)]
pub struct StdResponse<T, M> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T, M> IntoResponse for StdResponse<T, M>
where
    T: Serialize,
    M: Serialize,
{
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Body returned for every failed request.
#[derive(Serialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<Uuid>,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} is unavailable")]
    ExternalService(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Authentication(_) => "AUTHENTICATION_ERROR",
            AppError::Authorization(_) => "AUTHORIZATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::Other(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ExternalService(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.kind();

        // Driver and gateway detail stays in the logs, keyed by the reference.
        let (message, reference) = match &self {
            AppError::ExternalService(service) => {
                let reference = Uuid::new_v4();
                tracing::error!(%reference, service = %service, "External service failure");
                (
                    "A dependent service is temporarily unavailable, please retry".to_string(),
                    Some(reference),
                )
            }
            AppError::Other(err) => {
                let reference = Uuid::new_v4();
                tracing::error!(%reference, error = ?err, "Unhandled error");
                ("Internal server error".to_string(), Some(reference))
            }
            other => {
                tracing::warn!(error, "{other}");
                (other.to_string(), None)
            }
        };

        (
            status,
            Json(ErrorBody {
                error,
                message,
                reference,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            StoreError::Conflict(reason) => AppError::Conflict(reason),
            StoreError::Timeout => AppError::ExternalService("Database".into()),
            StoreError::Pool(reason) => {
                tracing::error!(reason = %reason, "Failed to obtain a DB connection");
                AppError::ExternalService("Database".into())
            }
            StoreError::Database(err) => AppError::Other(err.into()),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidSignature(reason) => {
                tracing::warn!(reason = %reason, "Rejected webhook payload");
                AppError::Authentication("Invalid webhook signature".into())
            }
            GatewayError::Timeout => AppError::ExternalService("Payment gateway".into()),
            GatewayError::Request(reason) => {
                tracing::error!(reason = %reason, "Payment gateway request failed");
                AppError::ExternalService("Payment gateway".into())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// `Json` extractor whose rejections surface as [`AppError::Validation`].
#[derive(FromRequest, Debug)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_bad_request() {
        let err = AppError::Conflict("Order is already completed".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "CONFLICT");
    }

    #[test]
    fn store_timeouts_are_retryable_external_failures() {
        let err: AppError = StoreError::Timeout.into();
        assert!(matches!(err, AppError::ExternalService(_)));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn internal_errors_hide_detail_behind_a_reference() {
        let err = AppError::Other(anyhow::anyhow!("connection reset by peer: 10.0.0.4"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "Internal server error");
        assert!(body["reference"].is_string());
        assert!(!body.to_string().contains("10.0.0.4"));
    }
}
