use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{payments::PaymentError, response::ApiResponse};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Payment provider error")]
    Payment(#[from] PaymentError),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Payment(
                PaymentError::InvalidSignature(_) | PaymentError::InvalidPayload(_),
            ) => StatusCode::BAD_REQUEST,
            AppError::Payment(PaymentError::NotConfigured(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Payment(_) => StatusCode::BAD_GATEWAY,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Payment(PaymentError::InvalidSignature(_)) => {
                "Webhook signature verification failed".to_string()
            }
            AppError::Payment(PaymentError::InvalidPayload(_)) => {
                "Webhook payload is not a valid event".to_string()
            }
            _ => self.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, status = %status, "request failed");
        }

        (status, axum::Json(ApiResponse::failure(message))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_message() {
        let err = AppError::BadRequest("Insufficient stock for Mug".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Insufficient stock for Mug");
    }

    #[test]
    fn server_errors_hide_the_cause() {
        let err = AppError::Internal(anyhow::anyhow!("connection reset by peer"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[test]
    fn bad_signature_is_a_client_error() {
        let err = AppError::from(PaymentError::InvalidSignature("no v1 signature".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn malformed_webhook_body_is_a_client_error() {
        let err = AppError::from(PaymentError::InvalidPayload("expected value".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let upstream = AppError::from(PaymentError::Api {
            status: 500,
            message: "boom".into(),
        });
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
    }
}
