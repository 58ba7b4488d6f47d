//! Errors returned by the order services.
//!
//! Domain errors are expected outcomes the caller maps to a 4xx response; they are
//! never logged as failures. Everything else wraps a [`StoreError`] and maps to 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::domain::{QuantityError, TempOrderStatus};
use crate::pricing::TotalOverflow;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("customer {customer_id} already has an active order in shop {shop_id}")]
    ActiveOrderExists { customer_id: i64, shop_id: i64 },

    #[error("order {0} not found")]
    OrderNotFound(i64),

    #[error("order item {0} not found")]
    OrderItemNotFound(i64),

    #[error("temp order {0} not found")]
    TempOrderNotFound(i64),

    #[error("temp order {id} is already {status}")]
    TempOrderNotPending { id: i64, status: TempOrderStatus },

    #[error("product {0} not found")]
    ProductNotFound(i64),

    #[error("customer {0} not found")]
    CustomerNotFound(i64),

    #[error("share link not found")]
    ShopNotFound,

    #[error(transparent)]
    InvalidQuantity(#[from] QuantityError),

    #[error(transparent)]
    TotalOverflow(#[from] TotalOverflow),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<validator::ValidationErrors> for OrderError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl OrderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ActiveOrderExists { .. } | Self::TempOrderNotPending { .. } => StatusCode::CONFLICT,
            Self::Store(StoreError::ActiveOrderConflict) => StatusCode::CONFLICT,
            Self::OrderNotFound(_)
            | Self::OrderItemNotFound(_)
            | Self::TempOrderNotFound(_)
            | Self::ProductNotFound(_)
            | Self::CustomerNotFound(_)
            | Self::ShopNotFound => StatusCode::NOT_FOUND,
            Self::InvalidQuantity(_) | Self::TotalOverflow(_) | Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Infrastructure failures, as opposed to expected domain outcomes.
    pub fn is_infrastructure(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if self.is_infrastructure() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            tracing::debug!(error = %self, "request rejected");
            self.to_string()
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, OrderError>;
