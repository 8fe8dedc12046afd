//! Error handling for the settlement service
//!
//! One `AppError` type crosses every handler boundary. It carries a kind
//! (mapped to an HTTP status and a machine-readable code), a user-facing
//! message that never exposes gateway or database internals, and the
//! request id for support.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::payments::error::PaymentError;

/// Error codes for programmatic handling by clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Trust boundary (401, 403)
    #[serde(rename = "AUTHENTICATION_REQUIRED")]
    AuthenticationRequired,
    #[serde(rename = "INVALID_SIGNATURE")]
    InvalidSignature,
    #[serde(rename = "FORBIDDEN")]
    Forbidden,

    // Domain errors (4xx)
    #[serde(rename = "ORDER_NOT_FOUND")]
    OrderNotFound,
    #[serde(rename = "TRANSACTION_NOT_FOUND")]
    TransactionNotFound,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // External errors (502)
    #[serde(rename = "PAYMENT_PROVIDER_ERROR")]
    PaymentProviderError,

    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

/// Caller identity and webhook trust failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    MissingWebhookSignature,
    InvalidWebhookSignature,
    /// Authenticated, but the order belongs to someone else
    NotOrderOwner { order_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    OrderNotFound { order_id: String },
    TransactionNotFound { reference: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfrastructureError {
    Database { message: String, is_retryable: bool },
    Configuration { message: String },
}

/// Which gateway call failed; selects the user-facing wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOperation {
    Initialize,
    Verify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalError {
    PaymentGateway {
        operation: GatewayOperation,
        message: String,
        is_retryable: bool,
    },
    /// The gateway could not be reached at all
    GatewayUnavailable {
        operation: GatewayOperation,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingField { field: String },
    InvalidField { field: String, reason: String },
    InvalidAmount { amount: String, reason: String },
    MalformedPayload { reason: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorKind {
    Auth(AuthError),
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn auth(err: AuthError) -> Self {
        Self::new(AppErrorKind::Auth(err))
    }

    pub fn not_owner(order_id: impl Into<String>) -> Self {
        Self::auth(AuthError::NotOrderOwner {
            order_id: order_id.into(),
        })
    }

    pub fn order_not_found(order_id: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::OrderNotFound {
            order_id: order_id.into(),
        }))
    }

    pub fn transaction_not_found(reference: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::TransactionNotFound {
            reference: reference.into(),
        }))
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::MissingField {
            field: field.to_string(),
        }))
    }

    pub fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }))
    }

    pub fn invalid_amount(amount: impl ToString, reason: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::InvalidAmount {
            amount: amount.to_string(),
            reason: reason.into(),
        }))
    }

    pub fn malformed_payload(reason: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::MalformedPayload {
            reason: reason.into(),
        }))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Infrastructure(
            InfrastructureError::Configuration {
                message: message.into(),
            },
        ))
    }

    /// Translates a gateway-client failure. Input problems the gateway client
    /// caught stay validation errors; everything else becomes a generic
    /// upstream failure for the given operation.
    pub fn from_gateway(operation: GatewayOperation, err: PaymentError) -> Self {
        let kind = match err {
            PaymentError::ValidationError { message, field } => {
                AppErrorKind::Validation(ValidationError::InvalidField {
                    field: field.unwrap_or_else(|| "request".to_string()),
                    reason: message,
                })
            }
            PaymentError::NetworkError { message } => {
                AppErrorKind::External(ExternalError::GatewayUnavailable { operation, message })
            }
            other => AppErrorKind::External(ExternalError::PaymentGateway {
                operation,
                is_retryable: other.is_retryable(),
                message: other.to_string(),
            }),
        };
        Self::new(kind)
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Auth(err) => match err {
                AuthError::NotOrderOwner { .. } => 403,
                _ => 401,
            },
            AppErrorKind::Domain(_) => 404,
            AppErrorKind::Infrastructure(_) => 500,
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentGateway { .. } => 502,
                ExternalError::GatewayUnavailable { .. } => 503,
            },
            AppErrorKind::Validation(_) => 400,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Auth(err) => match err {
                AuthError::MissingToken | AuthError::InvalidToken => {
                    ErrorCode::AuthenticationRequired
                }
                AuthError::MissingWebhookSignature | AuthError::InvalidWebhookSignature => {
                    ErrorCode::InvalidSignature
                }
                AuthError::NotOrderOwner { .. } => ErrorCode::Forbidden,
            },
            AppErrorKind::Domain(err) => match err {
                DomainError::OrderNotFound { .. } => ErrorCode::OrderNotFound,
                DomainError::TransactionNotFound { .. } => ErrorCode::TransactionNotFound,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(_) => ErrorCode::PaymentProviderError,
            AppErrorKind::Validation(_) => ErrorCode::ValidationError,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Auth(err) => match err {
                AuthError::MissingToken => "Authentication required".to_string(),
                AuthError::InvalidToken => "Invalid or expired session".to_string(),
                AuthError::MissingWebhookSignature | AuthError::InvalidWebhookSignature => {
                    "Invalid webhook signature".to_string()
                }
                AuthError::NotOrderOwner { .. } => {
                    "You are not allowed to pay for this order".to_string()
                }
            },
            AppErrorKind::Domain(err) => match err {
                DomainError::OrderNotFound { order_id } => {
                    format!("Order '{}' not found", order_id)
                }
                DomainError::TransactionNotFound { reference } => {
                    format!("Transaction '{}' not found", reference)
                }
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(
                ExternalError::PaymentGateway { operation, .. }
                | ExternalError::GatewayUnavailable { operation, .. },
            ) => match operation {
                GatewayOperation::Initialize => {
                    "Unable to start payment. Please try again".to_string()
                }
                GatewayOperation::Verify => "Payment not confirmed yet. Please try again".to_string(),
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::MissingField { field } => {
                    format!("Required field '{}' is missing", field)
                }
                ValidationError::InvalidField { field, reason } => {
                    format!("Invalid value for '{}': {}", field, reason)
                }
                ValidationError::InvalidAmount { amount, reason } => {
                    format!("Invalid amount '{}': {}", amount, reason)
                }
                ValidationError::MalformedPayload { reason } => {
                    format!("Malformed payload: {}", reason)
                }
            },
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Auth(_) | AppErrorKind::Domain(_) | AppErrorKind::Validation(_) => false,
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentGateway { is_retryable, .. } => *is_retryable,
                ExternalError::GatewayUnavailable { .. } => true,
            },
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{}: {}", context, self.user_message()),
            None => write!(f, "{}", self.user_message()),
        }
    }
}

impl std::error::Error for AppError {}

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;
