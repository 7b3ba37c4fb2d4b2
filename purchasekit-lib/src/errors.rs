//! Error types for PurchaseKit operations.
//!
//! Purchase-specific failures (`ProductNotFound`, `UserCancelled`,
//! `PurchaseFailed`) are distinguished from transport and service errors so
//! that callers can decide whether to show UI, retry, or ignore.

use std::fmt;

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PurchaseKitErrorCode {
    /// Feature not implemented
    Unimplemented = 1000,
    /// Transport/network layer error
    Transport = 2000,
    /// Connection failed
    ConnectionFailed = 2001,
    /// Connection timeout
    ConnectionTimeout = 2002,
    /// Authentication/authorization error
    Auth = 3000,
    /// Resource not found
    NotFound = 4000,
    /// Requested product is unknown to the storefront
    ProductNotFound = 4001,
    /// Invalid request/data
    InvalidData = 5000,
    /// Serialization error
    Serialization = 5002,
    /// Purchase failed
    PurchaseFailed = 6000,
    /// User cancelled the purchase flow
    UserCancelled = 6001,
    /// Platform storefront error
    Storefront = 7000,
    /// Rate limited
    RateLimited = 8000,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Comprehensive error type for PurchaseKit operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseKitError {
    /// Feature not implemented or not compiled in.
    Unimplemented(&'static str),

    /// Transport/network layer error.
    Transport(String),

    /// Connection failed.
    ConnectionFailed {
        /// Target endpoint or service
        target: String,
        /// Underlying error message
        reason: String,
    },

    /// Connection timeout.
    ConnectionTimeout {
        /// Operation that timed out
        operation: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Authentication or authorization failed.
    Auth(String),

    /// Resource not found (products, subscriber, etc.).
    NotFound {
        /// Type of resource (e.g., "products", "subscriber")
        resource_type: String,
        /// Resource identifier
        identifier: String,
    },

    /// The product to purchase does not exist in the storefront catalog.
    ProductNotFound {
        /// Requested product identifier
        product_id: String,
    },

    /// The user dismissed the purchase sheet.
    UserCancelled,

    /// The purchase did not complete.
    PurchaseFailed {
        /// Product identifier
        product_id: String,
        /// Failure reason
        reason: String,
    },

    /// Invalid data provided or received.
    InvalidData {
        /// Field or parameter name
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Serialization/deserialization error.
    Serialization(String),

    /// The platform storefront reported an error.
    Storefront(String),

    /// Rate limited, should retry after delay.
    RateLimited {
        /// Suggested retry delay in milliseconds
        retry_after_ms: u64,
    },

    /// Internal/unexpected error.
    Internal(String),
}

impl PurchaseKitError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> PurchaseKitErrorCode {
        match self {
            Self::Unimplemented(_) => PurchaseKitErrorCode::Unimplemented,
            Self::Transport(_) => PurchaseKitErrorCode::Transport,
            Self::ConnectionFailed { .. } => PurchaseKitErrorCode::ConnectionFailed,
            Self::ConnectionTimeout { .. } => PurchaseKitErrorCode::ConnectionTimeout,
            Self::Auth(_) => PurchaseKitErrorCode::Auth,
            Self::NotFound { .. } => PurchaseKitErrorCode::NotFound,
            Self::ProductNotFound { .. } => PurchaseKitErrorCode::ProductNotFound,
            Self::UserCancelled => PurchaseKitErrorCode::UserCancelled,
            Self::PurchaseFailed { .. } => PurchaseKitErrorCode::PurchaseFailed,
            Self::InvalidData { .. } => PurchaseKitErrorCode::InvalidData,
            Self::Serialization(_) => PurchaseKitErrorCode::Serialization,
            Self::Storefront(_) => PurchaseKitErrorCode::Storefront,
            Self::RateLimited { .. } => PurchaseKitErrorCode::RateLimited,
            Self::Internal(_) => PurchaseKitErrorCode::Internal,
        }
    }

    /// Get the error message as an owned String (useful for FFI and analytics).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if this error is potentially recoverable by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::ConnectionFailed { .. }
                | Self::ConnectionTimeout { .. }
                | Self::RateLimited { .. }
        )
    }

    /// Returns true if the user dismissed the purchase flow.
    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }

    /// Create a transport error from any error type.
    pub fn transport<E: std::error::Error>(err: E) -> Self {
        Self::Transport(err.to_string())
    }

    /// Create a not found error.
    pub fn not_found(resource_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
        }
    }

    /// Create a product not found error.
    pub fn product_not_found(product_id: impl Into<String>) -> Self {
        Self::ProductNotFound {
            product_id: product_id.into(),
        }
    }

    /// Create a purchase failed error.
    pub fn purchase_failed(product_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PurchaseFailed {
            product_id: product_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PurchaseKitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unimplemented(label) => write!(f, "{} is not implemented", label),
            Self::Transport(msg) => write!(f, "transport error: {}", msg),
            Self::ConnectionFailed { target, reason } => {
                write!(f, "connection to {} failed: {}", target, reason)
            }
            Self::ConnectionTimeout {
                operation,
                timeout_ms,
            } => {
                write!(f, "{} timed out after {}ms", operation, timeout_ms)
            }
            Self::Auth(msg) => write!(f, "authentication error: {}", msg),
            Self::NotFound {
                resource_type,
                identifier,
            } => {
                write!(f, "{} not found: {}", resource_type, identifier)
            }
            Self::ProductNotFound { product_id } => {
                write!(f, "product not found: {}", product_id)
            }
            Self::UserCancelled => write!(f, "purchase cancelled by user"),
            Self::PurchaseFailed { product_id, reason } => {
                write!(f, "purchase of {} failed: {}", product_id, reason)
            }
            Self::InvalidData { field, reason } => {
                write!(f, "invalid {}: {}", field, reason)
            }
            Self::Serialization(msg) => write!(f, "serialization error: {}", msg),
            Self::Storefront(msg) => write!(f, "storefront error: {}", msg),
            Self::RateLimited { retry_after_ms } => {
                write!(f, "rate limited, retry after {}ms", retry_after_ms)
            }
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for PurchaseKitError {}

impl From<serde_json::Error> for PurchaseKitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
