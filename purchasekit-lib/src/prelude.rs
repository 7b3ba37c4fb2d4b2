//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use purchasekit_lib::prelude::*;
//! ```

// Coordinator
pub use crate::coordinator::{IdentityState, PurchaseCoordinator};
pub use crate::config::{CoordinatorConfig, ServiceConfig};

// Error handling
pub use crate::errors::{PurchaseKitError, PurchaseKitErrorCode};
pub use crate::Result;

// Models
pub use crate::models::{
    Entitlement, EntitlementsExt, OwnershipType, ParamValue, Params, Product, ProductsExt,
    ProfileAttributes, SubscriptionPeriod,
};

// Backends
pub use crate::backend::{
    MockBackend, PurchaseBackend, ServiceBackend, Storefront, StorefrontBackend,
    TransactionUpdate, TransactionUpdates,
};

// Logging
pub use crate::logger::{EventLogger, LogEvent, MemoryLogger, Severity, TracingLogger};
