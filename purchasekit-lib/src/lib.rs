//! PurchaseKit library.
//!
//! A single facade over in-app purchase systems. Application code talks to a
//! [`PurchaseCoordinator`]; the purchase system behind it is a
//! [`PurchaseBackend`](backend::PurchaseBackend) chosen at construction.
//!
//! # Features
//!
//! - **Coordinator**: products, purchase, restore, trial eligibility, identity
//!   and an observable, sorted entitlement list
//! - **Backends**: in-memory mock, native platform storefront, hosted
//!   subscription service
//! - **Analytics**: flat parameter projections of products and entitlements,
//!   reported through a pluggable [`EventLogger`](logger::EventLogger)
//!
//! # Feature Flags
//!
//! - `http-backend`: HTTP client for [`ServiceBackend`](backend::ServiceBackend)
//!
//! # Example
//!
//! ```ignore
//! use purchasekit_lib::prelude::*;
//! use std::sync::Arc;
//!
//! let backend = Arc::new(MockBackend::default());
//! let coordinator = PurchaseCoordinator::new(
//!     backend,
//!     Arc::new(TracingLogger),
//!     CoordinatorConfig::default(),
//! )
//! .await;
//!
//! let products = coordinator.get_products(["com.example.pro.monthly"]).await?;
//! ```

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod logger;
pub mod models;
pub mod prelude;

pub use config::{CoordinatorConfig, ServiceConfig};
pub use coordinator::{IdentityState, PurchaseCoordinator};
pub use errors::{PurchaseKitError, PurchaseKitErrorCode};

/// Common result alias for PurchaseKit operations.
pub type Result<T> = std::result::Result<T, PurchaseKitError>;
