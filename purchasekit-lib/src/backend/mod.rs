//! Purchase backends.
//!
//! - [`MockBackend`]: in-memory, for tests and previews
//! - [`StorefrontBackend`]: direct platform storefront integration
//! - [`ServiceBackend`]: storefront purchases validated by a subscription service

pub mod mock;
pub mod service;
pub mod storefront;
pub mod traits;

pub use mock::MockBackend;
pub use service::{ServiceBackend, ServiceClient};
pub use storefront::{
    entitlement_from_transaction, ownership_from_platform, product_from_store, PurchaseOutcome,
    StoreEnvironment, StorePeriodUnit, StoreProduct, StoreTransaction, Storefront,
    StorefrontBackend, StorefrontError,
};
pub use traits::{PurchaseBackend, TransactionUpdate, TransactionUpdates, UpdateSlot};
