//! Purchase Backend Traits
//!
//! Any purchase-processing system (a platform storefront, a subscription
//! service, an in-memory mock) implements [`PurchaseBackend`] to plug into
//! the coordinator.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::models::{Entitlement, Product, ProfileAttributes};
use crate::Result;

/// Out-of-band change reported by a backend.
#[derive(Clone, Debug, PartialEq)]
pub enum TransactionUpdate {
    /// Entitlements changed; the subscriber should refetch them.
    Changed,
    /// Entitlements changed and the fresh list is attached.
    Entitlements(Vec<Entitlement>),
}

/// Receiving half of a transaction-update subscription.
///
/// The stream ends when the backend cancels the subscription, which happens
/// when a newer subscription replaces it.
#[derive(Debug)]
pub struct TransactionUpdates {
    receiver: mpsc::UnboundedReceiver<TransactionUpdate>,
}

impl TransactionUpdates {
    /// Wait for the next update. Returns `None` once the subscription ended.
    pub async fn next(&mut self) -> Option<TransactionUpdate> {
        self.receiver.recv().await
    }

    /// A subscription that never yields, for backends with no update source.
    pub fn closed() -> Self {
        let (_, receiver) = mpsc::unbounded_channel();
        Self { receiver }
    }
}

/// Backend-side holder of the single active subscription.
///
/// Subscribing again drops the previous sender, which ends the previous
/// subscriber's stream.
#[derive(Debug, Default)]
pub struct UpdateSlot {
    sender: Mutex<Option<mpsc::UnboundedSender<TransactionUpdate>>>,
}

impl UpdateSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any existing subscription with a fresh one.
    pub fn subscribe(&self) -> TransactionUpdates {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut slot = self.sender.lock().unwrap_or_else(|p| p.into_inner());
        *slot = Some(sender);
        TransactionUpdates { receiver }
    }

    /// Sender for the current subscription, if any.
    pub fn sender(&self) -> Option<mpsc::UnboundedSender<TransactionUpdate>> {
        self.sender
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Deliver an update to the current subscriber.
    ///
    /// Returns false when nobody is subscribed or the subscriber went away.
    pub fn notify(&self, update: TransactionUpdate) -> bool {
        match self.sender() {
            Some(sender) => sender.send(update).is_ok(),
            None => false,
        }
    }

    /// Cancel the current subscription.
    pub fn cancel(&self) {
        self.sender
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
    }
}

/// The operation set every purchase backend provides.
///
/// All operations are asynchronous and report failures to the caller.
#[async_trait]
pub trait PurchaseBackend: Send + Sync {
    /// Fetch catalog entries for the given identifiers.
    ///
    /// When none of the identifiers exist, an implementation either fails
    /// with `NotFound` or returns an empty list, and does so consistently.
    async fn fetch_products(&self, product_ids: &BTreeSet<String>) -> Result<Vec<Product>>;

    /// Current entitlements of the signed-in (or anonymous) identity.
    async fn fetch_entitlements(&self) -> Result<Vec<Entitlement>>;

    /// Run the purchase flow for a product and return the refreshed
    /// entitlement list.
    ///
    /// Fails with `ProductNotFound`, `UserCancelled` or `PurchaseFailed`.
    async fn purchase(&self, product_id: &str) -> Result<Vec<Entitlement>>;

    /// Whether the user may still redeem an introductory offer.
    async fn check_trial_eligibility(&self, product_id: &str) -> Result<bool>;

    /// Re-synchronize with the storefront and return the refreshed list.
    async fn restore(&self) -> Result<Vec<Entitlement>>;

    /// Start receiving out-of-band entitlement changes, cancelling any
    /// previous subscription.
    async fn subscribe_to_transaction_updates(&self) -> Result<TransactionUpdates>;

    /// Associate purchases with an application user id. Repeating the call
    /// with the same id only refreshes entitlements.
    async fn log_in(&self, user_id: &str) -> Result<Vec<Entitlement>>;

    /// Forward profile and attribution data.
    async fn update_profile_attributes(&self, attributes: &ProfileAttributes) -> Result<()>;

    /// Disassociate the current identity and clear backend-local state.
    async fn log_out(&self) -> Result<()>;
}
