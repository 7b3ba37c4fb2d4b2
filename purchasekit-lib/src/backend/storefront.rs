//! Native storefront backend.
//!
//! [`Storefront`] models the primitives a platform purchase API offers
//! (product lookup, purchase sheet, current transactions, update stream).
//! Platform bindings implement it; [`StorefrontBackend`] adapts it to
//! [`PurchaseBackend`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::traits::{PurchaseBackend, TransactionUpdate, TransactionUpdates, UpdateSlot};
use crate::models::{Entitlement, OwnershipType, Product, ProfileAttributes, SubscriptionPeriod};
use crate::{PurchaseKitError, Result};

/// Errors reported by a platform storefront binding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorefrontError {
    #[error("storefront unavailable: {0}")]
    Unavailable(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("purchases are not allowed on this device")]
    NotAllowed,
    #[error("system error: {0}")]
    System(String),
}

impl From<StorefrontError> for PurchaseKitError {
    fn from(err: StorefrontError) -> Self {
        match err {
            StorefrontError::Network(msg) => PurchaseKitError::Transport(msg),
            other => PurchaseKitError::Storefront(other.to_string()),
        }
    }
}

/// Platform period unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorePeriodUnit {
    Day,
    Week,
    Month,
    Year,
}

/// A product as the platform describes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreProduct {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub display_price: String,
    #[serde(default)]
    pub period_unit: Option<StorePeriodUnit>,
}

/// Platform environment a transaction was made in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreEnvironment {
    Production,
    Sandbox,
    /// Local test configuration.
    Local,
}

/// A platform transaction backing an entitlement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTransaction {
    pub id: String,
    pub product_id: String,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revocation_date: Option<DateTime<Utc>>,
    pub original_purchase_date: DateTime<Utc>,
    pub purchase_date: DateTime<Utc>,
    /// Raw sharing type as reported by the platform
    /// (`"purchased"`, `"family_shared"`, ...).
    pub ownership_type: String,
    pub environment: StoreEnvironment,
    /// The platform verified the transaction signature.
    pub is_verified: bool,
    /// Opaque signed payload, forwarded to services that re-validate it.
    #[serde(default)]
    pub signed_payload: String,
}

/// Result of presenting the purchase sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// The platform completed the purchase.
    Success(StoreTransaction),
    /// The user dismissed the sheet.
    UserCancelled,
    /// Awaiting approval (e.g. ask-to-buy); delivered later as an update.
    Pending,
}

/// Platform purchase primitives.
#[async_trait]
pub trait Storefront: Send + Sync + 'static {
    /// Look up products. Unknown identifiers are silently skipped.
    async fn products(&self, product_ids: &BTreeSet<String>)
        -> std::result::Result<Vec<StoreProduct>, StorefrontError>;

    /// Transactions currently granting access.
    async fn current_entitlements(&self) -> std::result::Result<Vec<StoreTransaction>, StorefrontError>;

    /// Present the purchase sheet for a product.
    async fn purchase(&self, product: &StoreProduct)
        -> std::result::Result<PurchaseOutcome, StorefrontError>;

    /// Mark a transaction as delivered.
    async fn finish(&self, transaction: &StoreTransaction) -> std::result::Result<(), StorefrontError>;

    /// Whether the user may redeem the product's introductory offer.
    async fn is_eligible_for_intro_offer(&self, product_id: &str)
        -> std::result::Result<bool, StorefrontError>;

    /// Force a sync with the platform's purchase records.
    async fn sync(&self) -> std::result::Result<(), StorefrontError>;

    /// Stream of transactions arriving outside a purchase call.
    fn transaction_updates(&self) -> mpsc::UnboundedReceiver<StoreTransaction>;
}

/// Map a platform transaction to an entitlement.
///
/// Active means not yet expired when there is an expiration, otherwise not
/// revoked.
pub fn entitlement_from_transaction(tx: &StoreTransaction, now: DateTime<Utc>) -> Entitlement {
    let is_active = match tx.expiration_date {
        Some(expiration) => expiration >= now,
        None => tx.revocation_date.is_none(),
    };
    let mut entitlement = Entitlement::new(tx.product_id.clone(), is_active)
        .with_purchase_dates(Some(tx.original_purchase_date), Some(tx.purchase_date))
        .with_ownership(ownership_from_platform(&tx.ownership_type))
        .with_flags(tx.environment != StoreEnvironment::Production, tx.is_verified);
    entitlement.expiration_date = tx.expiration_date;
    entitlement
}

/// Map a platform sharing type; anything unrecognized becomes `Unknown`.
pub fn ownership_from_platform(raw: &str) -> OwnershipType {
    match raw
        .to_ascii_lowercase()
        .replace(|c: char| c == '-' || c == ' ', "_")
        .as_str()
    {
        "purchased" => OwnershipType::Purchased,
        "family_shared" | "familyshared" => OwnershipType::FamilyShared,
        _ => OwnershipType::Unknown,
    }
}

/// Map a platform product.
pub fn product_from_store(product: &StoreProduct) -> Product {
    Product::new(
        product.id.clone(),
        product.display_name.clone(),
        product.description.clone(),
        product.display_price.clone(),
        product.period_unit.map(|unit| match unit {
            StorePeriodUnit::Day => SubscriptionPeriod::Day,
            StorePeriodUnit::Week => SubscriptionPeriod::Week,
            StorePeriodUnit::Month => SubscriptionPeriod::Month,
            StorePeriodUnit::Year => SubscriptionPeriod::Year,
        }),
    )
}

/// Backend that talks directly to the platform storefront.
///
/// The platform has no application-level profile, so attribute updates and
/// log out are no-ops, and log in only refreshes entitlements.
pub struct StorefrontBackend<S: Storefront> {
    store: Arc<S>,
    updates: UpdateSlot,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<S: Storefront> StorefrontBackend<S> {
    /// Wrap a platform storefront.
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Wrap a shared platform storefront.
    pub fn from_arc(store: Arc<S>) -> Self {
        Self {
            store,
            updates: UpdateSlot::new(),
            listener: Mutex::new(None),
        }
    }

    /// The wrapped storefront.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

/// Accept a purchase outcome, failing for anything but a verified success.
pub(crate) fn verified_transaction(
    product_id: &str,
    outcome: PurchaseOutcome,
) -> Result<StoreTransaction> {
    match outcome {
        PurchaseOutcome::Success(tx) if tx.is_verified => Ok(tx),
        PurchaseOutcome::Success(_) => Err(PurchaseKitError::purchase_failed(
            product_id,
            "transaction failed verification",
        )),
        PurchaseOutcome::UserCancelled => Err(PurchaseKitError::UserCancelled),
        PurchaseOutcome::Pending => Err(PurchaseKitError::purchase_failed(
            product_id,
            "purchase is pending approval",
        )),
    }
}

/// Look up a single product, failing with `ProductNotFound`.
pub(crate) async fn find_product<S: Storefront>(store: &S, product_id: &str) -> Result<StoreProduct> {
    let ids = BTreeSet::from([product_id.to_string()]);
    store
        .products(&ids)
        .await?
        .into_iter()
        .find(|p| p.id == product_id)
        .ok_or_else(|| PurchaseKitError::product_not_found(product_id))
}

/// Map platform products, failing with `NotFound` when none matched.
pub(crate) fn products_or_not_found(
    products: &[StoreProduct],
    requested: &BTreeSet<String>,
) -> Result<Vec<Product>> {
    if products.is_empty() {
        let ids: Vec<&str> = requested.iter().map(String::as_str).collect();
        return Err(PurchaseKitError::not_found("products", ids.join(",")));
    }
    Ok(products.iter().map(product_from_store).collect())
}

impl<S: Storefront> Drop for StorefrontBackend<S> {
    fn drop(&mut self) {
        if let Some(handle) = self
            .listener
            .get_mut()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}

#[async_trait]
impl<S: Storefront> PurchaseBackend for StorefrontBackend<S> {
    async fn fetch_products(&self, product_ids: &BTreeSet<String>) -> Result<Vec<Product>> {
        let products = self.store.products(product_ids).await?;
        products_or_not_found(&products, product_ids)
    }

    async fn fetch_entitlements(&self) -> Result<Vec<Entitlement>> {
        let now = Utc::now();
        Ok(self
            .store
            .current_entitlements()
            .await?
            .iter()
            .map(|tx| entitlement_from_transaction(tx, now))
            .collect())
    }

    async fn purchase(&self, product_id: &str) -> Result<Vec<Entitlement>> {
        let product = find_product(self.store.as_ref(), product_id).await?;
        let outcome = self.store.purchase(&product).await?;
        let tx = verified_transaction(product_id, outcome)?;
        self.store.finish(&tx).await?;
        tracing::debug!(transaction_id = %tx.id, product_id, "purchase finished");
        self.fetch_entitlements().await
    }

    async fn check_trial_eligibility(&self, product_id: &str) -> Result<bool> {
        Ok(self.store.is_eligible_for_intro_offer(product_id).await?)
    }

    async fn restore(&self) -> Result<Vec<Entitlement>> {
        self.store.sync().await?;
        self.fetch_entitlements().await
    }

    async fn subscribe_to_transaction_updates(&self) -> Result<TransactionUpdates> {
        let subscription = self.updates.subscribe();
        let sender = self.updates.sender();
        let store = Arc::clone(&self.store);
        let mut incoming = store.transaction_updates();

        let handle = tokio::spawn(async move {
            while let Some(tx) = incoming.recv().await {
                if !tx.is_verified {
                    tracing::warn!(transaction_id = %tx.id, "ignoring unverified transaction update");
                    continue;
                }
                if let Err(e) = store.finish(&tx).await {
                    tracing::warn!(transaction_id = %tx.id, "failed to finish transaction: {}", e);
                }
                let delivered = sender
                    .as_ref()
                    .map(|s| s.send(TransactionUpdate::Changed).is_ok())
                    .unwrap_or(false);
                if !delivered {
                    break;
                }
            }
        });

        let mut listener = self.listener.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = listener.replace(handle) {
            previous.abort();
        }
        Ok(subscription)
    }

    async fn log_in(&self, _user_id: &str) -> Result<Vec<Entitlement>> {
        self.fetch_entitlements().await
    }

    async fn update_profile_attributes(&self, _attributes: &ProfileAttributes) -> Result<()> {
        Ok(())
    }

    async fn log_out(&self) -> Result<()> {
        Ok(())
    }
}
