//! Subscription-service backend.
//!
//! Purchases still run through the platform [`Storefront`], but every
//! transaction is posted to a hosted subscription service which owns the
//! subscriber record. Entitlements come from the service, identities are
//! aliased server-side, and profile attributes are stored there.
//!
//! Until `log_in` is called the subscriber is anonymous, identified by a
//! generated `$Anonymous:<id>` app user id.

mod client;
mod types;

pub use client::ServiceClient;
pub use types::{
    AttributeValue, AttributesRequest, IdentifyRequest, NonSubscription, ReceiptRequest,
    ServiceSubscription, Subscriber, SubscriberResponse,
};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use super::storefront::{find_product, products_or_not_found, verified_transaction, Storefront, StoreTransaction};
use super::traits::{PurchaseBackend, TransactionUpdate, TransactionUpdates, UpdateSlot};
use crate::config::ServiceConfig;
use crate::models::{Entitlement, Product, ProfileAttributes};
use crate::Result;

/// Prefix of generated anonymous app user ids.
pub const ANONYMOUS_PREFIX: &str = "$Anonymous:";

/// Generate a fresh anonymous app user id.
pub fn anonymous_user_id() -> String {
    format!("{}{}", ANONYMOUS_PREFIX, uuid::Uuid::new_v4().simple())
}

/// Backend delegating subscriber state to a hosted subscription service.
pub struct ServiceBackend<S: Storefront> {
    client: Arc<ServiceClient>,
    store: Arc<S>,
    app_user_id: Arc<Mutex<String>>,
    updates: UpdateSlot,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<S: Storefront> ServiceBackend<S> {
    /// Create a backend for the given service and platform storefront.
    pub fn new(config: ServiceConfig, store: S) -> Result<Self> {
        Ok(Self::with_client(ServiceClient::new(config)?, Arc::new(store)))
    }

    /// Create a backend from an existing client and shared storefront.
    pub fn with_client(client: ServiceClient, store: Arc<S>) -> Self {
        Self {
            client: Arc::new(client),
            store,
            app_user_id: Arc::new(Mutex::new(anonymous_user_id())),
            updates: UpdateSlot::new(),
            listener: Mutex::new(None),
        }
    }

    /// The wrapped storefront.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The app user id requests are currently made for.
    pub fn current_user_id(&self) -> String {
        self.app_user_id
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Whether the current subscriber is anonymous.
    pub fn is_anonymous(&self) -> bool {
        self.current_user_id().starts_with(ANONYMOUS_PREFIX)
    }

    fn set_user_id(&self, user_id: String) {
        *self.app_user_id.lock().unwrap_or_else(|p| p.into_inner()) = user_id;
    }

    async fn post_transaction(&self, tx: &StoreTransaction, is_restore: bool) -> Result<Vec<Entitlement>> {
        post_receipt(&self.client, self.current_user_id(), tx, is_restore).await
    }
}

async fn post_receipt(
    client: &ServiceClient,
    app_user_id: String,
    tx: &StoreTransaction,
    is_restore: bool,
) -> Result<Vec<Entitlement>> {
    let request = ReceiptRequest {
        app_user_id,
        fetch_token: tx.signed_payload.clone(),
        product_id: tx.product_id.clone(),
        is_restore,
    };
    Ok(client.post_receipt(&request).await?.entitlements())
}

impl<S: Storefront> Drop for ServiceBackend<S> {
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
impl<S: Storefront> PurchaseBackend for ServiceBackend<S> {
    async fn fetch_products(&self, product_ids: &BTreeSet<String>) -> Result<Vec<Product>> {
        let products = self.store.products(product_ids).await?;
        products_or_not_found(&products, product_ids)
    }

    async fn fetch_entitlements(&self) -> Result<Vec<Entitlement>> {
        let app_user_id = self.current_user_id();
        Ok(self.client.get_subscriber(&app_user_id).await?.entitlements())
    }

    async fn purchase(&self, product_id: &str) -> Result<Vec<Entitlement>> {
        let product = find_product(self.store.as_ref(), product_id).await?;
        let outcome = self.store.purchase(&product).await?;
        let tx = verified_transaction(product_id, outcome)?;

        // Finish only after the service accepted the receipt, so a failed
        // post is retried by the platform on the next launch.
        let entitlements = self.post_transaction(&tx, false).await?;
        self.store.finish(&tx).await?;
        tracing::debug!(transaction_id = %tx.id, product_id, "purchase posted and finished");
        Ok(entitlements)
    }

    async fn check_trial_eligibility(&self, product_id: &str) -> Result<bool> {
        Ok(self.store.is_eligible_for_intro_offer(product_id).await?)
    }

    async fn restore(&self) -> Result<Vec<Entitlement>> {
        self.store.sync().await?;
        let transactions = self.store.current_entitlements().await?;

        let mut latest = None;
        for tx in &transactions {
            latest = Some(self.post_transaction(tx, true).await?);
        }
        match latest {
            Some(entitlements) => Ok(entitlements),
            None => self.fetch_entitlements().await,
        }
    }

    async fn subscribe_to_transaction_updates(&self) -> Result<TransactionUpdates> {
        let subscription = self.updates.subscribe();
        let sender = self.updates.sender();
        let store = Arc::clone(&self.store);
        let client = Arc::clone(&self.client);
        let app_user_id = Arc::clone(&self.app_user_id);
        let mut incoming = store.transaction_updates();

        let handle = tokio::spawn(async move {
            let Some(sender) = sender else { return };
            while let Some(tx) = incoming.recv().await {
                if !tx.is_verified {
                    tracing::warn!(transaction_id = %tx.id, "ignoring unverified transaction update");
                    continue;
                }
                let user_id = app_user_id.lock().unwrap_or_else(|p| p.into_inner()).clone();
                let update = match post_receipt(&client, user_id, &tx, false).await {
                    Ok(entitlements) => {
                        if let Err(e) = store.finish(&tx).await {
                            tracing::warn!(transaction_id = %tx.id, "failed to finish transaction: {}", e);
                        }
                        TransactionUpdate::Entitlements(entitlements)
                    }
                    Err(e) => {
                        tracing::warn!(transaction_id = %tx.id, "failed to post transaction update: {}", e);
                        TransactionUpdate::Changed
                    }
                };
                if sender.send(update).is_err() {
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

    async fn log_in(&self, user_id: &str) -> Result<Vec<Entitlement>> {
        let current = self.current_user_id();
        if current == user_id {
            return self.fetch_entitlements().await;
        }

        let request = IdentifyRequest {
            app_user_id: current,
            new_app_user_id: user_id.to_string(),
        };
        let response = self.client.identify(&request).await?;
        self.set_user_id(user_id.to_string());
        tracing::info!(app_user_id = user_id, "subscriber identified");
        Ok(response.entitlements())
    }

    async fn update_profile_attributes(&self, attributes: &ProfileAttributes) -> Result<()> {
        if attributes.is_empty() {
            return Ok(());
        }
        let request = AttributesRequest::from_profile(attributes, Utc::now());
        self.client
            .post_attributes(&self.current_user_id(), &request)
            .await
    }

    async fn log_out(&self) -> Result<()> {
        let anonymous = anonymous_user_id();
        tracing::info!(app_user_id = %anonymous, "subscriber reset to anonymous");
        self.set_user_id(anonymous);
        Ok(())
    }
}
