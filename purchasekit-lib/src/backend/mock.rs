//! In-memory purchase backend.
//!
//! For tests, previews and offline development. Nothing is persisted and no
//! operation ever fails.
//!
//! # Thread Safety
//!
//! State lives behind a `Mutex`. A poisoned lock is recovered rather than
//! surfaced, since this backend never reports errors.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::traits::{PurchaseBackend, TransactionUpdate, TransactionUpdates, UpdateSlot};
use crate::models::{Entitlement, OwnershipType, Product, ProfileAttributes};
use crate::Result;

/// Artificial latency applied before every operation by default.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
struct MockState {
    entitlements: Vec<Entitlement>,
    user_id: Option<String>,
    attributes: Option<ProfileAttributes>,
}

/// Backend holding a fixed catalog and a mutable entitlement list.
#[derive(Debug)]
pub struct MockBackend {
    catalog: Vec<Product>,
    state: Mutex<MockState>,
    latency: Duration,
    updates: UpdateSlot,
}

impl MockBackend {
    /// Create a mock with the given catalog and starting entitlements.
    pub fn new(catalog: Vec<Product>, entitlements: Vec<Entitlement>) -> Self {
        Self {
            catalog,
            state: Mutex::new(MockState {
                entitlements,
                ..Default::default()
            }),
            latency: DEFAULT_LATENCY,
            updates: UpdateSlot::new(),
        }
    }

    /// Set the artificial latency. `Duration::ZERO` disables it.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The fixed catalog.
    pub fn catalog(&self) -> &[Product] {
        &self.catalog
    }

    /// User id from the last `log_in`, cleared by `log_out`.
    pub fn user_id(&self) -> Option<String> {
        self.state().user_id.clone()
    }

    /// Attributes from the last `update_profile_attributes`.
    pub fn profile_attributes(&self) -> Option<ProfileAttributes> {
        self.state().attributes.clone()
    }

    /// Grant an entitlement outside any direct call, as a renewal or a
    /// purchase on another device would, and notify the subscriber.
    ///
    /// Returns false when there is no live subscriber.
    pub fn simulate_external_purchase(&self, product_id: &str) -> bool {
        self.state()
            .entitlements
            .push(week_long_entitlement(product_id));
        self.updates.notify(TransactionUpdate::Changed)
    }

    /// Push an arbitrary update to the current subscriber.
    pub fn push_update(&self, update: TransactionUpdate) -> bool {
        self.updates.notify(update)
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

fn week_long_entitlement(product_id: &str) -> Entitlement {
    let now = Utc::now();
    Entitlement::new(product_id, true)
        .with_expiration(now + ChronoDuration::days(7))
        .with_purchase_dates(Some(now), Some(now))
        .with_ownership(OwnershipType::Purchased)
        .with_flags(true, true)
}

#[async_trait]
impl PurchaseBackend for MockBackend {
    async fn fetch_products(&self, product_ids: &BTreeSet<String>) -> Result<Vec<Product>> {
        self.simulate_latency().await;
        Ok(self
            .catalog
            .iter()
            .filter(|p| product_ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn fetch_entitlements(&self) -> Result<Vec<Entitlement>> {
        self.simulate_latency().await;
        Ok(self.state().entitlements.clone())
    }

    async fn purchase(&self, product_id: &str) -> Result<Vec<Entitlement>> {
        self.simulate_latency().await;
        let mut state = self.state();
        state.entitlements.push(week_long_entitlement(product_id));
        Ok(state.entitlements.clone())
    }

    async fn check_trial_eligibility(&self, product_id: &str) -> Result<bool> {
        self.simulate_latency().await;
        let state = self.state();
        Ok(!state.entitlements.iter().any(|e| e.product_id == product_id))
    }

    async fn restore(&self) -> Result<Vec<Entitlement>> {
        self.simulate_latency().await;
        let product_id = uuid::Uuid::new_v4().to_string();
        let mut state = self.state();
        state.entitlements.push(week_long_entitlement(&product_id));
        Ok(state.entitlements.clone())
    }

    async fn subscribe_to_transaction_updates(&self) -> Result<TransactionUpdates> {
        Ok(self.updates.subscribe())
    }

    async fn log_in(&self, user_id: &str) -> Result<Vec<Entitlement>> {
        self.simulate_latency().await;
        let mut state = self.state();
        state.user_id = Some(user_id.to_string());
        Ok(state.entitlements.clone())
    }

    async fn update_profile_attributes(&self, attributes: &ProfileAttributes) -> Result<()> {
        self.simulate_latency().await;
        self.state().attributes = Some(attributes.clone());
        Ok(())
    }

    async fn log_out(&self) -> Result<()> {
        self.simulate_latency().await;
        let mut state = self.state();
        state.entitlements.clear();
        state.user_id = None;
        state.attributes = None;
        Ok(())
    }
}
