//! Shared fixtures and test doubles for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use purchasekit_lib::backend::{
    MockBackend, PurchaseBackend, PurchaseOutcome, StoreEnvironment, StorePeriodUnit,
    StoreProduct, StoreTransaction, Storefront, StorefrontError, TransactionUpdate,
    TransactionUpdates,
};
use purchasekit_lib::models::{Entitlement, Product, ProfileAttributes, SubscriptionPeriod};
use purchasekit_lib::{PurchaseKitError, Result};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const MONTHLY: &str = "com.example.pro.monthly";
pub const ANNUAL: &str = "com.example.pro.annual";

pub fn catalog() -> Vec<Product> {
    vec![
        Product::new(
            MONTHLY,
            "Pro Monthly",
            "All features, billed monthly",
            "$4.99",
            Some(SubscriptionPeriod::Month),
        ),
        Product::new(
            ANNUAL,
            "Pro Annual",
            "All features, billed yearly",
            "$39.99",
            Some(SubscriptionPeriod::Year),
        ),
    ]
}

pub fn mock_backend(entitlements: Vec<Entitlement>) -> Arc<MockBackend> {
    Arc::new(MockBackend::new(catalog(), entitlements).with_latency(Duration::ZERO))
}

pub fn expiring_in(product_id: &str, days: i64) -> Entitlement {
    Entitlement::new(product_id, days >= 0).with_expiration(Utc::now() + ChronoDuration::days(days))
}

/// Poll `condition` until it holds, failing the test after one second.
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 1s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// ============================================================================
// Scripted backend
// ============================================================================

/// Mock backend with injectable failures.
pub struct ScriptedBackend {
    pub inner: Arc<MockBackend>,
    fetch_failures: AtomicUsize,
    fetch_calls: AtomicUsize,
    purchase_error: Mutex<Option<PurchaseKitError>>,
    log_in_error: Mutex<Option<PurchaseKitError>>,
    log_out_error: Mutex<Option<PurchaseKitError>>,
    attributes_error: Mutex<Option<PurchaseKitError>>,
}

impl ScriptedBackend {
    pub fn new(inner: Arc<MockBackend>) -> Self {
        Self {
            inner,
            fetch_failures: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            purchase_error: Mutex::new(None),
            log_in_error: Mutex::new(None),
            log_out_error: Mutex::new(None),
            attributes_error: Mutex::new(None),
        }
    }

    /// Fail the next `count` entitlement fetches with a transport error.
    pub fn fail_next_fetches(&self, count: usize) {
        self.fetch_failures.store(count, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn fail_purchase_with(&self, error: PurchaseKitError) {
        *self.purchase_error.lock().unwrap() = Some(error);
    }

    pub fn fail_log_in_with(&self, error: PurchaseKitError) {
        *self.log_in_error.lock().unwrap() = Some(error);
    }

    pub fn fail_log_out_with(&self, error: PurchaseKitError) {
        *self.log_out_error.lock().unwrap() = Some(error);
    }

    pub fn fail_attributes_with(&self, error: PurchaseKitError) {
        *self.attributes_error.lock().unwrap() = Some(error);
    }

    fn scripted(slot: &Mutex<Option<PurchaseKitError>>) -> Result<()> {
        match slot.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PurchaseBackend for ScriptedBackend {
    async fn fetch_products(&self, product_ids: &BTreeSet<String>) -> Result<Vec<Product>> {
        self.inner.fetch_products(product_ids).await
    }

    async fn fetch_entitlements(&self) -> Result<Vec<Entitlement>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fetch_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fetch_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PurchaseKitError::Transport("network unreachable".into()));
        }
        self.inner.fetch_entitlements().await
    }

    async fn purchase(&self, product_id: &str) -> Result<Vec<Entitlement>> {
        Self::scripted(&self.purchase_error)?;
        self.inner.purchase(product_id).await
    }

    async fn check_trial_eligibility(&self, product_id: &str) -> Result<bool> {
        self.inner.check_trial_eligibility(product_id).await
    }

    async fn restore(&self) -> Result<Vec<Entitlement>> {
        self.inner.restore().await
    }

    async fn subscribe_to_transaction_updates(&self) -> Result<TransactionUpdates> {
        self.inner.subscribe_to_transaction_updates().await
    }

    async fn log_in(&self, user_id: &str) -> Result<Vec<Entitlement>> {
        Self::scripted(&self.log_in_error)?;
        self.inner.log_in(user_id).await
    }

    async fn update_profile_attributes(&self, attributes: &ProfileAttributes) -> Result<()> {
        Self::scripted(&self.attributes_error)?;
        self.inner.update_profile_attributes(attributes).await
    }

    async fn log_out(&self) -> Result<()> {
        Self::scripted(&self.log_out_error)?;
        self.inner.log_out().await
    }
}

/// Push an update through a mock's current subscription.
pub fn push(backend: &MockBackend, update: TransactionUpdate) {
    assert!(backend.push_update(update), "no live subscriber");
}

// ============================================================================
// Fake platform storefront
// ============================================================================

#[derive(Default)]
struct FakeState {
    transactions: Vec<StoreTransaction>,
    next_outcome: Option<PurchaseOutcome>,
    finished: Vec<String>,
    syncs: usize,
    intro_eligible: BTreeSet<String>,
    next_id: u64,
}

/// In-memory platform storefront.
#[derive(Default)]
pub struct FakeStorefront {
    products: Vec<StoreProduct>,
    state: Mutex<FakeState>,
    updates: Mutex<Option<mpsc::UnboundedSender<StoreTransaction>>>,
}

impl FakeStorefront {
    pub fn new() -> Self {
        Self {
            products: vec![
                StoreProduct {
                    id: MONTHLY.into(),
                    display_name: "Pro Monthly".into(),
                    description: "All features, billed monthly".into(),
                    display_price: "$4.99".into(),
                    period_unit: Some(StorePeriodUnit::Month),
                },
                StoreProduct {
                    id: ANNUAL.into(),
                    display_name: "Pro Annual".into(),
                    description: "All features, billed yearly".into(),
                    display_price: "$39.99".into(),
                    period_unit: Some(StorePeriodUnit::Year),
                },
            ],
            ..Default::default()
        }
    }

    pub fn with_transaction(self, tx: StoreTransaction) -> Self {
        self.state.lock().unwrap().transactions.push(tx);
        self
    }

    pub fn with_intro_offer(self, product_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .intro_eligible
            .insert(product_id.to_string());
        self
    }

    /// Outcome returned by the next purchase instead of a fresh success.
    pub fn set_next_outcome(&self, outcome: PurchaseOutcome) {
        self.state.lock().unwrap().next_outcome = Some(outcome);
    }

    pub fn finished(&self) -> Vec<String> {
        self.state.lock().unwrap().finished.clone()
    }

    pub fn syncs(&self) -> usize {
        self.state.lock().unwrap().syncs
    }

    /// Deliver a transaction on the update stream and record it as current.
    pub fn deliver(&self, tx: StoreTransaction) -> bool {
        self.state.lock().unwrap().transactions.push(tx.clone());
        match self.updates.lock().unwrap().as_ref() {
            Some(sender) => sender.send(tx).is_ok(),
            None => false,
        }
    }

    fn mint(&self, product_id: &str) -> StoreTransaction {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let now = Utc::now();
        let tx = store_transaction(
            &format!("20000000{}", state.next_id),
            product_id,
            Some(now + ChronoDuration::days(30)),
            now,
        );
        state.transactions.push(tx.clone());
        tx
    }
}

pub fn store_transaction(
    id: &str,
    product_id: &str,
    expiration: Option<DateTime<Utc>>,
    purchased: DateTime<Utc>,
) -> StoreTransaction {
    StoreTransaction {
        id: id.into(),
        product_id: product_id.into(),
        expiration_date: expiration,
        revocation_date: None,
        original_purchase_date: purchased,
        purchase_date: purchased,
        ownership_type: "purchased".into(),
        environment: StoreEnvironment::Sandbox,
        is_verified: true,
        signed_payload: format!("signed.{}", id),
    }
}

#[async_trait]
impl Storefront for FakeStorefront {
    async fn products(
        &self,
        product_ids: &BTreeSet<String>,
    ) -> std::result::Result<Vec<StoreProduct>, StorefrontError> {
        Ok(self
            .products
            .iter()
            .filter(|p| product_ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn current_entitlements(
        &self,
    ) -> std::result::Result<Vec<StoreTransaction>, StorefrontError> {
        Ok(self.state.lock().unwrap().transactions.clone())
    }

    async fn purchase(
        &self,
        product: &StoreProduct,
    ) -> std::result::Result<PurchaseOutcome, StorefrontError> {
        let scripted = self.state.lock().unwrap().next_outcome.take();
        match scripted {
            Some(outcome) => Ok(outcome),
            None => Ok(PurchaseOutcome::Success(self.mint(&product.id))),
        }
    }

    async fn finish(&self, transaction: &StoreTransaction) -> std::result::Result<(), StorefrontError> {
        self.state
            .lock()
            .unwrap()
            .finished
            .push(transaction.id.clone());
        Ok(())
    }

    async fn is_eligible_for_intro_offer(
        &self,
        product_id: &str,
    ) -> std::result::Result<bool, StorefrontError> {
        Ok(self.state.lock().unwrap().intro_eligible.contains(product_id))
    }

    async fn sync(&self) -> std::result::Result<(), StorefrontError> {
        self.state.lock().unwrap().syncs += 1;
        Ok(())
    }

    fn transaction_updates(&self) -> mpsc::UnboundedReceiver<StoreTransaction> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.updates.lock().unwrap() = Some(sender);
        receiver
    }
}
