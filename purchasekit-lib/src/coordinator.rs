//! The purchase coordinator.
//!
//! [`PurchaseCoordinator`] is the single object application code talks to.
//! It wraps exactly one [`PurchaseBackend`], holds the current entitlement
//! list, reports every operation outcome to an [`EventLogger`], and keeps
//! the list fresh by listening for out-of-band transaction updates.
//!
//! # Example
//!
//! ```no_run
//! use purchasekit_lib::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> purchasekit_lib::Result<()> {
//! let backend = Arc::new(MockBackend::default());
//! let mut coordinator = PurchaseCoordinator::new(
//!     backend,
//!     Arc::new(TracingLogger),
//!     CoordinatorConfig::default(),
//! )
//! .await;
//!
//! coordinator.log_in("user-42", None).await?;
//! coordinator.purchase_product("com.example.pro.monthly").await?;
//! assert!(coordinator.has_active_entitlement());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::backend::{PurchaseBackend, TransactionUpdate, TransactionUpdates};
use crate::config::{saturating_millis, CoordinatorConfig};
use crate::logger::{events, EventLogger, LogEvent, Severity};
use crate::models::{
    param, sort_by_expiration, Entitlement, EntitlementsExt, Params, Product, ProductsExt,
    ProfileAttributes,
};
use crate::{PurchaseKitError, Result};

/// Who the coordinator is acting for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum IdentityState {
    /// No successful log in yet, or logged out since.
    #[default]
    Anonymous,
    /// After a successful log in.
    SignedIn { user_id: String },
}

impl IdentityState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, IdentityState::SignedIn { .. })
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            IdentityState::SignedIn { user_id } => Some(user_id),
            IdentityState::Anonymous => None,
        }
    }
}

/// Published entitlement list, shared with the listener task.
#[derive(Clone)]
struct EntitlementState {
    sender: Arc<watch::Sender<Vec<Entitlement>>>,
    logger: Arc<dyn EventLogger>,
}

impl EntitlementState {
    fn new(logger: Arc<dyn EventLogger>) -> Self {
        let (sender, _) = watch::channel(Vec::new());
        Self {
            sender: Arc::new(sender),
            logger,
        }
    }

    /// Sort, publish and merge the list projection into user properties.
    fn replace(&self, mut entitlements: Vec<Entitlement>) -> Vec<Entitlement> {
        sort_by_expiration(&mut entitlements);
        self.logger
            .merge_user_properties(entitlements.analytics_params(), true);
        self.sender.send_replace(entitlements.clone());
        entitlements
    }

    /// Replace from the background path and log the refresh.
    fn refreshed(&self, entitlements: Vec<Entitlement>) {
        let entitlements = self.replace(entitlements);
        tracing::debug!(count = entitlements.len(), "entitlements refreshed in background");
        self.logger.log_event(
            LogEvent::new(events::ENTITLEMENTS_REFRESHED, Severity::Analytic)
                .with_params(entitlements.analytics_params()),
        );
    }

    fn current(&self) -> Vec<Entitlement> {
        self.sender.borrow().clone()
    }
}

/// Facade over a purchase backend.
///
/// `log_in` and `log_out` take `&mut self`; identity transitions cannot run
/// concurrently. Everything else takes `&self`.
pub struct PurchaseCoordinator {
    backend: Arc<dyn PurchaseBackend>,
    logger: Arc<dyn EventLogger>,
    config: CoordinatorConfig,
    state: EntitlementState,
    identity: IdentityState,
    listener: Option<JoinHandle<()>>,
}

impl PurchaseCoordinator {
    /// Create a coordinator, load initial entitlements and start listening
    /// for transaction updates.
    ///
    /// A failing initial fetch is logged and otherwise ignored; the listener
    /// refreshes state once the backend reports a change.
    pub async fn new(
        backend: Arc<dyn PurchaseBackend>,
        logger: Arc<dyn EventLogger>,
        config: CoordinatorConfig,
    ) -> Self {
        let state = EntitlementState::new(Arc::clone(&logger));
        let mut coordinator = Self {
            backend,
            logger,
            config,
            state,
            identity: IdentityState::Anonymous,
            listener: None,
        };

        match coordinator.backend.fetch_entitlements().await {
            Ok(entitlements) => {
                coordinator.state.replace(entitlements);
            }
            Err(e) => tracing::warn!("initial entitlement fetch failed: {}", e),
        }
        coordinator.subscribe().await;
        coordinator
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Current entitlements, furthest expiration first.
    pub fn entitlements(&self) -> Vec<Entitlement> {
        self.state.current()
    }

    /// Active subset of the current entitlements, in the same order.
    pub fn active_entitlements(&self) -> Vec<Entitlement> {
        self.state
            .sender
            .borrow()
            .active()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn has_active_entitlement(&self) -> bool {
        self.state.sender.borrow().has_active_entitlement()
    }

    /// Observe every replacement of the entitlement list.
    pub fn watch_entitlements(&self) -> watch::Receiver<Vec<Entitlement>> {
        self.state.sender.subscribe()
    }

    pub fn identity(&self) -> &IdentityState {
        &self.identity
    }

    pub fn backend(&self) -> &Arc<dyn PurchaseBackend> {
        &self.backend
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Fetch catalog entries.
    #[tracing::instrument(skip(self, product_ids))]
    pub async fn get_products<I, S>(&self, product_ids: I) -> Result<Vec<Product>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: BTreeSet<String> = product_ids.into_iter().map(Into::into).collect();
        let joined = ids.iter().map(String::as_str).collect::<Vec<_>>().join(",");
        self.log(
            events::GET_PRODUCTS_STARTED,
            Severity::Info,
            param("product_ids", joined.as_str()),
        );

        match self.backend.fetch_products(&ids).await {
            Ok(products) => {
                self.log(
                    events::GET_PRODUCTS_SUCCEEDED,
                    Severity::Analytic,
                    products.analytics_params(),
                );
                Ok(products)
            }
            Err(e) => {
                self.log_failure(
                    events::GET_PRODUCTS_FAILED,
                    &e,
                    param("product_ids", joined),
                );
                Err(e)
            }
        }
    }

    /// Buy a product and return the refreshed, sorted entitlement list.
    ///
    /// On failure the held entitlements are left untouched.
    #[tracing::instrument(skip(self))]
    pub async fn purchase_product(&self, product_id: &str) -> Result<Vec<Entitlement>> {
        self.log(
            events::PURCHASE_STARTED,
            Severity::Analytic,
            param("product_id", product_id),
        );

        match self.backend.purchase(product_id).await {
            Ok(entitlements) => {
                let entitlements = self.state.replace(entitlements);
                let mut params = entitlements.analytics_params();
                params.insert("product_id".into(), product_id.into());
                self.log(events::PURCHASE_SUCCEEDED, Severity::Analytic, params);
                Ok(entitlements)
            }
            Err(e) => {
                self.log_failure(events::PURCHASE_FAILED, &e, param("product_id", product_id));
                Err(e)
            }
        }
    }

    /// Restore previous purchases and return the refreshed, sorted list.
    #[tracing::instrument(skip(self))]
    pub async fn restore_purchase(&self) -> Result<Vec<Entitlement>> {
        self.log(events::RESTORE_STARTED, Severity::Analytic, Params::new());

        match self.backend.restore().await {
            Ok(entitlements) => {
                let entitlements = self.state.replace(entitlements);
                self.log(
                    events::RESTORE_SUCCEEDED,
                    Severity::Analytic,
                    entitlements.analytics_params(),
                );
                Ok(entitlements)
            }
            Err(e) => {
                self.log_failure(events::RESTORE_FAILED, &e, Params::new());
                Err(e)
            }
        }
    }

    /// Whether the user may redeem the product's introductory offer.
    pub async fn check_trial_eligibility(&self, product_id: &str) -> Result<bool> {
        self.backend.check_trial_eligibility(product_id).await
    }

    /// Associate purchases with `user_id`.
    ///
    /// Safe to call on every launch. Attributes, when given, are forwarded
    /// after the backend accepted the log in. A failure forwarding them is
    /// returned to the caller; the new identity and its entitlements stay
    /// in place.
    #[tracing::instrument(skip(self, attributes))]
    pub async fn log_in(
        &mut self,
        user_id: &str,
        attributes: Option<ProfileAttributes>,
    ) -> Result<Vec<Entitlement>> {
        self.log(events::LOGIN_STARTED, Severity::Info, param("user_id", user_id));

        let entitlements = match self.backend.log_in(user_id).await {
            Ok(entitlements) => entitlements,
            Err(e) => {
                self.log_failure(events::LOGIN_FAILED, &e, param("user_id", user_id));
                return Err(e);
            }
        };

        // The old listener must not publish the previous identity's list
        // after the new one.
        self.cancel_listener().await;
        let entitlements = self.state.replace(entitlements);
        self.identity = IdentityState::SignedIn {
            user_id: user_id.to_string(),
        };
        self.subscribe().await;

        if let Some(attributes) = attributes {
            if let Err(e) = self.update_profile_attributes(&attributes).await {
                self.log_failure(events::LOGIN_FAILED, &e, param("user_id", user_id));
                return Err(e);
            }
        }

        let mut params = entitlements.analytics_params();
        params.insert("user_id".into(), user_id.into());
        self.log(events::LOGIN_SUCCEEDED, Severity::Analytic, params);
        Ok(entitlements)
    }

    /// Forward profile and attribution data to the backend.
    #[tracing::instrument(skip(self, attributes))]
    pub async fn update_profile_attributes(&self, attributes: &ProfileAttributes) -> Result<()> {
        self.backend
            .update_profile_attributes(attributes)
            .await
            .map_err(|e| {
                self.log_failure(events::UPDATE_ATTRIBUTES_FAILED, &e, Params::new());
                e
            })
    }

    /// Disassociate the current identity.
    ///
    /// On success the entitlement list is cleared and a fresh subscription
    /// is established for the anonymous identity. On failure nothing changes.
    #[tracing::instrument(skip(self))]
    pub async fn log_out(&mut self) -> Result<()> {
        if let Err(e) = self.backend.log_out().await {
            self.log_failure(events::LOGOUT_FAILED, &e, Params::new());
            return Err(e);
        }

        self.cancel_listener().await;
        self.state.replace(Vec::new());
        self.identity = IdentityState::Anonymous;
        self.subscribe().await;

        self.log(events::LOGOUT_SUCCEEDED, Severity::Analytic, Params::new());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Replace the listener with one bound to a fresh subscription.
    async fn subscribe(&mut self) {
        self.cancel_listener().await;

        let updates = match self.backend.subscribe_to_transaction_updates().await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!("transaction update subscription failed: {}", e);
                return;
            }
        };

        self.listener = Some(tokio::spawn(listen(
            updates,
            Arc::clone(&self.backend),
            self.state.clone(),
            self.config.refresh_retry_interval(),
        )));
    }

    /// Abort the listener and wait until it has stopped, so it cannot
    /// publish once this returns.
    async fn cancel_listener(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.abort();
            // Cancelled or finished; either way it no longer runs.
            let _ = handle.await;
        }
    }

    fn stop_listener(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.abort();
        }
    }

    fn log(&self, name: &str, severity: Severity, params: Params) {
        let event = LogEvent::new(name, severity);
        let event = if params.is_empty() {
            event
        } else {
            event.with_params(params)
        };
        self.logger.log_event(event);
    }

    fn log_failure(&self, name: &str, error: &PurchaseKitError, mut params: Params) {
        tracing::debug!(event = name, code = ?error.code(), "operation failed: {}", error);
        params.insert("error".into(), error.to_string().into());
        self.log(name, Severity::Severe, params);
    }
}

impl Drop for PurchaseCoordinator {
    fn drop(&mut self) {
        self.stop_listener();
    }
}

/// Apply transaction updates until the subscription ends.
async fn listen(
    mut updates: TransactionUpdates,
    backend: Arc<dyn PurchaseBackend>,
    state: EntitlementState,
    retry_interval: Duration,
) {
    while let Some(update) = updates.next().await {
        match update {
            TransactionUpdate::Changed => {
                refresh_with_retry(backend.as_ref(), &state, retry_interval).await
            }
            TransactionUpdate::Entitlements(entitlements) => state.refreshed(entitlements),
        }
    }
    tracing::debug!("transaction update stream ended");
}

/// Fetch entitlements, retrying at a fixed interval until it succeeds.
async fn refresh_with_retry(
    backend: &dyn PurchaseBackend,
    state: &EntitlementState,
    retry_interval: Duration,
) {
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        match backend.fetch_entitlements().await {
            Ok(entitlements) => {
                state.refreshed(entitlements);
                return;
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    retry_in_ms = saturating_millis(retry_interval),
                    "background entitlement refresh failed: {}",
                    e
                );
                sleep(retry_interval).await;
            }
        }
    }
}
