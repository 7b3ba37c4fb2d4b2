//! Entitlements granted to the current identity.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;

use super::params::{insert_some, Params};

/// How the user came to hold an entitlement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipType {
    /// Bought by this user.
    Purchased,
    /// Shared by a family member.
    FamilyShared,
    /// Not reported or not recognized.
    #[default]
    Unknown,
}

impl OwnershipType {
    /// Get the ownership name as used in analytics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchased => "purchased",
            Self::FamilyShared => "family_shared",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OwnershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A right the user holds, typically a subscription grant.
///
/// `is_active` is whatever the backend reported. It is never recomputed
/// from `expiration_date` here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    /// Product that grants this entitlement.
    pub product_id: String,
    /// When the entitlement lapses, `None` for non-expiring grants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    /// Whether the backend considers the entitlement active.
    pub is_active: bool,
    /// First purchase of this product.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_purchase_date: Option<DateTime<Utc>>,
    /// Most recent purchase or renewal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_purchase_date: Option<DateTime<Utc>>,
    /// Ownership kind.
    #[serde(default)]
    pub ownership_type: OwnershipType,
    /// Purchased in a sandbox environment.
    #[serde(default)]
    pub is_sandbox: bool,
    /// The backend verified the underlying transaction.
    #[serde(default)]
    pub is_verified: bool,
}

impl Entitlement {
    /// Create an entitlement with the given activeness and no dates.
    pub fn new(product_id: impl Into<String>, is_active: bool) -> Self {
        Self {
            product_id: product_id.into(),
            expiration_date: None,
            is_active,
            original_purchase_date: None,
            latest_purchase_date: None,
            ownership_type: OwnershipType::Unknown,
            is_sandbox: false,
            is_verified: false,
        }
    }

    /// Set the expiration date.
    pub fn with_expiration(mut self, expiration_date: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }

    /// Set the original and latest purchase dates.
    pub fn with_purchase_dates(
        mut self,
        original: Option<DateTime<Utc>>,
        latest: Option<DateTime<Utc>>,
    ) -> Self {
        self.original_purchase_date = original;
        self.latest_purchase_date = latest;
        self
    }

    /// Set the ownership kind.
    pub fn with_ownership(mut self, ownership_type: OwnershipType) -> Self {
        self.ownership_type = ownership_type;
        self
    }

    /// Set the sandbox and verified flags.
    pub fn with_flags(mut self, is_sandbox: bool, is_verified: bool) -> Self {
        self.is_sandbox = is_sandbox;
        self.is_verified = is_verified;
        self
    }

    /// Expiration used for ordering: the earliest representable instant when
    /// there is none.
    pub fn effective_expiration(&self) -> DateTime<Utc> {
        self.expiration_date.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Flat analytics projection with `entitlement_` keys.
    pub fn analytics_params(&self) -> Params {
        self.params_with_suffix("")
    }

    /// Analytics projection with `_<product id>` appended to every key.
    pub fn analytics_params_keyed(&self) -> Params {
        self.params_with_suffix(&format!("_{}", self.product_id))
    }

    fn params_with_suffix(&self, suffix: &str) -> Params {
        let mut params = Params::new();
        params.insert(
            format!("entitlement_product_id{suffix}"),
            self.product_id.clone().into(),
        );
        insert_some(
            &mut params,
            format!("entitlement_expiration_date{suffix}"),
            self.expiration_date.map(format_date),
        );
        params.insert(format!("entitlement_is_active{suffix}"), self.is_active.into());
        insert_some(
            &mut params,
            format!("entitlement_original_purchase_date{suffix}"),
            self.original_purchase_date.map(format_date),
        );
        insert_some(
            &mut params,
            format!("entitlement_latest_purchase_date{suffix}"),
            self.latest_purchase_date.map(format_date),
        );
        params.insert(
            format!("entitlement_ownership_type{suffix}"),
            self.ownership_type.as_str().into(),
        );
        params.insert(format!("entitlement_is_sandbox{suffix}"), self.is_sandbox.into());
        params.insert(format!("entitlement_is_verified{suffix}"), self.is_verified.into());
        params
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Views over a list of entitlements. None of them reorder or mutate the list.
pub trait EntitlementsExt {
    /// Entitlements with `is_active == true`, in their original order.
    fn active(&self) -> Vec<&Entitlement>;

    /// True iff at least one entitlement is active.
    fn has_active_entitlement(&self) -> bool;

    /// Aggregated analytics projection: counts, sorted id lists, the
    /// active flag and every entitlement's keyed projection.
    fn analytics_params(&self) -> Params;

    /// A copy ordered by effective expiration, furthest in the future first.
    fn sorted_by_expiration(&self) -> Vec<Entitlement>;
}

impl EntitlementsExt for [Entitlement] {
    fn active(&self) -> Vec<&Entitlement> {
        self.iter().filter(|e| e.is_active).collect()
    }

    fn has_active_entitlement(&self) -> bool {
        self.iter().any(|e| e.is_active)
    }

    fn analytics_params(&self) -> Params {
        let active = self.active();

        let mut all_ids: Vec<&str> = self.iter().map(|e| e.product_id.as_str()).collect();
        all_ids.sort_unstable();
        let mut active_ids: Vec<&str> = active.iter().map(|e| e.product_id.as_str()).collect();
        active_ids.sort_unstable();

        let mut params = Params::new();
        params.insert("entitlements_count_all".into(), self.len().into());
        params.insert("entitlements_count_active".into(), active.len().into());
        params.insert("entitlements_ids_all".into(), all_ids.join(",").into());
        params.insert("entitlements_ids_active".into(), active_ids.join(",").into());
        params.insert(
            "has_active_entitlement".into(),
            self.has_active_entitlement().into(),
        );
        for entitlement in self {
            params.extend(entitlement.analytics_params_keyed());
        }
        params
    }

    fn sorted_by_expiration(&self) -> Vec<Entitlement> {
        let mut sorted = self.to_vec();
        sort_by_expiration(&mut sorted);
        sorted
    }
}

/// Sort in place by effective expiration, descending. Entitlements without
/// an expiration come after every dated one, even one dated at the earliest
/// representable instant. Stable, so equal expirations keep their relative
/// order.
pub fn sort_by_expiration(entitlements: &mut [Entitlement]) {
    entitlements.sort_by_key(|e| Reverse((e.expiration_date.is_some(), e.effective_expiration())));
}
