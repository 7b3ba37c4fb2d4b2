//! Subscription service request and response documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::backend::storefront::ownership_from_platform;
use crate::models::{Entitlement, ProfileAttributes};

/// Envelope returned by every subscriber endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct SubscriberResponse {
    /// Server time of the response, used to judge expirations.
    #[serde(default)]
    pub request_date: Option<DateTime<Utc>>,
    /// The subscriber document.
    pub subscriber: Subscriber,
}

impl SubscriberResponse {
    /// Entitlements judged against the server's request date (or local time
    /// when the server did not send one).
    pub fn entitlements(&self) -> Vec<Entitlement> {
        self.subscriber
            .entitlements(self.request_date.unwrap_or_else(Utc::now))
    }
}

/// A subscriber and everything they bought.
#[derive(Clone, Debug, Deserialize)]
pub struct Subscriber {
    #[serde(default)]
    pub original_app_user_id: Option<String>,
    /// Recurring purchases keyed by product id.
    #[serde(default)]
    pub subscriptions: BTreeMap<String, ServiceSubscription>,
    /// One-time purchases keyed by product id.
    #[serde(default)]
    pub non_subscriptions: BTreeMap<String, Vec<NonSubscription>>,
}

/// A recurring purchase as tracked by the service.
#[derive(Clone, Debug, Deserialize)]
pub struct ServiceSubscription {
    #[serde(default)]
    pub expires_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub original_purchase_date: Option<DateTime<Utc>>,
    /// `PURCHASED` or `FAMILY_SHARED`.
    #[serde(default)]
    pub ownership_type: Option<String>,
    #[serde(default)]
    pub is_sandbox: bool,
    #[serde(default)]
    pub refunded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unsubscribe_detected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub billing_issues_detected_at: Option<DateTime<Utc>>,
}

/// A one-time purchase as tracked by the service.
#[derive(Clone, Debug, Deserialize)]
pub struct NonSubscription {
    pub id: String,
    pub purchase_date: DateTime<Utc>,
    #[serde(default)]
    pub original_purchase_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_sandbox: bool,
}

impl Subscriber {
    /// Map purchases to entitlements.
    ///
    /// Subscriptions are active when not refunded and not yet expired.
    /// One-time purchases never expire; the latest purchase of each product
    /// is reported.
    pub fn entitlements(&self, now: DateTime<Utc>) -> Vec<Entitlement> {
        let mut entitlements: Vec<Entitlement> = self
            .subscriptions
            .iter()
            .map(|(product_id, sub)| {
                let is_active =
                    sub.refunded_at.is_none() && sub.expires_date.map_or(true, |e| e >= now);
                let mut entitlement = Entitlement::new(product_id.clone(), is_active)
                    .with_purchase_dates(sub.original_purchase_date, sub.purchase_date)
                    .with_ownership(
                        sub.ownership_type
                            .as_deref()
                            .map(ownership_from_platform)
                            .unwrap_or_default(),
                    )
                    .with_flags(sub.is_sandbox, true);
                entitlement.expiration_date = sub.expires_date;
                entitlement
            })
            .collect();

        for (product_id, purchases) in &self.non_subscriptions {
            if let Some(latest) = purchases.iter().max_by_key(|p| p.purchase_date) {
                entitlements.push(
                    Entitlement::new(product_id.clone(), true)
                        .with_purchase_dates(
                            latest.original_purchase_date.or(Some(latest.purchase_date)),
                            Some(latest.purchase_date),
                        )
                        .with_ownership(crate::models::OwnershipType::Purchased)
                        .with_flags(latest.is_sandbox, true),
                );
            }
        }
        entitlements
    }
}

/// Body of `POST /v1/receipts`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ReceiptRequest {
    pub app_user_id: String,
    pub fetch_token: String,
    pub product_id: String,
    pub is_restore: bool,
}

/// Body of `POST /v1/subscribers/identify`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct IdentifyRequest {
    pub app_user_id: String,
    pub new_app_user_id: String,
}

/// A single attribute value with its update time.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AttributeValue {
    pub value: String,
    pub updated_at_ms: i64,
}

/// Body of `POST /v1/subscribers/{id}/attributes`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AttributesRequest {
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl AttributesRequest {
    /// Build from the set fields of a profile attribute bag.
    pub fn from_profile(attributes: &ProfileAttributes, updated_at: DateTime<Utc>) -> Self {
        let updated_at_ms = updated_at.timestamp_millis();
        Self {
            attributes: attributes
                .reserved_attributes()
                .into_iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        AttributeValue {
                            value: value.to_string(),
                            updated_at_ms,
                        },
                    )
                })
                .collect(),
        }
    }
}
