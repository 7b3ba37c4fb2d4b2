//! Purchasable catalog entries.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::params::{insert_some, Params};

/// Billing period of a recurring product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPeriod {
    /// Renews daily.
    Day,
    /// Renews weekly.
    Week,
    /// Renews monthly.
    Month,
    /// Renews yearly.
    Year,
}

impl SubscriptionPeriod {
    /// Get the period name as used in analytics and price suffixes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for SubscriptionPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchasable product as presented to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Storefront product identifier.
    pub id: String,
    /// Localized display title.
    pub title: String,
    /// Localized description or subtitle.
    pub description: String,
    /// Localized, formatted price (e.g. "$4.99").
    pub price: String,
    /// Billing period, `None` for non-recurring or unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<SubscriptionPeriod>,
}

impl Product {
    /// Create a new product.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        price: impl Into<String>,
        period: Option<SubscriptionPeriod>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            price: price.into(),
            period,
        }
    }

    /// Price with the billing period appended, e.g. `"$4.99/month"`.
    pub fn price_with_period(&self) -> String {
        match self.period {
            Some(period) => format!("{}/{}", self.price, period),
            None => self.price.clone(),
        }
    }

    /// Flat analytics projection with `product_` keys.
    pub fn analytics_params(&self) -> Params {
        self.params_with_suffix("")
    }

    fn params_with_suffix(&self, suffix: &str) -> Params {
        let mut params = Params::new();
        params.insert(format!("product_id{suffix}"), self.id.clone().into());
        params.insert(format!("product_title{suffix}"), self.title.clone().into());
        params.insert(
            format!("product_description{suffix}"),
            self.description.clone().into(),
        );
        params.insert(format!("product_price{suffix}"), self.price.clone().into());
        insert_some(
            &mut params,
            format!("product_period{suffix}"),
            self.period.map(|p| p.as_str()),
        );
        params
    }
}

/// Views over a list of products.
pub trait ProductsExt {
    /// Aggregated analytics projection for the whole list.
    ///
    /// Per-product keys carry a `_<product id>` suffix.
    fn analytics_params(&self) -> Params;
}

impl ProductsExt for [Product] {
    fn analytics_params(&self) -> Params {
        let mut ids: Vec<&str> = self.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();

        let mut params = Params::new();
        params.insert("products_count".into(), self.len().into());
        params.insert("products_ids".into(), ids.join(",").into());
        for product in self {
            params.extend(product.params_with_suffix(&format!("_{}", product.id)));
        }
        params
    }
}
