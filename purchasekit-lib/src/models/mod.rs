//! Value types shared by every backend.
//!
//! All models are created fresh from backend responses and never mutated in
//! place. Each exposes a flat analytics projection (see [`Params`]).

mod attributes;
mod entitlement;
mod params;
mod product;

pub use attributes::ProfileAttributes;
pub use entitlement::{sort_by_expiration, Entitlement, EntitlementsExt, OwnershipType};
pub use params::{param, ParamValue, Params};
pub use product::{Product, ProductsExt, SubscriptionPeriod};
