//! Property-based tests for entitlement list views and model serialization.
//!
//! These tests use proptest to verify invariants across a wide range of inputs.

#[cfg(test)]
mod entitlement_properties {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use purchasekit_lib::models::{sort_by_expiration, Entitlement, EntitlementsExt};

    fn expiration() -> impl Strategy<Value = Option<DateTime<Utc>>> {
        proptest::option::of(prop_oneof![
            // Roughly 1970..2100.
            (0i64..4_100_000_000i64).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap()),
            // Within a day of the earliest representable instant.
            (0i64..86_400).prop_map(|secs| DateTime::<Utc>::MIN_UTC + Duration::seconds(secs)),
        ])
    }

    fn entitlement() -> impl Strategy<Value = Entitlement> {
        (0u8..16, any::<bool>(), expiration()).prop_map(|(id, active, expiration)| {
            let mut entitlement = Entitlement::new(format!("com.example.p{}", id), active);
            entitlement.expiration_date = expiration;
            entitlement
        })
    }

    fn entitlements() -> impl Strategy<Value = Vec<Entitlement>> {
        proptest::collection::vec(entitlement(), 0..24)
    }

    proptest! {
        /// The active view is exactly the active elements, in original order.
        #[test]
        fn active_preserves_order(list in entitlements()) {
            let expected: Vec<&Entitlement> = list.iter().filter(|e| e.is_active).collect();
            prop_assert_eq!(list.active(), expected);
        }

        /// has_active_entitlement agrees with the active view.
        #[test]
        fn has_active_matches_active_view(list in entitlements()) {
            prop_assert_eq!(list.has_active_entitlement(), !list.active().is_empty());
        }

        /// Sorted output is non-increasing by expiration, with missing
        /// expirations after every defined one, however far in the past.
        #[test]
        fn sort_orders_by_expiration_descending(list in entitlements()) {
            let sorted = list.sorted_by_expiration();
            prop_assert_eq!(sorted.len(), list.len());

            for pair in sorted.windows(2) {
                match (pair[0].expiration_date, pair[1].expiration_date) {
                    (Some(a), Some(b)) => prop_assert!(a >= b),
                    (None, Some(_)) => prop_assert!(false, "missing expiration sorted first"),
                    _ => {}
                }
            }
        }

        /// Sorting is stable: equal expirations keep their relative order.
        #[test]
        fn sort_is_stable(list in entitlements()) {
            let tagged: Vec<Entitlement> = list
                .into_iter()
                .enumerate()
                .map(|(i, mut e)| {
                    e.product_id = format!("{}#{}", e.product_id, i);
                    e
                })
                .collect();
            let mut sorted = tagged.clone();
            sort_by_expiration(&mut sorted);

            let position = |e: &Entitlement| {
                tagged.iter().position(|t| t.product_id == e.product_id).unwrap()
            };
            for pair in sorted.windows(2) {
                if pair[0].expiration_date == pair[1].expiration_date {
                    prop_assert!(position(&pair[0]) < position(&pair[1]));
                }
            }
        }

        /// Projections never carry keys for unset optional fields.
        #[test]
        fn projection_omits_missing_fields(e in entitlement()) {
            let params = e.analytics_params();
            prop_assert_eq!(
                params.contains_key("entitlement_expiration_date"),
                e.expiration_date.is_some()
            );
            prop_assert!(!params.contains_key("entitlement_original_purchase_date"));
            prop_assert!(!params.contains_key("entitlement_latest_purchase_date"));
        }
    }
}

#[cfg(test)]
mod serialization_properties {
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use purchasekit_lib::models::{Entitlement, OwnershipType, Product, SubscriptionPeriod};

    fn date() -> impl Strategy<Value = Option<DateTime<Utc>>> {
        // Years 0001..9999, the range RFC 3339 text can carry.
        proptest::option::of(
            (-62_135_596_800i64..253_402_300_799i64)
                .prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap()),
        )
    }

    fn ownership() -> impl Strategy<Value = OwnershipType> {
        prop_oneof![
            Just(OwnershipType::Purchased),
            Just(OwnershipType::FamilyShared),
            Just(OwnershipType::Unknown),
        ]
    }

    fn period() -> impl Strategy<Value = Option<SubscriptionPeriod>> {
        proptest::option::of(prop_oneof![
            Just(SubscriptionPeriod::Day),
            Just(SubscriptionPeriod::Week),
            Just(SubscriptionPeriod::Month),
            Just(SubscriptionPeriod::Year),
        ])
    }

    fn entitlement() -> impl Strategy<Value = Entitlement> {
        (
            "[a-z0-9._]{1,32}",
            any::<bool>(),
            (date(), date(), date()),
            ownership(),
            (any::<bool>(), any::<bool>()),
        )
            .prop_map(
                |(id, active, (expiration, original, latest), ownership, (sandbox, verified))| {
                    let mut entitlement = Entitlement::new(id, active)
                        .with_purchase_dates(original, latest)
                        .with_ownership(ownership)
                        .with_flags(sandbox, verified);
                    entitlement.expiration_date = expiration;
                    entitlement
                },
            )
    }

    fn product() -> impl Strategy<Value = Product> {
        (
            "[a-z0-9._]{1,32}",
            any::<String>(),
            any::<String>(),
            "\\PC{0,12}",
            period(),
        )
            .prop_map(|(id, title, description, price, period)| {
                Product::new(id, title, description, price, period)
            })
    }

    proptest! {
        /// Entitlements survive a JSON round trip unchanged.
        #[test]
        fn entitlement_json_round_trip(e in entitlement()) {
            let json = serde_json::to_string(&e).unwrap();
            let decoded: Entitlement = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(decoded, e);
        }

        /// Products survive a JSON round trip unchanged.
        #[test]
        fn product_json_round_trip(p in product()) {
            let json = serde_json::to_string(&p).unwrap();
            let decoded: Product = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(decoded, p);
        }
    }
}
