//! Profile and attribution attributes forwarded to a backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contact details, push token and third-party attribution identifiers.
///
/// Every field is optional. The bag is passed through to the backend as-is;
/// backends without a profile concept ignore it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileAttributes {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub push_token: Option<String>,

    pub adjust_id: Option<String>,
    pub appsflyer_id: Option<String>,
    pub facebook_anonymous_id: Option<String>,
    pub mparticle_id: Option<String>,
    pub onesignal_id: Option<String>,
    pub airship_channel_id: Option<String>,
    pub clevertap_id: Option<String>,
    pub kochava_device_id: Option<String>,
    pub mixpanel_distinct_id: Option<String>,
    pub firebase_app_instance_id: Option<String>,

    pub media_source: Option<String>,
    pub campaign: Option<String>,
    pub ad_group: Option<String>,
    pub ad: Option<String>,
    pub keyword: Option<String>,
    pub creative: Option<String>,

    pub idfa: Option<String>,
    pub idfv: Option<String>,
    pub gps_ad_id: Option<String>,
    pub ip: Option<String>,
}

impl ProfileAttributes {
    /// True when no attribute is set.
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, value)| value.is_none())
    }

    /// Set attributes keyed by the subscription service's reserved names
    /// (`$email`, `$appsflyerId`, ...).
    pub fn reserved_attributes(&self) -> BTreeMap<&'static str, &str> {
        self.fields()
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect()
    }

    fn fields(&self) -> [(&'static str, Option<&str>); 24] {
        [
            ("$email", self.email.as_deref()),
            ("$displayName", self.display_name.as_deref()),
            ("$phoneNumber", self.phone_number.as_deref()),
            ("$pushToken", self.push_token.as_deref()),
            ("$adjustId", self.adjust_id.as_deref()),
            ("$appsflyerId", self.appsflyer_id.as_deref()),
            ("$fbAnonId", self.facebook_anonymous_id.as_deref()),
            ("$mparticleId", self.mparticle_id.as_deref()),
            ("$onesignalId", self.onesignal_id.as_deref()),
            ("$airshipChannelId", self.airship_channel_id.as_deref()),
            ("$clevertapId", self.clevertap_id.as_deref()),
            ("$kochavaDeviceId", self.kochava_device_id.as_deref()),
            ("$mixpanelDistinctId", self.mixpanel_distinct_id.as_deref()),
            ("$firebaseAppInstanceId", self.firebase_app_instance_id.as_deref()),
            ("$mediaSource", self.media_source.as_deref()),
            ("$campaign", self.campaign.as_deref()),
            ("$adGroup", self.ad_group.as_deref()),
            ("$ad", self.ad.as_deref()),
            ("$keyword", self.keyword.as_deref()),
            ("$creative", self.creative.as_deref()),
            ("$idfa", self.idfa.as_deref()),
            ("$idfv", self.idfv.as_deref()),
            ("$gpsAdId", self.gps_ad_id.as_deref()),
            ("$ip", self.ip.as_deref()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(ProfileAttributes::default().is_empty());
        assert!(ProfileAttributes::default().reserved_attributes().is_empty());
    }

    #[test]
    fn test_reserved_attributes_only_set_fields() {
        let attrs = ProfileAttributes {
            email: Some("user@example.com".into()),
            appsflyer_id: Some("af-123".into()),
            ..Default::default()
        };

        assert!(!attrs.is_empty());
        let reserved = attrs.reserved_attributes();
        assert_eq!(reserved.len(), 2);
        assert_eq!(reserved["$email"], "user@example.com");
        assert_eq!(reserved["$appsflyerId"], "af-123");
    }

    #[test]
    fn test_deserialize_partial() {
        let attrs: ProfileAttributes = serde_json::from_str(r#"{"campaign":"spring"}"#).unwrap();
        assert_eq!(attrs.campaign.as_deref(), Some("spring"));
        assert!(attrs.email.is_none());
    }
}
