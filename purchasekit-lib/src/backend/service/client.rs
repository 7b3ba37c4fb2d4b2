//! REST client for the subscription service.
//!
//! # Feature Flags
//!
//! Requires the `http-backend` feature for actual HTTP requests. Without it,
//! every request returns an `Unimplemented` error.
//!
//! ```toml
//! [dependencies]
//! purchasekit-lib = { version = "1.0", features = ["http-backend"] }
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
#[cfg(feature = "http-backend")]
use std::time::Duration;

use super::types::{AttributesRequest, IdentifyRequest, ReceiptRequest, SubscriberResponse};
use crate::config::ServiceConfig;
#[cfg(feature = "http-backend")]
use crate::PurchaseKitError;
use crate::Result;

/// HTTP client for the subscriber endpoints.
pub struct ServiceClient {
    config: ServiceConfig,
    #[cfg(feature = "http-backend")]
    client: reqwest::Client,
}

impl ServiceClient {
    /// Create a new client with the given configuration.
    #[cfg(feature = "http-backend")]
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                PurchaseKitError::Internal(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create a new client with the given configuration (stub when feature disabled).
    #[cfg(not(feature = "http-backend"))]
    pub fn new(config: ServiceConfig) -> Result<Self> {
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Build the full URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn subscriber_path(app_user_id: &str) -> String {
        format!("v1/subscribers/{}", urlencoding::encode(app_user_id))
    }

    /// Make a GET request to the API.
    #[cfg(feature = "http-backend")]
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .authorized(self.client.get(self.url(path)))
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        self.handle_response(response).await
    }

    /// Make a GET request to the API (stub when feature disabled).
    #[cfg(not(feature = "http-backend"))]
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        tracing::debug!(url = %self.url(path), "service request skipped");
        Err(crate::PurchaseKitError::Unimplemented(
            "Subscription service HTTP client not compiled - enable the 'http-backend' feature",
        ))
    }

    /// Make a POST request with a JSON body.
    #[cfg(feature = "http-backend")]
    async fn post<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .authorized(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        self.handle_response(response).await
    }

    /// Make a POST request with a JSON body (stub when feature disabled).
    #[cfg(not(feature = "http-backend"))]
    async fn post<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, _body: &B) -> Result<T> {
        tracing::debug!(url = %self.url(path), "service request skipped");
        Err(crate::PurchaseKitError::Unimplemented(
            "Subscription service HTTP client not compiled - enable the 'http-backend' feature",
        ))
    }

    #[cfg(feature = "http-backend")]
    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.config.api_key)
            .header("X-Platform", &self.config.platform)
    }

    /// Handle an HTTP response, parsing JSON or returning an error.
    #[cfg(feature = "http-backend")]
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.map_status_error(status.as_u16(), &error_text));
        }

        response.json::<T>().await.map_err(|e| {
            PurchaseKitError::Serialization(format!("Failed to parse service response: {}", e))
        })
    }

    /// Map HTTP status codes to PurchaseKitError.
    #[cfg(feature = "http-backend")]
    fn map_status_error(&self, status: u16, error_text: &str) -> PurchaseKitError {
        match status {
            400 => PurchaseKitError::InvalidData {
                field: "request".to_string(),
                reason: error_text.to_string(),
            },
            401 | 403 => PurchaseKitError::Auth(error_text.to_string()),
            404 => PurchaseKitError::NotFound {
                resource_type: "subscriber".to_string(),
                identifier: error_text.to_string(),
            },
            429 => PurchaseKitError::RateLimited {
                retry_after_ms: 5000,
            },
            500..=599 => PurchaseKitError::Internal(format!(
                "Service error ({}): {}",
                status, error_text
            )),
            _ => PurchaseKitError::Transport(format!(
                "Service request failed ({}): {}",
                status, error_text
            )),
        }
    }

    /// Map reqwest errors to PurchaseKitError.
    #[cfg(feature = "http-backend")]
    fn map_reqwest_error(&self, e: reqwest::Error) -> PurchaseKitError {
        if e.is_timeout() {
            PurchaseKitError::ConnectionTimeout {
                operation: "Service request".to_string(),
                timeout_ms: self.config.timeout_secs * 1000,
            }
        } else if e.is_connect() {
            PurchaseKitError::ConnectionFailed {
                target: self.config.api_url.clone(),
                reason: e.to_string(),
            }
        } else {
            PurchaseKitError::Transport(format!("Service request failed: {}", e))
        }
    }

    // ========================================================================
    // Public API Methods
    // ========================================================================

    /// Fetch a subscriber, creating it server-side on first sight.
    pub async fn get_subscriber(&self, app_user_id: &str) -> Result<SubscriberResponse> {
        self.get(&Self::subscriber_path(app_user_id)).await
    }

    /// Post a platform transaction for validation and attribution.
    pub async fn post_receipt(&self, request: &ReceiptRequest) -> Result<SubscriberResponse> {
        self.post("v1/receipts", request).await
    }

    /// Alias an anonymous subscriber to an application user id.
    pub async fn identify(&self, request: &IdentifyRequest) -> Result<SubscriberResponse> {
        self.post("v1/subscribers/identify", request).await
    }

    /// Set subscriber attributes.
    pub async fn post_attributes(
        &self,
        app_user_id: &str,
        request: &AttributesRequest,
    ) -> Result<()> {
        let path = format!("{}/attributes", Self::subscriber_path(app_user_id));
        let _: serde_json::Value = self.post(&path, request).await?;
        Ok(())
    }
}
