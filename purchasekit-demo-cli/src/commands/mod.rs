//! CLI command implementations
//!
//! The demo runs against the in-memory mock backend. Entitlements and the
//! signed-in user are saved to `state.json` in the storage directory so
//! that consecutive invocations see each other's purchases.

pub mod entitlements;
pub mod identity;
pub mod interactive;
pub mod products;
pub mod purchase;

use anyhow::{Context, Result};
use purchasekit_lib::backend::MockBackend;
use purchasekit_lib::logger::TracingLogger;
use purchasekit_lib::models::{Entitlement, Product, SubscriptionPeriod};
use purchasekit_lib::{CoordinatorConfig, IdentityState, PurchaseCoordinator};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Options shared by every command.
#[derive(Clone, Debug)]
pub struct DemoOptions {
    pub storage_dir: PathBuf,
    pub catalog: Option<PathBuf>,
    pub latency: Duration,
    pub verbose: bool,
}

/// What survives between invocations.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DemoState {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub entitlements: Vec<Entitlement>,
}

impl DemoState {
    pub fn path(storage_dir: &Path) -> PathBuf {
        storage_dir.join("state.json")
    }

    pub fn load(storage_dir: &Path) -> Result<Self> {
        let path = Self::path(storage_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("Corrupt state file {}", path.display()))
    }

    pub fn save(&self, storage_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(storage_dir)?;
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(Self::path(storage_dir), contents)?;
        Ok(())
    }

    pub fn clear(storage_dir: &Path) -> Result<()> {
        let path = Self::path(storage_dir);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Built-in catalog used when no `--catalog` file is given.
pub fn default_catalog() -> Vec<Product> {
    vec![
        Product::new(
            "com.example.pro.weekly",
            "Pro Weekly",
            "All Pro features, billed weekly",
            "$1.99",
            Some(SubscriptionPeriod::Week),
        ),
        Product::new(
            "com.example.pro.monthly",
            "Pro Monthly",
            "All Pro features, billed monthly",
            "$4.99",
            Some(SubscriptionPeriod::Month),
        ),
        Product::new(
            "com.example.pro.annual",
            "Pro Annual",
            "All Pro features, billed yearly",
            "$39.99",
            Some(SubscriptionPeriod::Year),
        ),
        Product::new(
            "com.example.lifetime",
            "Lifetime",
            "Pay once, keep forever",
            "$99.99",
            None,
        ),
    ]
}

/// Load a catalog from a JSON array of products.
pub fn load_catalog(path: &Path) -> Result<Vec<Product>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    serde_json::from_str(&contents).context("Catalog must be a JSON array of products")
}

/// A coordinator wired to a mock backend seeded from saved state.
pub struct Session {
    pub coordinator: PurchaseCoordinator,
    pub backend: Arc<MockBackend>,
    storage_dir: PathBuf,
}

impl Session {
    pub async fn open(options: &DemoOptions) -> Result<Self> {
        let catalog = match &options.catalog {
            Some(path) => load_catalog(path)?,
            None => default_catalog(),
        };
        let state = DemoState::load(&options.storage_dir)?;
        tracing::debug!(
            products = catalog.len(),
            entitlements = state.entitlements.len(),
            "opening demo session"
        );

        let backend = Arc::new(
            MockBackend::new(catalog, state.entitlements).with_latency(options.latency),
        );
        let mut coordinator = PurchaseCoordinator::new(
            backend.clone(),
            Arc::new(TracingLogger),
            CoordinatorConfig::default(),
        )
        .await;

        if let Some(user_id) = state.user_id {
            coordinator.log_in(&user_id, None).await?;
        }

        Ok(Self {
            coordinator,
            backend,
            storage_dir: options.storage_dir.clone(),
        })
    }

    /// Persist the coordinator's current view.
    pub fn save(&self) -> Result<()> {
        let state = DemoState {
            user_id: match self.coordinator.identity() {
                IdentityState::SignedIn { user_id } => Some(user_id.clone()),
                IdentityState::Anonymous => None,
            },
            entitlements: self.coordinator.entitlements(),
        };
        state.save(&self.storage_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_state_round_trip() {
        let dir = TempDir::new().unwrap();
        assert_eq!(DemoState::load(dir.path()).unwrap(), DemoState::default());

        let state = DemoState {
            user_id: Some("alice".into()),
            entitlements: vec![Entitlement::new("com.example.lifetime", true)],
        };
        state.save(dir.path()).unwrap();
        assert_eq!(DemoState::load(dir.path()).unwrap(), state);

        DemoState::clear(dir.path()).unwrap();
        assert!(!DemoState::path(dir.path()).exists());
    }

    #[test]
    fn test_load_catalog() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, serde_json::to_string(&default_catalog()).unwrap()).unwrap();

        assert_eq!(load_catalog(&path).unwrap(), default_catalog());

        std::fs::write(&path, "{}").unwrap();
        assert!(load_catalog(&path).is_err());
    }

    #[tokio::test]
    async fn test_session_persists_purchases() {
        let dir = TempDir::new().unwrap();
        let options = DemoOptions {
            storage_dir: dir.path().to_path_buf(),
            catalog: None,
            latency: Duration::ZERO,
            verbose: false,
        };

        let session = Session::open(&options).await.unwrap();
        session
            .coordinator
            .purchase_product("com.example.pro.monthly")
            .await
            .unwrap();
        session.save().unwrap();

        let reopened = Session::open(&options).await.unwrap();
        assert!(reopened.coordinator.has_active_entitlement());
    }
}
