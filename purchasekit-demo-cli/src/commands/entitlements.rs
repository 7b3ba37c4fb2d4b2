//! Entitlements command - show what the user owns

use anyhow::Result;
use purchasekit_lib::models::EntitlementsExt;

use super::{DemoOptions, DemoState, Session};
use crate::ui;

pub async fn run(options: &DemoOptions, active_only: bool, json: bool) -> Result<()> {
    let session = Session::open(options).await?;
    let entitlements = if active_only {
        session.coordinator.active_entitlements()
    } else {
        session.coordinator.entitlements()
    };

    if json {
        ui::json(&serde_json::to_value(&entitlements)?);
        return Ok(());
    }

    ui::header("Entitlements");
    if let Some(user_id) = session.coordinator.identity().user_id() {
        ui::key_value("User", user_id);
    } else {
        ui::key_value("User", "anonymous");
    }

    if entitlements.is_empty() {
        ui::info("No entitlements yet");
        ui::info("Run: purchasekit-demo purchase <product-id>");
        return Ok(());
    }

    for entitlement in &entitlements {
        ui::entitlement(entitlement, options.verbose);
    }

    ui::separator();
    if session.coordinator.has_active_entitlement() {
        ui::success("Pro features unlocked");
    } else {
        ui::warning("No active entitlement");
    }

    if options.verbose {
        ui::info("User properties:");
        ui::json(&serde_json::to_value(entitlements.analytics_params())?);
    }
    Ok(())
}

/// Forget every saved purchase and identity
pub fn reset(options: &DemoOptions, yes: bool) -> Result<()> {
    if !yes && !ui::confirm("Delete all saved demo purchases?", false)? {
        return Ok(());
    }
    DemoState::clear(&options.storage_dir)?;
    ui::success("Demo state cleared");
    Ok(())
}
