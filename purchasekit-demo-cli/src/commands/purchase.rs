//! Purchase, restore and trial eligibility commands

use anyhow::Result;
use colored::Colorize;

use super::{DemoOptions, Session};
use crate::ui;

/// Buy a product through the coordinator
#[tracing::instrument(skip(options))]
pub async fn buy(options: &DemoOptions, product_id: &str, yes: bool) -> Result<()> {
    let session = Session::open(options).await?;

    if !session.backend.catalog().iter().any(|p| p.id == product_id) {
        ui::warning(&format!("{} is not in the catalog", product_id));
    }
    if !yes && !ui::confirm(&format!("Purchase {}?", product_id.bold()), true)? {
        ui::info("Purchase cancelled");
        return Ok(());
    }

    let spinner = ui::spinner("Processing purchase...");
    let result = session.coordinator.purchase_product(product_id).await;
    spinner.finish_and_clear();

    match result {
        Ok(entitlements) => {
            session.save()?;
            ui::success(&format!("Purchased {}", product_id));
            if let Some(granted) = entitlements.iter().find(|e| e.product_id == product_id) {
                ui::entitlement(granted, options.verbose);
            }
            Ok(())
        }
        Err(e) if e.is_user_cancelled() => {
            ui::info("Purchase cancelled");
            Ok(())
        }
        Err(e) => {
            ui::error(&format!("Purchase failed: {}", e));
            Err(e.into())
        }
    }
}

/// Restore previous purchases
#[tracing::instrument(skip(options))]
pub async fn restore(options: &DemoOptions) -> Result<()> {
    let session = Session::open(options).await?;

    let spinner = ui::spinner("Restoring purchases...");
    let result = session.coordinator.restore_purchase().await;
    spinner.finish_and_clear();
    let entitlements = result?;

    session.save()?;
    ui::success(&format!("Restored {} entitlement(s)", entitlements.len()));
    for entitlement in &entitlements {
        ui::entitlement(entitlement, options.verbose);
    }
    Ok(())
}

/// Check introductory offer eligibility
#[tracing::instrument(skip(options))]
pub async fn eligibility(options: &DemoOptions, product_id: &str) -> Result<()> {
    let session = Session::open(options).await?;

    if session.coordinator.check_trial_eligibility(product_id).await? {
        ui::success(&format!("Eligible for a free trial of {}", product_id));
    } else {
        ui::info(&format!("Not eligible for a free trial of {}", product_id));
    }
    Ok(())
}
