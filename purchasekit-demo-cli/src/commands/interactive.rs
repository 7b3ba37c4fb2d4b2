//! Interactive mode - drive one coordinator from a menu

use anyhow::Result;
use std::time::Duration;

use super::{DemoOptions, Session};
use crate::ui;

const ACTIONS: &[&str] = &[
    "Show entitlements",
    "Purchase a product",
    "Restore purchases",
    "Simulate a purchase on another device",
    "Log in",
    "Log out",
    "Quit",
];

pub async fn run(options: &DemoOptions) -> Result<()> {
    let mut session = Session::open(options).await?;
    let items: Vec<String> = ACTIONS.iter().map(|a| a.to_string()).collect();

    ui::clear();
    ui::header("PurchaseKit interactive demo");

    loop {
        ui::separator();
        match ui::select("What next?", &items)? {
            0 => show(&session, options.verbose),
            1 => {
                let titles: Vec<String> = session
                    .backend
                    .catalog()
                    .iter()
                    .map(|p| format!("{} ({})", p.title, p.price_with_period()))
                    .collect();
                if titles.is_empty() {
                    ui::warning("The catalog is empty");
                    continue;
                }
                let index = ui::select("Product", &titles)?;
                let product_id = session.backend.catalog()[index].id.clone();
                match session.coordinator.purchase_product(&product_id).await {
                    Ok(_) => ui::success(&format!("Purchased {}", product_id)),
                    Err(e) => ui::error(&format!("Purchase failed: {}", e)),
                }
            }
            2 => match session.coordinator.restore_purchase().await {
                Ok(list) => ui::success(&format!("Restored, {} entitlement(s)", list.len())),
                Err(e) => ui::error(&format!("Restore failed: {}", e)),
            },
            3 => {
                let product_id = ui::input("Product id")?;
                let mut receiver = session.coordinator.watch_entitlements();
                if !session.backend.simulate_external_purchase(&product_id) {
                    ui::warning("No listener is subscribed");
                    continue;
                }
                let spinner = ui::spinner("Waiting for the background refresh...");
                let refreshed = tokio::time::timeout(
                    options.latency + Duration::from_secs(5),
                    receiver.changed(),
                )
                .await;
                spinner.finish_and_clear();
                match refreshed {
                    Ok(Ok(())) => ui::success("Entitlements refreshed in the background"),
                    _ => ui::warning("No refresh observed yet"),
                }
            }
            4 => {
                let user_id = ui::input("User id")?;
                match session.coordinator.log_in(&user_id, None).await {
                    Ok(_) => ui::success(&format!("Logged in as {}", user_id)),
                    Err(e) => ui::error(&format!("Login failed: {}", e)),
                }
            }
            5 => match session.coordinator.log_out().await {
                Ok(()) => ui::success("Logged out"),
                Err(e) => ui::error(&format!("Logout failed: {}", e)),
            },
            _ => break,
        }
        session.save()?;
    }

    session.save()?;
    Ok(())
}

fn show(session: &Session, verbose: bool) {
    let entitlements = session.coordinator.entitlements();
    match session.coordinator.identity().user_id() {
        Some(user_id) => ui::key_value("User", user_id),
        None => ui::key_value("User", "anonymous"),
    }
    if entitlements.is_empty() {
        ui::info("No entitlements yet");
    }
    for entitlement in &entitlements {
        ui::entitlement(entitlement, verbose);
    }
}
