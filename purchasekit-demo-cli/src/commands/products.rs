//! Products command - list catalog entries

use anyhow::Result;
use purchasekit_lib::models::ProductsExt;

use super::{DemoOptions, Session};
use crate::ui;

#[tracing::instrument(skip(options))]
pub async fn run(options: &DemoOptions, ids: Vec<String>, json: bool) -> Result<()> {
    let session = Session::open(options).await?;

    let ids = if ids.is_empty() {
        session
            .backend
            .catalog()
            .iter()
            .map(|p| p.id.clone())
            .collect()
    } else {
        ids
    };

    let spinner = ui::spinner("Fetching products...");
    let result = session.coordinator.get_products(ids).await;
    spinner.finish_and_clear();
    let products = result?;

    if json {
        ui::json(&serde_json::to_value(&products)?);
        return Ok(());
    }

    ui::header("Products");
    if products.is_empty() {
        ui::info("No matching products in the catalog");
        return Ok(());
    }
    for product in &products {
        ui::product(product);
    }

    if options.verbose {
        ui::separator();
        ui::info("Analytics projection:");
        ui::json(&serde_json::to_value(products.analytics_params())?);
    }
    Ok(())
}
