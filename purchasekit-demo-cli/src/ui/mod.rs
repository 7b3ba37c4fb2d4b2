//! Terminal UI utilities

use colored::Colorize;
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use purchasekit_lib::models::{Entitlement, Product};
use std::time::Duration;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print a section header
pub fn header(text: &str) {
    println!("\n{}", text.bold().underline());
}

/// Print a key-value pair
pub fn key_value(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// Create a spinner progress indicator
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Prompt for user confirmation
pub fn confirm(prompt: &str, default: bool) -> anyhow::Result<bool> {
    use dialoguer::Confirm;
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

/// Prompt for text input
pub fn input(prompt: &str) -> anyhow::Result<String> {
    use dialoguer::Input;
    Ok(Input::new().with_prompt(prompt).interact_text()?)
}

/// Pick one of `items`, returning its index
pub fn select(prompt: &str, items: &[String]) -> anyhow::Result<usize> {
    use dialoguer::Select;
    Ok(Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact()?)
}

/// Clear the terminal
pub fn clear() {
    let term = Term::stdout();
    let _ = term.clear_screen();
}

/// Print a separator line
pub fn separator() {
    println!("{}", "─".repeat(60).dimmed());
}

/// Print JSON prettily
pub fn json(value: &serde_json::Value) {
    if let Ok(pretty) = serde_json::to_string_pretty(value) {
        println!("{}", pretty);
    }
}

/// Print a catalog entry
pub fn product(product: &Product) {
    println!("\n{}", product.title.bold());
    key_value("  ID", &product.id);
    key_value("  Price", &product.price_with_period());
    if !product.description.is_empty() {
        key_value("  Description", &product.description);
    }
}

/// Print an entitlement with its status
pub fn entitlement(entitlement: &Entitlement, verbose: bool) {
    let status = if entitlement.is_active {
        "active".green()
    } else {
        "inactive".red()
    };
    println!("\n{} [{}]", entitlement.product_id.bold(), status);

    key_value(
        "  Expires",
        &entitlement
            .expiration_date
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "Never".to_string()),
    );
    key_value("  Ownership", entitlement.ownership_type.as_str());

    if verbose {
        if let Some(date) = entitlement.original_purchase_date {
            key_value("  First purchased", &date.format("%Y-%m-%d %H:%M:%S").to_string());
        }
        if let Some(date) = entitlement.latest_purchase_date {
            key_value("  Last purchased", &date.format("%Y-%m-%d %H:%M:%S").to_string());
        }
        key_value("  Sandbox", &entitlement.is_sandbox.to_string());
        key_value("  Verified", &entitlement.is_verified.to_string());
    }
}
