//! Login and logout commands

use anyhow::Result;
use purchasekit_lib::models::ProfileAttributes;

use super::{DemoOptions, Session};
use crate::ui;

#[tracing::instrument(skip(options, email))]
pub async fn log_in(options: &DemoOptions, user_id: &str, email: Option<String>) -> Result<()> {
    let mut session = Session::open(options).await?;

    let attributes = email.map(|email| ProfileAttributes {
        email: Some(email),
        ..Default::default()
    });

    let entitlements = session.coordinator.log_in(user_id, attributes).await?;
    session.save()?;

    ui::success(&format!("Logged in as {}", user_id));
    ui::key_value("Entitlements", &entitlements.len().to_string());
    if let Some(attributes) = session.backend.profile_attributes() {
        if let Some(email) = attributes.email {
            ui::key_value("Email", &email);
        }
    }
    Ok(())
}

#[tracing::instrument(skip(options))]
pub async fn log_out(options: &DemoOptions) -> Result<()> {
    let mut session = Session::open(options).await?;

    if !session.coordinator.identity().is_signed_in() {
        ui::info("Not logged in");
        return Ok(());
    }

    session.coordinator.log_out().await?;
    session.save()?;
    ui::success("Logged out");
    Ok(())
}
